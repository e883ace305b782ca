//! Predefined repository and directory scenarios

#![allow(dead_code)]

use super::repository::*;
use anyhow::Result;
use std::fs;
use std::path::Path;

/// Remote `acme/widgets` with one commit on `main` containing `README.md`
pub fn create_widgets_remote() -> Result<(TestRepo, String)> {
    let repo = setup_named_repo("acme", "widgets")?;
    create_file(&repo.path, "README.md", "# widgets\n")?;
    create_file(&repo.path, "src/lib.rs", "pub fn widget() {}\n")?;
    let commit = commit_all(&repo.path, "Initial commit")?;
    Ok((repo, commit))
}

/// `count` empty files spread over subdirectories of 1,000 files each
pub fn create_flat_tree(root: &Path, count: usize) -> Result<()> {
    for i in 0..count {
        let dir = root.join(format!("d{:03}", i / 1000));
        if i % 1000 == 0 {
            fs::create_dir_all(&dir)?;
        }
        fs::File::create(dir.join(format!("f{i}.txt")))?;
    }
    Ok(())
}
