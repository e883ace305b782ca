//! Output formatting for the command-line shim.
//!
//! Red for errors, blue for identifiers, bright_black for secondary detail.
//! Every block is separated from the surrounding output by a blank line.

use crate::core::indexer::IndexStatus;
use crate::core::state::RepositoryRecord;
use colored::*;

/// ```text
///
/// ✕ Error: <message>
///
/// ```
pub fn print_error(message: &str) {
    println!("\n{} {}\n", "✕ Error:".red(), message.white());
}

pub fn print_success(message: &str) {
    println!("\n{} {}", "✓".green(), message.white());
}

pub fn print_info(message: &str) {
    println!("\n{}\n", message.white());
}

pub fn print_section_header(header: &str) {
    println!("\n{}:\n", header.white());
}

/// `[id] name  path  (status, N files)`
pub fn format_repository(record: &RepositoryRecord) -> String {
    let status = match record.index_status {
        IndexStatus::Idle => "not indexed".bright_black(),
        IndexStatus::Running => "indexing".yellow(),
        IndexStatus::Done => "indexed".green(),
        IndexStatus::CapReached => "capped".yellow(),
        IndexStatus::Stopped => "stopped".bright_black(),
    };
    let files = if record.tree_list.is_empty() {
        String::new()
    } else {
        format!(", {} files", record.tree_list.len())
    };

    format!(
        "{}{}{} {}  {}  {}{}{}{}",
        "[".bright_black(),
        record.id.blue(),
        "]".bright_black(),
        record.repo_name.white(),
        record.fullpath.display().to_string().bright_black(),
        "(".bright_black(),
        status,
        files.bright_black(),
        ")".bright_black()
    )
}

pub fn print_repositories(records: &[RepositoryRecord]) {
    if records.is_empty() {
        print_info("No repositories tracked. Add one with 'source-bridge add <path>'.");
        return;
    }

    print_section_header("Repositories");
    for record in records {
        println!("{}", format_repository(record));
    }
    println!();
}
