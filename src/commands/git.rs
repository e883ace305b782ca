use crate::core::{
    context::AppContext,
    error::Result,
    git_sync::{GitCredentials, GitSyncRequest},
    output::{print_info, print_success},
    state::NewRepository,
};

fn credentials(username: Option<String>, token: Option<String>) -> Option<GitCredentials> {
    token.map(|token| GitCredentials {
        username: username.unwrap_or_else(|| "git".to_string()),
        token,
    })
}

/// Mirror `remote_url` at `git_ref`, and optionally track the mirror
pub async fn execute_sync_git(
    ctx: &AppContext,
    remote_url: String,
    git_ref: String,
    username: Option<String>,
    token: Option<String>,
    track: bool,
) -> Result<()> {
    let request = GitSyncRequest {
        is_git: true,
        remote_url,
        git_ref: git_ref.clone(),
        credentials: credentials(username, token),
        ..GitSyncRequest::default()
    };
    let dir = ctx.git.sync_git_repository(request).await?;
    print_success(&format!("Mirror at {} is on {git_ref}", dir.display()));

    if track {
        let id = ctx.registry.add(NewRepository::new(dir)).await?;
        print_info(&format!("Tracking mirror as {id}"));
    }
    Ok(())
}

pub async fn execute_test_git(
    ctx: &AppContext,
    remote_url: &str,
    username: Option<String>,
    token: Option<String>,
) -> Result<()> {
    let refs = ctx
        .git
        .test_connection(remote_url, credentials(username, token))
        .await?;
    print_success(&format!("Connected to {remote_url} ({refs} refs)"));
    Ok(())
}
