use crate::core::{
    config::PerforceSettings,
    context::AppContext,
    error::Result,
    output::{print_error, print_info, print_section_header, print_success},
    perforce::PerforceManager,
    state::NewRepository,
};
use colored::*;
use std::path::Path;
use std::sync::Arc;

/// Connection overrides given on the command line. When any is set the merged
/// settings are persisted.
#[derive(Debug, Default)]
pub struct ConnectionArgs {
    pub port: Option<String>,
    pub user: Option<String>,
    pub timeout: Option<u64>,
}

impl ConnectionArgs {
    fn is_empty(&self) -> bool {
        self.port.is_none() && self.user.is_none() && self.timeout.is_none()
    }
}

async fn connect(ctx: &AppContext, args: ConnectionArgs) -> Result<Arc<PerforceManager>> {
    if args.is_empty() {
        return ctx.connect_perforce().await;
    }

    let mut settings: PerforceSettings = ctx.settings().perforce.unwrap_or_default();
    if let Some(port) = args.port {
        settings.connection_string = port;
    }
    if let Some(user) = args.user {
        settings.username = user;
    }
    if let Some(timeout) = args.timeout {
        settings.timeout = timeout;
    }
    ctx.update_perforce_settings(settings).await
}

pub async fn execute_p4_test(ctx: &AppContext, args: ConnectionArgs) -> Result<()> {
    let manager = connect(ctx, args).await?;
    let workspace = manager.workspace().await;
    print_success(&format!(
        "Connected as {} using client {}",
        workspace.owner, workspace.client_name
    ));
    print_info(&format!("Workspace root: {}", workspace.root.display()));
    Ok(())
}

/// Replace the workspace views and track one repository per installed depot
pub async fn execute_p4_views(
    ctx: &AppContext,
    args: ConnectionArgs,
    depots: Vec<String>,
    no_sync: bool,
) -> Result<()> {
    let manager = connect(ctx, args).await?;
    let mappings = manager.change_views(&depots, !no_sync).await?;

    if mappings.is_empty() {
        print_info("No known depots selected");
        return Ok(());
    }

    print_section_header("Views");
    for mapping in &mappings {
        let id = ctx
            .registry
            .add(NewRepository::new(&mapping.local_path).with_id(&mapping.id))
            .await?;
        println!(
            "{} {}",
            id.blue(),
            mapping.local_path.display().to_string().bright_black()
        );
    }
    println!();
    Ok(())
}

pub async fn execute_p4_file(
    ctx: &AppContext,
    args: ConnectionArgs,
    depot_path: &str,
    label: &str,
) -> Result<()> {
    let manager = connect(ctx, args).await?;
    let content = manager.get_specific_file(depot_path, label, true).await?;
    print!("{content}");
    Ok(())
}

pub async fn execute_p4_tree(
    ctx: &AppContext,
    args: ConnectionArgs,
    depot: &str,
    label: &str,
) -> Result<()> {
    let manager = connect(ctx, args).await?;
    for file in manager.get_depot_file_tree(depot, label).await? {
        println!("{file}");
    }
    Ok(())
}

/// A failed switch is reported and leaves the process exit status untouched
pub async fn execute_p4_switch(ctx: &AppContext, args: ConnectionArgs, change: &str) -> Result<()> {
    let manager = connect(ctx, args).await?;
    let result = manager.switch_changelist(change).await;
    if result.is_success {
        print_success(&format!("Workspace synced to changelist {change}"));
    } else {
        print_error(result.reason.as_deref().unwrap_or("switch failed"));
    }
    Ok(())
}

pub async fn execute_p4_have(ctx: &AppContext, args: ConnectionArgs, path: &Path) -> Result<()> {
    let manager = connect(ctx, args).await?;
    match manager.get_changelist_for_file(path).await? {
        Some(change) => println!("{change}"),
        None => print_info(&format!("No workspace contains {}", path.display())),
    }
    Ok(())
}
