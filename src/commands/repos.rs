use crate::core::{
    access::{directory_traversal_guard, repo_id_resolver},
    context::AppContext,
    error::Result,
    indexer::IndexStatus,
    output::{print_info, print_repositories, print_success},
    state::NewRepository,
};
use std::env;
use std::path::PathBuf;

/// With indexing allowed, restored repositories start walking at load; wait for
/// them so the listing shows settled file counts.
pub async fn execute_list(ctx: &AppContext, json: bool) -> Result<()> {
    if ctx.registry.allow_index() {
        for record in ctx.registry.get_repositories() {
            ctx.registry.wait_for_index(&record.id).await?;
        }
    }

    let records = ctx.registry.get_repositories();
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print_repositories(&records);
    }
    Ok(())
}

pub async fn execute_add(
    ctx: &AppContext,
    path: PathBuf,
    name: Option<String>,
    id: Option<String>,
    wait: bool,
) -> Result<()> {
    let fullpath = if path.is_absolute() {
        path
    } else {
        env::current_dir()?.join(path)
    };

    let mut new = NewRepository::new(fullpath);
    if let Some(name) = name {
        new = new.with_name(name);
    }
    if let Some(id) = id {
        new = new.with_id(id);
    }

    let id = ctx.registry.add(new).await?;
    print_success(&format!("Tracking repository as {id}"));

    if wait && ctx.registry.allow_index() {
        report_index(ctx, &id).await?;
    }
    Ok(())
}

pub async fn execute_remove(ctx: &AppContext, id: &str) -> Result<()> {
    let record = repo_id_resolver(&ctx.registry, id)?;
    ctx.registry.remove(&record.id).await?;
    print_success(&format!("Removed {}", record.id));
    Ok(())
}

pub async fn execute_rename(ctx: &AppContext, id: &str, name: &str) -> Result<()> {
    let record = repo_id_resolver(&ctx.registry, id)?;
    if ctx.registry.update(&record.id, name).await? {
        print_success(&format!("Renamed {} to {name}", record.id));
    } else {
        print_info("Name unchanged");
    }
    Ok(())
}

pub async fn execute_allow_index(ctx: &AppContext, enable: bool) -> Result<()> {
    ctx.registry.set_allow_index(enable).await?;
    if enable {
        for record in ctx.registry.get_repositories() {
            report_index(ctx, &record.id).await?;
        }
        print_success("Indexing enabled");
    } else {
        print_success("Indexing disabled");
    }
    Ok(())
}

pub async fn execute_reindex(ctx: &AppContext, id: &str) -> Result<()> {
    let record = repo_id_resolver(&ctx.registry, id)?;
    ctx.registry.re_index(&record.id)?;
    report_index(ctx, &record.id).await
}

/// Print a file of a tracked repository, refusing paths outside it
pub async fn execute_read(ctx: &AppContext, id: &str, relative_path: &str) -> Result<()> {
    let record = repo_id_resolver(&ctx.registry, id)?;
    let path = directory_traversal_guard(&record, relative_path)?;
    let content = tokio::fs::read_to_string(&path).await?;
    print!("{content}");
    Ok(())
}

pub async fn execute_check_origin(ctx: &AppContext, origin: &str) -> Result<()> {
    ctx.origin_gate.check(origin).await?;
    print_success(&format!("Origin {origin} allowed"));
    Ok(())
}

async fn report_index(ctx: &AppContext, id: &str) -> Result<()> {
    let status = ctx.registry.wait_for_index(id).await?;
    let files = ctx
        .registry
        .get_repo_by_id(id)
        .map(|record| record.tree_list.len())
        .unwrap_or_default();

    match status {
        IndexStatus::Done => print_success(&format!("Indexed {files} files in {id}")),
        IndexStatus::CapReached => print_info(&format!(
            "Indexed {files} files in {id}; the file limit was reached"
        )),
        other => log::debug!("Index of {id} settled as {other:?}"),
    }
    Ok(())
}
