use clap::{Parser, Subcommand, ValueEnum};
use source_bridge::commands::*;
use source_bridge::core::{
    access::HttpOriginVerifier,
    config::Settings,
    context::AppContext,
    dirs::AppPaths,
    error::{log_error, Result},
    print_error,
    store::JsonStore,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "source-bridge")]
#[command(about = "Track local, Git and Perforce sources for remote debugging clients")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[derive(clap::Args)]
struct P4Connection {
    /// Server address, e.g. ssl:perforce:1666
    #[arg(long)]
    port: Option<String>,
    /// Perforce user
    #[arg(long)]
    user: Option<String>,
    /// Command timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

impl From<P4Connection> for ConnectionArgs {
    fn from(args: P4Connection) -> Self {
        Self {
            port: args.port,
            user: args.user,
            timeout: args.timeout,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List tracked repositories
    List {
        #[arg(long)]
        json: bool,
    },
    /// Track a directory
    Add {
        path: PathBuf,
        #[arg(long)]
        name: Option<String>,
        /// Use this id instead of resolving one from the VCS remote
        #[arg(long)]
        id: Option<String>,
        /// Wait for indexing to finish
        #[arg(long)]
        wait: bool,
    },
    /// Stop tracking a repository
    Remove { id: String },
    /// Rename a repository
    Rename { id: String, name: String },
    /// Enable or disable file indexing for every repository
    AllowIndex { state: Toggle },
    /// Rebuild one repository's file list
    Reindex { id: String },
    /// Print a file of a tracked repository
    Read { id: String, path: String },
    /// Check whether an origin may use the API
    CheckOrigin { origin: String },
    /// Mirror a Git remote at a ref
    SyncGit {
        url: String,
        #[arg(value_name = "REF")]
        git_ref: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        token: Option<String>,
        /// Track the mirror as a repository
        #[arg(long)]
        track: bool,
    },
    /// List a Git remote's refs without cloning
    TestGit {
        url: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        token: Option<String>,
    },
    /// Connect to Perforce and set up the managed client
    P4Test {
        #[command(flatten)]
        connection: P4Connection,
    },
    /// Replace the client views with the given depots
    P4Views {
        depots: Vec<String>,
        /// Fetch the directory structure only
        #[arg(long)]
        no_sync: bool,
        #[command(flatten)]
        connection: P4Connection,
    },
    /// Print a depot file at a label or changelist
    P4File {
        depot_path: String,
        #[arg(long, default_value = "")]
        label: String,
        #[command(flatten)]
        connection: P4Connection,
    },
    /// List the files of a depot
    P4Tree {
        depot: String,
        #[arg(long, default_value = "")]
        label: String,
        #[command(flatten)]
        connection: P4Connection,
    },
    /// Sync the workspace to a changelist
    P4Switch {
        change: String,
        #[command(flatten)]
        connection: P4Connection,
    },
    /// Show the changelist a local file's workspace is synced to
    P4Have {
        path: PathBuf,
        #[command(flatten)]
        connection: P4Connection,
    },
}

fn init_logging(debug: bool, settings: &Settings) {
    let filter = if debug { "debug" } else { settings.log_filter() };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    std::panic::set_hook(Box::new(|info| {
        log::error!("Unhandled panic: {info}");
    }));
}

fn build_context(debug: bool) -> Result<AppContext> {
    let paths = AppPaths::from_environment()?;
    let store = Arc::new(JsonStore::open(paths.store_file())?);
    init_logging(debug, &Settings::load(&store));
    AppContext::build(paths, store, Arc::new(HttpOriginVerifier::default()))
}

async fn run(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::List { json } => execute_list(ctx, json).await,
        Commands::Add {
            path,
            name,
            id,
            wait,
        } => execute_add(ctx, path, name, id, wait).await,
        Commands::Remove { id } => execute_remove(ctx, &id).await,
        Commands::Rename { id, name } => execute_rename(ctx, &id, &name).await,
        Commands::AllowIndex { state } => {
            execute_allow_index(ctx, matches!(state, Toggle::On)).await
        }
        Commands::Reindex { id } => execute_reindex(ctx, &id).await,
        Commands::Read { id, path } => execute_read(ctx, &id, &path).await,
        Commands::CheckOrigin { origin } => execute_check_origin(ctx, &origin).await,
        Commands::SyncGit {
            url,
            git_ref,
            username,
            token,
            track,
        } => execute_sync_git(ctx, url, git_ref, username, token, track).await,
        Commands::TestGit {
            url,
            username,
            token,
        } => execute_test_git(ctx, &url, username, token).await,
        Commands::P4Test { connection } => execute_p4_test(ctx, connection.into()).await,
        Commands::P4Views {
            depots,
            no_sync,
            connection,
        } => execute_p4_views(ctx, connection.into(), depots, no_sync).await,
        Commands::P4File {
            depot_path,
            label,
            connection,
        } => execute_p4_file(ctx, connection.into(), &depot_path, &label).await,
        Commands::P4Tree {
            depot,
            label,
            connection,
        } => execute_p4_tree(ctx, connection.into(), &depot, &label).await,
        Commands::P4Switch { change, connection } => {
            execute_p4_switch(ctx, connection.into(), &change).await
        }
        Commands::P4Have { path, connection } => {
            execute_p4_have(ctx, connection.into(), &path).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match build_context(cli.debug) {
        Ok(ctx) => run(&ctx, cli.command).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        log_error("source-bridge", &e);
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
