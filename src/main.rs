//! ClearCase SCM - headless host for the ClearCase source-control provider.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clearcase_scm::clearcase::{ClearCaseClient, ClearCaseError};
use clearcase_scm::config::{ConfigError, ConfigLoader, ScmConfig};
use clearcase_scm::display;
use clearcase_scm::process::{LogSink, MemorySink, ProcessRunner, TracingSink};
use clearcase_scm::scm::{
    Action, ActionHost, ActionOutcome, CommandDispatcher, GroupKind, GroupSnapshot, ScmProvider,
    TrackedResource,
};
use clearcase_scm::watcher::{WatcherError, WorkspaceWatcher};

#[derive(Parser)]
#[command(
    name = "clearcase-scm",
    about = "ClearCase source control from the command line",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (defaults to .clearcase-scm.toml, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workspace root (defaults to the current directory).
    #[arg(short = 'w', long, global = true)]
    workspace: Option<PathBuf>,

    /// Path to cleartool.
    #[arg(long, global = true)]
    executable: Option<String>,

    /// Print the ClearCase output channel before exiting.
    #[arg(long, global = true)]
    show_output: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the installed ClearCase version.
    Info,
    /// Show the type of the current view.
    View,
    /// List checked-out, element and view-private groups.
    Status {
        /// Emit JSON instead of colored text.
        #[arg(long)]
        json: bool,
    },
    /// Keep the groups in sync with workspace changes until interrupted.
    Watch,
    /// Check out files without a comment.
    Checkout { paths: Vec<PathBuf> },
    /// Check in files.
    Checkin {
        paths: Vec<PathBuf>,
        /// Check-in comment; prompted for on a terminal when omitted.
        #[arg(short = 'c', long)]
        comment: Option<String>,
    },
    /// Undo a checkout, keeping the file contents.
    UndoCheckout { paths: Vec<PathBuf> },
    /// Open the graphical version tree.
    VersionTree { paths: Vec<PathBuf> },
    /// Make new elements (not supported yet).
    Mkelem { paths: Vec<PathBuf> },
    /// Report whether a file is checked out.
    IsCheckedOut { path: PathBuf },
}

#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    ClearCase(#[from] ClearCaseError),
    #[error(transparent)]
    Watcher(#[from] WatcherError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Host inputs for command-line use: no active editor, comment from the
/// flag or a terminal prompt.
struct CliHost {
    comment: Option<String>,
}

#[async_trait]
impl ActionHost for CliHost {
    fn active_file(&self) -> Option<PathBuf> {
        None
    }

    async fn commit_comment(&self) -> String {
        if let Some(comment) = &self.comment {
            return comment.clone();
        }
        if !std::io::stdin().is_terminal() {
            return String::new();
        }
        let mut stdout = tokio::io::stdout();
        if let Err(e) = stdout.write_all(b"Check-in comment (empty for none): ").await {
            tracing::debug!(error = %e, "Failed to write comment prompt");
        }
        if let Err(e) = stdout.flush().await {
            tracing::debug!(error = %e, "Failed to flush comment prompt");
        }
        let mut line = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
            Ok(_) => line.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read comment");
                String::new()
            }
        }
    }
}

#[derive(Serialize)]
struct GroupReport<'a> {
    id: &'static str,
    label: &'static str,
    #[serde(flatten)]
    snapshot: &'a GroupSnapshot,
}

#[derive(Serialize)]
struct StatusReport<'a> {
    count: usize,
    groups: Vec<GroupReport<'a>>,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<ScmConfig, ConfigError> {
    let loader = cli
        .config
        .clone()
        .map_or_else(ConfigLoader::discover, ConfigLoader::from_file);
    let mut config = loader.load()?;
    if let Some(workspace) = &cli.workspace {
        config.workspace_root = Some(workspace.clone());
    }
    if let Some(executable) = &cli.executable {
        config.executable.clone_from(executable);
    }
    config.show_output |= cli.show_output;
    Ok(config)
}

fn selection(paths: &[PathBuf]) -> Result<Vec<TrackedResource>, std::io::Error> {
    let cwd = std::env::current_dir()?;
    Ok(paths
        .iter()
        .map(|path| TrackedResource::new(cwd.join(path)))
        .collect())
}

fn print_groups(provider: &ScmProvider) {
    let root = provider.workspace_root();
    for (kind, snapshot) in provider.snapshots() {
        let hide = provider.group(kind).hide_when_empty();
        display::print_group(root, kind, &snapshot, hide);
    }
    display::print_badge(provider.count());
}

async fn status(client: ClearCaseClient, config: &ScmConfig, json: bool) -> Result<bool, AppError> {
    let provider = ScmProvider::new(client, config.provider_options());
    let refreshed = provider.refresh().await;

    if json {
        let snapshots = provider.snapshots();
        let report = StatusReport {
            count: provider.count(),
            groups: snapshots
                .iter()
                .map(|(kind, snapshot)| GroupReport {
                    id: kind.id(),
                    label: kind.label(),
                    snapshot,
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_groups(&provider);
    }
    Ok(refreshed)
}

async fn watch(client: ClearCaseClient, config: &ScmConfig) -> Result<bool, AppError> {
    let info = client.tool_info().await?;
    client.log().append_line(&info);

    let provider = ScmProvider::open(client, config.provider_options()).await;
    print_groups(&provider);

    // Keeps the notify backend alive for the lifetime of the loop.
    let _watcher = if config.watch.enabled {
        let (watcher, changes) =
            WorkspaceWatcher::new(provider.workspace_root(), config.watch.debounce())?;
        let _watch_loop = provider.spawn_watch_loop(changes);
        Some(watcher)
    } else {
        tracing::info!("Workspace watching disabled");
        None
    };

    let mut checked_out = provider.group(GroupKind::CheckedOut).subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = checked_out.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = checked_out.borrow_and_update().clone();
                display::print_group(
                    provider.workspace_root(),
                    GroupKind::CheckedOut,
                    &snapshot,
                    false,
                );
                display::print_badge(provider.count());
            }
        }
    }

    provider.dispose();
    Ok(true)
}

async fn act(
    client: ClearCaseClient,
    config: &ScmConfig,
    action: Action,
    paths: &[PathBuf],
    comment: Option<String>,
) -> Result<bool, AppError> {
    let provider = Arc::new(ScmProvider::new(client, config.provider_options()));
    let dispatcher = CommandDispatcher::new(Arc::clone(&provider), Arc::new(CliHost { comment }));
    let outcome = dispatcher.dispatch(action, &selection(paths)?).await;
    display::print_outcome(action.id(), &outcome);
    if outcome == ActionOutcome::Completed && action.refreshes() {
        display::print_badge(provider.count());
    }
    Ok(!matches!(outcome, ActionOutcome::Failed(_)))
}

async fn execute(
    command: Commands,
    client: ClearCaseClient,
    config: &ScmConfig,
) -> Result<bool, AppError> {
    match command {
        Commands::Info => {
            println!("{}", client.tool_info().await?);
            Ok(true)
        }
        Commands::View => {
            display::print_view_type(client.detect_view_type().await?);
            Ok(true)
        }
        Commands::Status { json } => status(client, config, json).await,
        Commands::Watch => watch(client, config).await,
        Commands::Checkout { paths } => act(client, config, Action::CheckOut, &paths, None).await,
        Commands::Checkin { paths, comment } => {
            act(client, config, Action::CheckIn, &paths, comment).await
        }
        Commands::UndoCheckout { paths } => {
            act(client, config, Action::UndoCheckOut, &paths, None).await
        }
        Commands::VersionTree { paths } => {
            act(client, config, Action::ShowVersionTree, &paths, None).await
        }
        Commands::Mkelem { paths } => {
            act(client, config, Action::MakeElement, &paths, None).await
        }
        Commands::IsCheckedOut { path } => {
            let path = std::env::current_dir()?.join(path);
            let checked_out = client.is_checked_out(&path).await?;
            display::print_checked_out(&path, checked_out);
            Ok(true)
        }
    }
}

async fn run(cli: Cli) -> Result<bool, AppError> {
    let config = load_config(&cli)?;
    if !config.enabled && matches!(cli.command, Commands::Status { .. } | Commands::Watch) {
        tracing::info!("ClearCase integration disabled by configuration");
        return Ok(true);
    }

    let root = config.resolve_workspace_root()?;
    let memory = config.show_output.then(MemorySink::new);
    let log: Arc<dyn LogSink> = match &memory {
        Some(sink) => Arc::new(sink.clone()),
        None => Arc::new(TracingSink),
    };
    let runner = ProcessRunner::new(config.executable.clone(), root, Arc::clone(&log));
    let client = ClearCaseClient::new(Arc::new(runner), log);

    let result = execute(cli.command, client, &config).await;

    if let Some(sink) = &memory {
        display::print_output_channel(&sink.lines());
    }
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
