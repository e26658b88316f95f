mod logging;

use atlas_core::config::{config_path, load_config, AtlasConfig, ConfigError, WatchConfig};
use atlas_core::output::SharedWriter;
use atlas_core::source::{FsStateSource, StateSource};
use atlas_notify::{NotificationDispatcher, NotificationPolicy};
use atlas_tui::{
    fetch_snapshot, render_report, run_watch, LastKnown, RefreshError, RenderOptions, Spinner,
    SpinnerRegistry, TuiError,
};
use clap::{Args, Parser, Subcommand};
use std::env;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::logging::{init_logging, log_target, LogTarget, LOG_FILE_ENV};

const REPORT_WIDTH: u16 = 100;

#[derive(Debug, Parser)]
#[command(name = "atlas", version, about = "Live status of atlas workspaces")]
struct Cli {
    /// State directory holding `workspaces/` and `config.toml`.
    #[arg(long, global = true, env = "ATLAS_HOME", default_value = ".atlas")]
    root: PathBuf,
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum CliCommand {
    /// Watch workspaces until `q` or Ctrl-C (default).
    Watch(WatchArgs),
    /// Print the current status once.
    Status(StatusArgs),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
struct WatchArgs {
    /// Refresh interval in milliseconds.
    #[arg(long, value_name = "MS")]
    interval: Option<u64>,
    /// Do not ring the bell when a workspace needs attention.
    #[arg(long)]
    no_bell: bool,
    /// Table only, no title, footer or bell.
    #[arg(long)]
    quiet: bool,
    /// Show a step progress column.
    #[arg(long)]
    progress: bool,
    #[arg(long)]
    no_color: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
struct StatusArgs {
    /// Print rows as JSON.
    #[arg(long)]
    json: bool,
    #[arg(long)]
    no_color: bool,
    #[arg(long)]
    progress: bool,
}

#[derive(Debug, thiserror::Error)]
enum MainError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to start async runtime: {source}")]
    Runtime {
        #[source]
        source: io::Error,
    },
    #[error("watch requires an interactive terminal, try `atlas status`")]
    NotInteractive,
    #[error("refresh failed: {0}")]
    Refresh(#[from] RefreshError),
    #[error("failed to serialize status as json: {source}")]
    SerializeStatus {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write output: {source}")]
    Output {
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Tui(#[from] TuiError),
}

fn main() {
    if let Err(err) = run() {
        eprintln!("atlas: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), MainError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| CliCommand::Watch(WatchArgs::default()));

    let stderr = SharedWriter::stderr();
    let registry = SpinnerRegistry::new();
    let target = log_target(
        matches!(command, CliCommand::Watch(_)),
        env::var_os(LOG_FILE_ENV).map(PathBuf::from),
    );
    init_logging(&target, stderr.clone(), registry.clone()).map_err(|source| {
        MainError::LogFile {
            path: match &target {
                LogTarget::File(path) => path.clone(),
                _ => PathBuf::new(),
            },
            source,
        }
    })?;

    let config = load_config(config_path(&cli.root))?;
    tracing::debug!(root = %cli.root.display(), ?config, "loaded config");
    let source: Arc<dyn StateSource> = Arc::new(FsStateSource::new(&cli.root));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| MainError::Runtime { source })?;

    match command {
        CliCommand::Watch(args) => runtime.block_on(run_watch_command(&config, &args, source)),
        CliCommand::Status(args) => runtime.block_on(run_status_command(
            &config, &args, source, stderr, registry,
        )),
    }
}

/// File settings with command-line flags layered on top.
fn apply_overrides(config: &AtlasConfig, args: &WatchArgs) -> WatchConfig {
    let mut watch = config.watch.clone();
    if let Some(interval_ms) = args.interval {
        watch.interval_ms = interval_ms;
    }
    if args.no_bell {
        watch.bell = false;
    }
    if args.quiet {
        watch.quiet = true;
    }
    if args.progress {
        watch.show_progress = true;
    }
    watch
}

fn no_color_env() -> bool {
    env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

fn resolve_color(configured: bool, no_color_flag: bool, no_color_env: bool, is_tty: bool) -> bool {
    configured && !no_color_flag && !no_color_env && is_tty
}

async fn run_watch_command(
    config: &AtlasConfig,
    args: &WatchArgs,
    source: Arc<dyn StateSource>,
) -> Result<(), MainError> {
    if !io::stdout().is_terminal() {
        return Err(MainError::NotInteractive);
    }
    let watch = apply_overrides(config, args);
    let color = resolve_color(config.ui.color, args.no_color, no_color_env(), true);

    let out = SharedWriter::stdout();
    let dispatcher =
        NotificationDispatcher::from_policy(&NotificationPolicy::default(), out.clone());
    tracing::info!(interval_ms = watch.interval_ms, bell = watch.bell, "starting watch");
    run_watch(watch, color, source, Arc::new(dispatcher), out).await?;
    Ok(())
}

async fn run_status_command(
    config: &AtlasConfig,
    args: &StatusArgs,
    source: Arc<dyn StateSource>,
    stderr: SharedWriter,
    registry: SpinnerRegistry,
) -> Result<(), MainError> {
    let spinner = io::stderr().is_terminal().then(|| {
        let spinner = Spinner::new(stderr, registry);
        spinner.start("loading workspaces");
        spinner
    });
    let fetched =
        tokio::task::spawn_blocking(move || fetch_snapshot(source.as_ref(), &LastKnown::new()))
            .await;
    if let Some(spinner) = &spinner {
        spinner.stop();
    }
    let snapshot = fetched
        .map_err(|err| RefreshError::new(format!("refresh task failed: {err}")))??;

    let stdout = io::stdout();
    let is_tty = stdout.is_terminal();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &snapshot.rows)
            .map_err(|source| MainError::SerializeStatus { source })?;
        writeln!(out).map_err(|source| MainError::Output { source })?;
        return Ok(());
    }

    let width = if is_tty {
        crossterm::terminal::size()
            .map(|(width, _)| width)
            .unwrap_or(REPORT_WIDTH)
    } else {
        REPORT_WIDTH
    };
    let options = RenderOptions {
        width,
        height: 0,
        color: resolve_color(config.ui.color, args.no_color, no_color_env(), is_tty),
        quiet: false,
        show_progress: args.progress || config.watch.show_progress,
    };
    writeln!(out, "{}", render_report(&snapshot.rows, &options))
        .map_err(|source| MainError::Output { source })
}
