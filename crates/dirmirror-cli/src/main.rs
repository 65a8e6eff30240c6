//! dirmirror - one-way directory mirror with remote propagation
//!
//! Keeps a target directory identical to a reference directory and mirrors every change
//! made to the target into remote storage through an external command-line client.

mod display;
mod json_output;
mod progress;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use dirmirror_config::{Config, ConfigLoader, LogRotation, LoggingConfig};
use dirmirror_sync::SyncEngine;
use dirmirror_types::{CancelFlag, Cancellable};
use progress::ProgressObserver;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// dirmirror - one-way directory mirror with remote propagation
#[derive(Parser)]
#[command(
    name = "dirmirror",
    version = env!("CARGO_PKG_VERSION"),
    about = "One-way directory mirror with remote propagation",
    long_about = "dirmirror makes a target directory identical to a reference directory.\n\
                  Every file it copies into or deletes from the target is mirrored into\n\
                  remote storage through an external command-line client."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode - errors only on the console
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode - remote client output on the console
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the target with the reference
    Sync {
        /// Reference directory (overrides sync.reference_root)
        #[arg(long)]
        reference: Option<PathBuf>,
        /// Target directory (overrides sync.target_root)
        #[arg(long)]
        target: Option<PathBuf>,
        /// Dry run - show what would be done
        #[arg(long)]
        dry_run: bool,
        /// Show a progress bar instead of per-file console logs
        #[arg(long)]
        progress: bool,
    },
    /// Show the differences between reference and target
    Diff {
        /// Reference directory (overrides sync.reference_root)
        #[arg(long)]
        reference: Option<PathBuf>,
        /// Target directory (overrides sync.target_root)
        #[arg(long)]
        target: Option<PathBuf>,
        /// Print the change set as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
        /// Output format: yaml, toml or json
        #[arg(long, default_value = "yaml")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ConfigLoader::load_default().context("Failed to load configuration")?,
    };

    match &cli.command {
        Commands::Sync {
            reference,
            target,
            dry_run,
            progress,
        } => {
            apply_root_overrides(&mut config, reference.clone(), target.clone());
            let level = console_level(&cli, &config.logging, *progress);
            let _guard = init_logging(&config.logging, level, true)?;
            info!("dirmirror v{} starting", env!("CARGO_PKG_VERSION"));
            sync_command(&config, *dry_run, *progress && !cli.quiet).await?;
        }
        Commands::Diff {
            reference,
            target,
            json,
        } => {
            apply_root_overrides(&mut config, reference.clone(), target.clone());
            let level = if *json {
                "error"
            } else {
                console_level(&cli, &config.logging, true)
            };
            let _guard = init_logging(&config.logging, level, false)?;
            diff_command(&config, *json).await?;
        }
        Commands::Config { default, format } => {
            config_command(&config, *default, format)?;
        }
    }

    Ok(())
}

fn apply_root_overrides(config: &mut Config, reference: Option<PathBuf>, target: Option<PathBuf>) {
    if let Some(reference) = reference {
        config.sync.reference_root = reference;
    }
    if let Some(target) = target {
        config.sync.target_root = target;
    }
}

/// Console verbosity; the file sink always follows the configured level
fn console_level<'a>(cli: &Cli, logging: &'a LoggingConfig, progress: bool) -> &'a str {
    if cli.debug {
        "debug"
    } else if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else if progress {
        "warn"
    } else {
        logging.level.as_str()
    }
}

fn init_logging(
    logging: &LoggingConfig,
    console_level: &str,
    file_sink: bool,
) -> Result<Option<WorkerGuard>> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{
        fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    };

    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(console_level))
        .context("Invalid console log filter")?;

    let console_layer = fmt::layer()
        .with_target(false)
        .with_ansi(logging.colored_output)
        .with_filter(console_filter);

    let mut guard = None;
    let file_layer = if file_sink && logging.enable_file_logging {
        std::fs::create_dir_all(&logging.log_dir).with_context(|| {
            format!("Failed to create log directory {}", logging.log_dir.display())
        })?;

        let rotation = match logging.rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
        };
        let appender = RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(logging.log_file.as_str())
            .build(&logging.log_dir)
            .with_context(|| format!("Failed to open log file {}", logging.log_path().display()))?;
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        guard = Some(worker_guard);

        let file_level = if console_level == "debug" {
            "debug"
        } else {
            logging.level.as_str()
        };
        Some(
            fmt::layer()
                .with_writer(writer)
                .with_target(false)
                .with_ansi(false)
                .with_filter(EnvFilter::try_new(file_level).context("Invalid file log filter")?),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn sync_command(config: &Config, dry_run: bool, show_progress: bool) -> Result<()> {
    println!(
        "{} Mirroring {} into {}",
        style("⟲").blue().bold(),
        style(config.sync.reference_root.display()).cyan(),
        style(config.sync.target_root.display()).cyan()
    );
    if dry_run {
        display::display_info("Dry run mode - no changes will be made");
    }
    if !config.remote.enabled {
        display::display_warning("Remote propagation is disabled");
    }

    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current item");
            handler_flag.cancel();
        }
    });

    let observer = Arc::new(ProgressObserver::new(show_progress));
    let engine = SyncEngine::new(config)
        .with_observer(observer.clone())
        .with_cancel_flag(cancel);

    let result = if dry_run {
        engine.dry_run().await
    } else {
        engine.run().await
    };
    observer.finish();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            display::display_error(&format!("Sync aborted: {}", e));
            return Err(e.into());
        }
    };

    let log_path = config
        .logging
        .enable_file_logging
        .then(|| config.logging.log_path());
    display::print_sync_report(&report, log_path.as_deref());
    report.ensure_complete()?;
    Ok(())
}

async fn diff_command(config: &Config, json: bool) -> Result<()> {
    let engine = SyncEngine::new(config);
    let changes = engine.compare().await?;

    if json {
        let output = json_output::DiffJson::new(config, &changes);
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        display::print_change_set(&changes);
    }
    Ok(())
}

fn config_command(config: &Config, default: bool, format: &str) -> Result<()> {
    let rendered = if default {
        println!("{} Default configuration:", style("⚙").blue().bold());
        ConfigLoader::render(&Config::default(), Some(format))?
    } else {
        println!("{} Current configuration:", style("⚙").blue().bold());
        match ConfigLoader::config_exists() {
            Some(path) => println!("# loaded from {}", path.display()),
            None => println!("# no configuration file found, showing defaults and environment"),
        }
        ConfigLoader::render(config, Some(format))?
    };
    println!("{}", rendered);
    Ok(())
}
