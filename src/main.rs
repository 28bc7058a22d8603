//! barpoll - status-bar metrics service binary.

use anyhow::Context;
use barpoll::{Config, Publisher, Scheduler};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "barpoll")]
#[command(about = "Frugal system metrics poller for status-bar widgets")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to a JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base scheduler tick in milliseconds (overrides config)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Full-snapshot heartbeat period in seconds (overrides config)
    #[arg(long)]
    heartbeat_secs: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the polling service (default)
    Run,

    /// Sample every metric once, print a full snapshot, and exit
    Snapshot,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let mut config =
        Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_ms = tick_ms;
    }
    if let Some(heartbeat_secs) = cli.heartbeat_secs {
        config.heartbeat_secs = heartbeat_secs;
    }

    match cli.command {
        Some(Commands::Snapshot) => snapshot_command(&config).await,
        Some(Commands::Run) | None => run_command(&config).await,
    }
}

/// Diagnostics go to stderr; stdout is the data channel.
fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // RUST_LOG wins over the -v/-d flags when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run_command(config: &Config) -> anyhow::Result<()> {
    let collectors = barpoll::metrics::default_collectors(config);
    let (frame_tx, frame_rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Only scheduler construction is fatal; it validates the collector
    // set before the first tick.
    let scheduler = Scheduler::new(config, collectors, frame_tx)
        .context("scheduler initialization failed")?;
    info!("barpoll started");

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            let _ = shutdown_tx.send(true);
        }
    });

    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));
    let publisher = Publisher::new(std::io::stdout().lock());
    if let Err(err) = publisher.run(frame_rx).await {
        error!(error = %err, "publisher failed");
        return Err(err.into());
    }
    scheduler_task.await.context("scheduler task panicked")?;
    info!("barpoll stopped");
    Ok(())
}

async fn snapshot_command(config: &Config) -> anyhow::Result<()> {
    let snapshot = barpoll::collect_once(config).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
