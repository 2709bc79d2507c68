use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use simtemp::config::Config;
use simtemp::device::Device;
use simtemp::server;

/// Virtual temperature sensor daemon.
#[derive(Parser)]
#[command(name = "simtemp", about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print version information and exit.
    Version,
}

/// Build-time version info, injected via RUSTFLAGS or build.rs.
mod version {
    /// Release version string (set at build time).
    pub const RELEASE: &str = env!("CARGO_PKG_VERSION");

    /// Git commit hash (set at build time via env, or "unknown").
    pub fn git_commit() -> &'static str {
        option_env!("GIT_COMMIT").unwrap_or("unknown")
    }

    /// Full version string with platform info.
    pub fn full() -> String {
        format!(
            "{} (commit: {}, {}/{})",
            RELEASE,
            git_commit(),
            std::env::consts::OS,
            std::env::consts::ARCH,
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle version subcommand before anything else.
    if let Some(Command::Version) = &cli.command {
        println!("simtemp {}", version::full());
        return Ok(());
    }

    // Initialize tracing.
    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;

    fmt().with_env_filter(filter).with_target(true).init();

    // Without a config file every default applies.
    let cfg = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    tracing::info!(
        version = version::RELEASE,
        commit = version::git_commit(),
        "starting simtemp",
    );

    // Build and run the tokio runtime.
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    rt.block_on(async { run(cfg).await })
}

async fn run(cfg: Config) -> Result<()> {
    // Set up signal handling.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("received SIGINT, shutting down");
            }
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, shutting down");
            }
        }

        let _ = shutdown_tx.send(());
    });

    // Register the stream and control endpoints before the producer's
    // first tick can fire.
    std::fs::create_dir_all(&cfg.runtime_dir)
        .with_context(|| format!("creating runtime dir {}", cfg.runtime_dir.display()))?;

    let stream_path = cfg.stream_socket_path();
    let control_path = cfg.control_socket_path();

    let stream_listener = server::bind(&stream_path)?;
    let control_listener = server::bind(&control_path)?;

    tracing::info!(
        stream = %stream_path.display(),
        control = %control_path.display(),
        "endpoints registered",
    );

    // Bring up the device.
    let device = Device::probe(&cfg.binding).context("bringing up simtemp device")?;

    let endpoints = tokio_util::sync::CancellationToken::new();
    let stream_task = tokio::spawn(server::serve_stream(
        stream_listener,
        device.handle(),
        endpoints.child_token(),
    ));
    let control_task = tokio::spawn(server::serve_control(
        control_listener,
        device.attributes(),
        endpoints.child_token(),
    ));

    // Wait for shutdown signal.
    let _ = shutdown_rx.await;

    // Graceful shutdown: stop accepting new clients, then tear the device
    // down; in-flight client relays observe the stopping device and exit.
    endpoints.cancel();
    let _ = stream_task.await;
    let _ = control_task.await;

    device.remove().await;

    let _ = std::fs::remove_file(&stream_path);
    let _ = std::fs::remove_file(&control_path);

    tracing::info!("simtemp stopped");

    Ok(())
}
