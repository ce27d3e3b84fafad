//! castq scheduler daemon (castq-sd) - main entry point
//!
//! Starts the scheduler owner, the poll loop, the playback driver and the
//! HTTP command surface, then serves until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use castq_common::events::EventBus;
use castq_sd::config::{Config, Overrides};
use castq_sd::media::MediaStore;
use castq_sd::playback::{EventSink, PlaybackDriver};
use castq_sd::scheduler::{self, Scheduler};
use castq_sd::source::{EventSourceClient, Poller};
use castq_sd::{build_router, AppContext};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// EventBus buffer before slow SSE clients start lagging
const EVENT_BUS_CAPACITY: usize = 256;

/// Command-line arguments for castq-sd
#[derive(Parser, Debug)]
#[command(name = "castq-sd")]
#[command(about = "Live commentary broadcast scheduler")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "CASTQ_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "CASTQ_PORT")]
    port: Option<u16>,

    /// Commentary source endpoint (overrides config file)
    #[arg(short, long, env = "CASTQ_ENDPOINT")]
    endpoint: Option<String>,

    /// Broadcast context (match) id to start with
    #[arg(long, env = "CASTQ_CONTEXT_ID")]
    context_id: Option<String>,

    /// Directory for manually injected media
    #[arg(long)]
    media_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is resolved before tracing init so the TOML log level applies;
    // resolver warnings emitted before init are not shown.
    let config = Config::load(
        args.config.clone(),
        Overrides {
            port: args.port,
            endpoint: args.endpoint.clone(),
            context_id: args.context_id.clone(),
            media_dir: args.media_dir.clone(),
        },
    )
    .context("Invalid configuration")?;

    // Initialize tracing (RUST_LOG wins over the config file)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "castq_sd={level},castq_common={level},tower_http={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting castq scheduler (castq-sd) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!(
        endpoint = ?config.settings.endpoint,
        context_id = ?config.context_id,
        media_dir = %config.media_dir.display(),
        "Configuration resolved"
    );

    tokio::fs::create_dir_all(&config.media_dir)
        .await
        .with_context(|| format!("Failed to create media directory {}", config.media_dir.display()))?;

    let bus = EventBus::new(EVENT_BUS_CAPACITY);
    let client = EventSourceClient::new(config.request_timeout).context("Failed to create HTTP client")?;

    let media = MediaStore::new(config.media_dir.clone());

    // Scheduler owner
    let (handle, owner_task) = scheduler::spawn(
        Scheduler::new(config.settings.clone(), config.context_id.clone()),
        bus.clone(),
        media.clone(),
    );

    // Poll loop
    let poller = Poller::new(
        handle.clone(),
        client.clone(),
        config.poll_interval,
        config.unconfigured_retry,
    );
    let poll_task = tokio::spawn(poller.run());

    // Playback driver
    let driver = PlaybackDriver::new(
        Arc::new(EventSink::new(bus.clone())),
        handle.active_watch(),
        config.settle_delay,
    );
    let driver_task = tokio::spawn(driver.run());

    let app = build_router(AppContext {
        scheduler: handle,
        client,
        bus,
        media,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    poll_task.abort();
    driver_task.abort();
    owner_task.abort();

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
