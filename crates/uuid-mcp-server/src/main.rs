#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use server::config::{CliArgs, ServerConfig};
use server::service::handler::McpService;
use server::session::run_session;
use server::telemetry::init_telemetry;
use server::transport::StdioTransport;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    // Requests are handled one at a time, so a single-threaded runtime is
    // all the server needs.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    // Exporters may spawn onto the ambient runtime.
    let providers = {
        let _guard = runtime.enter();
        init_telemetry(config.log_format)?
    };

    let result = runtime.block_on(run(&config));

    providers.shutdown();
    // tokio reads stdin on a blocking thread that cannot be interrupted;
    // don't let a pending read hold the process open.
    runtime.shutdown_timeout(config.shutdown_timeout);
    result
}

async fn run(config: &ServerConfig) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    // Install handlers before the first frame is read so an early SIGINT
    // still takes the graceful path.
    let signals = ShutdownSignals::install()?;
    tokio::spawn(shutdown_signal(signals, shutdown.clone()));

    let service = McpService::new(config.rng.source());
    let transport = StdioTransport::stdio(config.max_message_bytes);

    log_startup_info(config);

    if let Err(err) = run_session(transport, &service, shutdown).await {
        tracing::error!("[MCP Error] {err}");
        return Err(err.into());
    }

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::debug!("Starting with full config: {:#?}", config);
    }
    tracing::info!("UUID MCP server running on stdio");
}

#[cfg(unix)]
struct ShutdownSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }
}

#[cfg(unix)]
async fn shutdown_signal(mut signals: ShutdownSignals, shutdown: CancellationToken) {
    tokio::select! {
        _ = signals.interrupt.recv() => {
            tracing::info!("Received SIGINT signal");
        },
        _ = signals.terminate.recv() => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
    shutdown.cancel();
}

#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> std::io::Result<Self> {
        Ok(Self)
    }
}

#[cfg(not(unix))]
async fn shutdown_signal(_signals: ShutdownSignals, shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(err) => {
            tracing::error!("Failed to listen for Ctrl+C: {err}");
            return;
        }
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
    shutdown.cancel();
}
