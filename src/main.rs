use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use inventory_service::config::load_config;
use inventory_service::lifecycle::{build_state, flush_telemetry, signals, Shutdown};
use inventory_service::observability::init_logging;
use inventory_service::HttpServer;

#[derive(Parser)]
#[command(name = "inventory-service")]
#[command(about = "Inventory service: counter, access log and event fan-out", long_about = None)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long, env = "INVENTORY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Logging may not be initialised yet.
            eprintln!("inventory-service: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let config = load_config(args.config.as_deref())?;
    init_logging(&config.observability, &config.service_name)?;

    tracing::info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "inventory-service starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        counter_key = %config.counter.key,
        topic = %config.queue.topic,
        "Configuration loaded"
    );

    let (state, log_guard) = build_state(&config).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        signals::forward_signals(&signal_shutdown).await;
    });

    HttpServer::new(state).run(listener, server_shutdown).await?;

    flush_telemetry(log_guard).await;
    tracing::info!("Shutdown complete");
    Ok(())
}
