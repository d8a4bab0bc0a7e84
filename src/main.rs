//! nowplaying - caching proxy for the Last.fm recent tracks API
//!
//! Serves `GET /lastfm.php` for the portfolio frontend. Upstream is called at
//! most once per freshness window; every other request is answered from the
//! cache file.

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nowplaying::cli::{Cli, Command};
use nowplaying::config::Config;
use nowplaying::error::{ApiError, ErrorResponse};
use nowplaying::gate::CacheGate;
use nowplaying::server::{self, AppState};

/// Logs go to stderr so `fetch` output on stdout stays plain JSON
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,nowplaying=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints an error body on stdout, the same shape the endpoint returns
fn print_error(body: &ErrorResponse) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(body)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "Invalid configuration");
            print_error(&ErrorResponse::new(err.to_string()))?;
            return Ok(ExitCode::FAILURE);
        }
    };
    cli.apply(&mut config);

    tracing::info!(
        user = %config.user,
        limit = config.limit,
        cache_dir = %config.cache_dir.display(),
        cache_duration_secs = config.cache_duration_secs,
        "Configuration loaded"
    );

    let gate = CacheGate::from_config(&config);

    match cli.command() {
        Command::Serve => {
            serve(gate, config.port).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Fetch => fetch_once(&gate).await,
    }
}

async fn serve(gate: CacheGate, port: u16) -> std::io::Result<()> {
    let app = server::router(AppState::new(gate));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn fetch_once(gate: &CacheGate) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match gate.handle_request().await {
        Ok(envelope) => {
            println!("{}", serde_json::to_string(&envelope)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let err = ApiError::from(err);
            tracing::error!(error = ?err, "Fetch failed");
            print_error(&ErrorResponse::from(&err))?;
            Ok(ExitCode::FAILURE)
        }
    }
}
