//! Demo HTTP server with graceful shutdown.
//!
//! Serves "Hello, World!" until a shutdown signal arrives, then drains
//! in-flight requests. Pressing Ctrl+C twice (with `--double-signal`) or
//! exceeding `--grace-secs` forces the process to exit.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::{routing::get, Router};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use shutdown_watch::config::load_settings;
use shutdown_watch::observability::{logging, metrics};
use shutdown_watch::{watch, ShutdownOption};

#[derive(Parser)]
#[command(name = "shutdown-watch")]
#[command(about = "HTTP server demonstrating graceful shutdown", long_about = None)]
struct Cli {
    /// Address to serve on.
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Shutdown settings file (TOML). Flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Grace period before a forced exit, in seconds.
    #[arg(long)]
    grace_secs: Option<u64>,

    /// Force exit on a second signal.
    #[arg(long)]
    double_signal: bool,

    /// Expose Prometheus metrics on this address.
    #[arg(long)]
    metrics_address: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_tracing("shutdown_watch=debug,tower_http=debug");
    let cli = Cli::parse();

    let mut options = match &cli.config {
        Some(path) => load_settings(path)?.into_options(),
        None => Vec::new(),
    };
    if let Some(secs) = cli.grace_secs {
        options.push(ShutdownOption::GracePeriod(Duration::from_secs(secs)));
    }
    if cli.double_signal {
        options.push(ShutdownOption::DoubleSignal);
    }

    if let Some(addr) = cli.metrics_address {
        metrics::init_metrics(addr);
    }

    let (ctx, release) = watch(options).await?;

    let app = Router::new()
        .route("/", get(|| async { "Hello, World!" }))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(cli.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "HTTP server started");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(ctx.clone().into_done())
        .await;

    match &served {
        Ok(()) => {
            let cause = ctx.cause().map(|c| c.to_string());
            tracing::info!(cause = ?cause, "HTTP server stopped, bye!");
        }
        Err(e) => tracing::error!(error = %e, "HTTP server error"),
    }
    release.release();

    Ok(())
}
