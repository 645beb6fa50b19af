//! API gateway binary.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ routing (live table) ──▶ filter chain
//!                                                                   │
//!                                                          pre hooks│
//!                                                                   ▼
//!     Client Response                                       proxy::Forwarder ──▶ Upstream
//!     ◀────────────── post hooks (reverse order) ◀──────────────────┘
//!
//!     config file ──▶ watcher / SIGHUP / POST /admin/reload ──▶ RouteStore swap
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use api_gateway::admin::{reload_task, setup_admin_router, AdminState, RouteStore};
use api_gateway::config::{load_config, ConfigWatcher, GatewayConfig};
use api_gateway::filter::FilterRegistry;
use api_gateway::lifecycle::{reload_on_sighup, shutdown_on_signal, Shutdown};
use api_gateway::observability::init_logging;
use api_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "api-gateway", version)]
#[command(about = "HTTP API gateway with hot-reloadable routes", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Without one the gateway starts
    /// with defaults and no routes, and cannot reload.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        "api-gateway starting"
    );

    let store = Arc::new(RouteStore::from_config(&config, FilterRegistry::with_builtins())?);
    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    // Keep the watcher alive for the lifetime of the process.
    let _watcher = match &args.config {
        Some(path) => {
            let (reload_tx, reload_rx) = mpsc::unbounded_channel();
            tokio::spawn(reload_on_sighup(reload_tx.clone(), shutdown.clone()));
            tokio::spawn(reload_task(store.clone(), path.clone(), reload_rx, shutdown.token()));

            match ConfigWatcher::new(path, reload_tx).run() {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, reload via SIGHUP or admin API");
                    None
                }
            }
        }
        None => None,
    };

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");

        let router = setup_admin_router(AdminState::new(
            store.clone(),
            args.config.clone(),
            &config.admin.api_key,
        ));
        let token = shutdown.token();
        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin API stopped");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::with_store(config, store);
    server.run(listener, shutdown.token()).await?;

    shutdown.trigger();
    tracing::info!("Shutdown complete");
    Ok(())
}
