// src/main.rs
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use probe_server::{
    config,
    endpoints::ProbeState,
    metrics::{start_metrics_server, MetricsRegistry},
    server::{ProbeHandler, ServerBuilder},
    system::{HostInfo, ProcessMetrics},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("probe_server=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;

    // Process metrics are measured from here
    let provider = Arc::new(ProcessMetrics::new(config.probes.memory.limit_bytes()));
    let host = HostInfo::from_env(&config);
    if let Some(azure) = &host.azure {
        info!("Running on Azure App Service site {}", azure.site_name);
    }

    let mut state = ProbeState::new(config.clone(), host, provider);

    // Start metrics server if enabled
    if config.metrics.enabled {
        let metrics_registry = Arc::new(MetricsRegistry::new()?);
        state = state.with_metrics(metrics_registry.collector());

        let metrics_addr: SocketAddr = (config.server.host, config.metrics.port).into();
        start_metrics_server(metrics_addr, metrics_registry, config.metrics.path.clone()).await?;
    }

    let handler = ProbeHandler::new(Arc::new(state));

    // Start probe server
    let addr = config.server.addr();
    info!(
        "Starting probe server on {} ({})",
        addr, config.app.environment
    );

    ServerBuilder::new(addr)
        .with_handler(handler)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    info!("Probe server stopped");
    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
