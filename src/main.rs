use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use flow_runner_host::config::Config;
use flow_runner_host::engine::Engine;
use flow_runner_host::http::health::HealthState;
use flow_runner_host::http::HostServer;
use flow_runner_host::registry::FlowRegistry;
use flow_runner_host::session::SessionStore;
use flow_runner_host::store::FlowStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("startup configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let store = FlowStore::connect(&config.mysql)
        .await
        .context("connecting to the flows database")?;

    let registry = Arc::new(FlowRegistry::new());
    let sessions = Arc::new(SessionStore::new());
    let health = Arc::new(HealthState::new());
    let engine = Arc::new(Engine::new(
        registry,
        sessions,
        Arc::new(store),
        config.ai_query_api_url.clone(),
    ));

    match engine.reload().await {
        Ok(_) => health.record_reload_success(),
        Err(err) => {
            // Matches the original service's startup behavior: a failed
            // initial load is logged critically but the process still
            // starts, serving "indisponível" until a later reload succeeds.
            tracing::error!(error = %err, "initial flow load failed; starting without an active flow");
            health.record_reload_error(&err.to_string());
        }
    }

    let server = HostServer::new(config.port, engine, health);

    tokio::select! {
        result = server.serve() => {
            result.context("server exited")?;
        }
        _ = signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
    }

    Ok(())
}
