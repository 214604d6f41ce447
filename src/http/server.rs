use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::routing::{get, post};
use axum::{Router, serve};
use tokio::net::TcpListener;

use crate::engine::Engine;
use crate::http::{health, process, reload, root};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub health: Arc<health::HealthState>,
}

pub struct HostServer {
    addr: SocketAddr,
    router: Router,
}

impl HostServer {
    pub fn new(port: u16, engine: Arc<Engine>, health: Arc<health::HealthState>) -> Self {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let state = ServerState { engine, health };
        let router = Router::new()
            .route("/", get(root::handler).post(root::handler))
            .route("/process_message", post(process::handler))
            .route("/reload_flow", post(reload::handler))
            .route("/health", get(health::handler))
            .with_state(state);
        Self { addr, router }
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!(addr = %self.addr, "starting flow runner host server");
        let listener = TcpListener::bind(self.addr).await?;
        serve(listener, self.router.into_make_service()).await?;
        Ok(())
    }
}
