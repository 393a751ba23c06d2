use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use thumbnail_pipeline::Thumbnailer;

use crate::config::ProxyConfig;
use crate::handler;
use crate::origin::OriginClient;
use crate::worker::WorkerPool;

/// Shared by every request
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub origin: OriginClient,
    pub workers: Arc<WorkerPool>,
    pub thumbnailer: Thumbnailer,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let origin = OriginClient::new(config.fetch_timeout, config.max_source_bytes)
            .context("Failed to build origin HTTP client")?;
        let workers = WorkerPool::new(config.worker_threads).context("Failed to start thumbnail workers")?;
        let thumbnailer = Thumbnailer::new(config.thumbnail);

        Ok(Self {
            config: Arc::new(config),
            origin,
            workers: Arc::new(workers),
            thumbnailer,
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handler::thumbnail))
        .with_state(state)
}

/// Serve until `shutdown` resolves, letting in-flight requests finish.
pub async fn start_server(state: AppState, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
    let addr = state.config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(
        workers = state.workers.threads(),
        strategy = %state.thumbnailer.config().strategy,
        "Image proxy listening on http://{}",
        addr
    );

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
