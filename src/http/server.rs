//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (request id, tracing, CORS, error translation, panics)
//! - Bind a server instance to a port
//! - Stop an instance gracefully through its [`ServerHandle`]
//!
//! # Request Pipeline
//! ```text
//! transport
//!     → request id (set)
//!     → trace span
//!     → request id (propagate)
//!     → metrics
//!     → CORS
//!     → error translation
//!     → panic boundary
//!     → body limit
//!     → route handler (JSON extraction, collaborator call)
//! ```

use std::net::SocketAddr;

use axum::{body::Body, extract::DefaultBodyLimit, http::Request, middleware, Router};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::api::{setup_api_router, ApiState};
use crate::http::middleware::{cors_layer, panic_to_failure, translate_errors};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::net::{self, ListenerError};
use crate::observability::metrics;

/// Failure to start or stop a server instance.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("Failed to read bound address: {0}")]
    LocalAddr(std::io::Error),
    #[error("Server terminated with error: {0}")]
    Serve(std::io::Error),
    #[error("Server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One configured, not yet started, server instance.
pub struct HttpServer {
    router: Router,
    bind_host: String,
}

impl HttpServer {
    /// Create a new server from the API state and the current configuration.
    pub fn new(state: ApiState) -> Self {
        let config = state.config.load_full();
        let router = Self::build_router(state, config.server.max_body_size);
        Self {
            router,
            bind_host: config.server.bind_host.clone(),
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: ApiState, max_body_size: usize) -> Router {
        let pipeline = ServiceBuilder::new()
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "rpc",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request.request_id(),
                )
            }))
            .layer(propagate_request_id_layer())
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(cors_layer())
            .layer(middleware::from_fn(translate_errors))
            .layer(CatchPanicLayer::custom(panic_to_failure))
            .layer(DefaultBodyLimit::max(max_body_size));

        setup_api_router(state).layer(pipeline)
    }

    /// Get a clone of the fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind `port` and start serving in the background.
    pub async fn start(self, port: u16) -> Result<ServerHandle, ServerError> {
        let listener = net::bind(&self.bind_host, port).await?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let task = tokio::spawn(async move {
            // A dropped sender also counts as a shutdown request.
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::info!(address = %local_addr, "HTTP server started");
        Ok(ServerHandle {
            port: local_addr.port(),
            local_addr,
            shutdown: Some(shutdown_tx),
            task,
        })
    }
}

/// Ownership of one running server instance.
///
/// Dropping the handle requests shutdown without waiting for it.
pub struct ServerHandle {
    port: u16,
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Request graceful shutdown and wait until the listener is closed.
    pub async fn stop(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let result = (&mut self.task).await?;
        tracing::info!(address = %self.local_addr, "HTTP server stopped");
        result.map_err(ServerError::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{
        Collaborators, DetachedEngine, FsCaptureStore, HostDeviceInfo, MemoryRuleStore,
        TracingNotifier,
    };
    use crate::config::{shared, ControlPlaneConfig};
    use std::sync::Arc;

    fn state(dir: &std::path::Path) -> ApiState {
        let mut config = ControlPlaneConfig::default();
        config.server.bind_host = "127.0.0.1".into();
        let engine = Arc::new(DetachedEngine);
        ApiState {
            agent: Collaborators {
                engine: engine.clone(),
                captures: Arc::new(FsCaptureStore::new(dir, engine)),
                rules: Arc::new(MemoryRuleStore::new()),
                device: Arc::new(HostDeviceInfo),
                notifier: Arc::new(TracingNotifier),
            },
            config: shared(config),
        }
    }

    #[tokio::test]
    async fn test_stop_releases_port() {
        let dir = tempfile::tempdir().unwrap();
        let handle = HttpServer::new(state(dir.path())).start(0).await.unwrap();
        let addr = handle.local_addr();
        assert!(tokio::net::TcpStream::connect(addr).await.is_ok());

        handle.stop().await.unwrap();
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_start_fails_on_taken_port() {
        let dir = tempfile::tempdir().unwrap();
        let held = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = held.local_addr().unwrap().port();

        let err = HttpServer::new(state(dir.path())).start(port).await.err().unwrap();
        assert!(matches!(err, ServerError::Listener(ListenerError::Bind { .. })));
    }
}
