//! # userhub API Server
//!
//! HTTP front end for cached, rate-limited user lookups.
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness and version
//! - `GET /api/v1/users/:id` - Look a user up by id
//! - `GET /api/v1/users/by/:field/:value` - Look a user up by email or username
//! - `GET /api/v1/cache/stats` - Cache, single-flight and limiter counters
//! - `POST /api/v1/cache/clear` - Empty the cache and reset its counters
//!
//! Callers identify themselves with an `x-client-id` header for rate
//! limiting; requests without one share the `anonymous` budget.
//!
//! ## Example
//!
//! ```rust,ignore
//! use userhub_api::{ApiConfig, ApiServer};
//!
//! let server = ApiServer::from_config(ApiConfig::from_env()).await?;
//! server.run(([0, 0, 0, 0], 3001)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dto;
mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use handlers::CLIENT_ID_HEADER;
pub use routes::create_router;
pub use state::{ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server for userhub.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a server around prepared state.
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Opens the configured store and builds the server.
    pub async fn from_config(config: ApiConfig) -> userhub_core::Result<Self> {
        Ok(Self::new(AppState::from_config(config).await?))
    }

    /// Shared state behind the handlers.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address until Ctrl-C.
    ///
    /// The background reaper runs for as long as the server does.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let reaper = self.state.service.spawn_reaper();

        info!("userhub API server listening on {}", addr);

        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await;

        reaper.shutdown().await;
        info!("userhub API server stopped");
        served
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler the server runs until killed.
        std::future::pending::<()>().await;
    }
}

/// Starts the API server with configuration from the environment.
pub async fn start_server(port: u16) -> std::io::Result<()> {
    let server = ApiServer::from_config(ApiConfig::from_env())
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    server.run(([0, 0, 0, 0], port)).await
}
