//! HTTP server linking Twitter and Mastodon identities.
//!
//! The browser client drives two OAuth logins through this server. In-flight
//! state and bearer tokens travel in signed cookies; provider app
//! registrations, PKCE challenges and identity links live in the store.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use twitodon_oauth::TwitterConfig;
//! use twitodon_server::{AppState, Server, ServerConfig};
//! use twitodon_store::MemoryStore;
//!
//! let state = AppState::new(
//!     ServerConfig::new(),
//!     Arc::new(MemoryStore::new()),
//!     TwitterConfig::new(client_id),
//!     cookie_secret.as_bytes(),
//! )?;
//! Server::from_state(state).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use middleware::{request_logging_middleware, security_headers_middleware};
pub use session::{RequestOrigin, SessionCookies};
pub use state::AppState;

use std::net::SocketAddr;
use std::time::Duration;

use axum::{Router, middleware as axum_middleware};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use twitodon_store::SharedStore;

/// The twitodon HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(routes::health_routes())
            .merge(routes::twitter_routes())
            .merge(routes::mastodon_routes())
            .merge(routes::mapping_routes());

        if let Some(dir) = &self.state.config.static_dir {
            router = router.fallback_service(ServeDir::new(dir));
        }

        router
            .layer(axum_middleware::from_fn_with_state(
                self.state.clone(),
                request_logging_middleware,
            ))
            .layer(axum_middleware::from_fn(security_headers_middleware))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server on the configured address until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;
        info!("Starting server on {}", addr);

        let purge = spawn_purge_task(self.state.store.clone(), self.state.config.purge_interval);

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)));

        purge.abort();
        info!("Server stopped");
        served
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}

/// Periodically drop expired entries (stale PKCE challenges) from `store`.
pub fn spawn_purge_task(store: SharedStore, every: Duration) -> JoinHandle<()> {
    let every = every.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Purged expired store entries"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge expired store entries"),
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
