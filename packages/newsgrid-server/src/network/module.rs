//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` creates resources,
//! `start()` binds the TCP listener, and `serve()` starts accepting
//! connections. This separation allows the rest of the application to
//! finish wiring shared state (db pool, repositories) between `start()`
//! and `serve()`.

use std::future::Future;
use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tracing::info;

use super::auth::require_api_key;
use super::config::NetworkConfig;
use super::handlers::{
    get_run_handler, health_handler, liveness_handler, list_runs_handler, readiness_handler,
    trigger_run_handler, AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;

/// Manages the full HTTP server lifecycle.
///
/// Follows the deferred startup pattern:
/// 1. `new()` -- allocates shared state (shutdown controller)
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- begins accepting connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// Returns a shared reference to the shutdown controller.
    ///
    /// Other modules use this to check health state or trigger shutdown.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health` -- detailed health JSON
    /// - `GET /health/live` -- Kubernetes liveness probe
    /// - `GET /health/ready` -- Kubernetes readiness probe
    /// - `POST /pipeline/run` -- trigger a new ingest run (requires API key)
    /// - `GET /pipeline/runs` -- list runs for a date (requires API key)
    /// - `GET /pipeline/runs/{id}` -- run status (requires API key)
    pub fn build_router(&self, app_state: AppState) -> Router {
        let layers = build_http_layers(&self.config);

        // Trigger requests spin up a whole ingest run; one per second is
        // plenty for an operator or scheduler, so a burst above that is
        // almost certainly a misconfigured retry loop rather than intent.
        let governor_config = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(1)
                .burst_size(2)
                .finish()
                .expect("static governor config is valid"),
        );

        let pipeline_routes = Router::new()
            .route("/pipeline/run", post(trigger_run_handler).layer(GovernorLayer { config: governor_config }))
            .route("/pipeline/runs", get(list_runs_handler))
            .route("/pipeline/runs/{id}", get(get_run_handler))
            .layer(from_fn_with_state(app_state.clone(), require_api_key));

        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .merge(pipeline_routes)
            .layer(layers)
            .with_state(app_state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Starts serving connections until the shutdown signal fires.
    ///
    /// Consumes `self` because the listener is moved into the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a fatal I/O error.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(
        self,
        app_state: AppState,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let shutdown_ctrl = Arc::clone(&self.shutdown);
        let router = self.build_router(app_state);
        let listener = self
            .listener
            .expect("start() must be called before serve()");

        // Transition to Ready so readiness probes pass.
        shutdown_ctrl.set_ready();

        info!("serving HTTP connections");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        shutdown_ctrl.trigger_shutdown();
        Ok(())
    }
}
