//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::services::TokenService;
use crate::config::Settings;
use crate::infrastructure::storage::S3Storage;
use crate::infrastructure::{cache, database, metrics};
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::Gateway;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// `None` when Redis is not configured; rate limiting is then off
    pub redis: Option<ConnectionManager>,
    pub tokens: Arc<TokenService>,
    pub storage: Arc<S3Storage>,
    pub gateway: Arc<Gateway>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// State over an existing pool, with fresh token service, storage
    /// client and gateway.
    pub fn new(db: PgPool, redis: Option<ConnectionManager>, settings: Settings) -> Self {
        Self {
            db,
            redis,
            tokens: Arc::new(TokenService::new(&settings.jwt)),
            storage: Arc::new(S3Storage::new(&settings.storage)),
            gateway: Arc::new(Gateway::new()),
            settings: Arc::new(settings),
        }
    }
}

/// Full router with tracing and CORS applied
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);
    routes::create_router(state)
        .layer(logging::create_trace_layer())
        .layer(cors)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        metrics::init_metrics();
        health::init_server_start();

        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db).await?;
            tracing::info!("Database migrations applied");
        }

        // Redis is optional
        let redis = cache::create_redis_client(&settings.redis).await?;
        match redis {
            Some(_) => tracing::info!("Redis connection established"),
            None => tracing::warn!("Redis not configured, rate limiting disabled"),
        }

        let addr = settings.server_addr();
        let state = AppState::new(db, redis, settings);
        tracing::info!(bucket = %state.settings.storage.bucket, "Object storage client created");

        let router = build_router(state);

        // Bind to address
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
