//! Application startup and lifecycle management.

use crate::config::FlashcardConfig;
use crate::handlers;
use crate::services::providers::gemini::{GeminiConfig, GeminiProvider, SYSTEM_INSTRUCTION};
use crate::services::providers::GenerativeProvider;
use crate::services::{AiGateway, MediaStore, SessionStore};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::request_id_middleware;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: FlashcardConfig,
    pub gateway: AiGateway,
    pub media_store: MediaStore,
    pub sessions: SessionStore,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application backed by the Gemini API.
    pub async fn build(config: FlashcardConfig) -> Result<Self, AppError> {
        let provider = GeminiProvider::new(GeminiConfig {
            api_key: config.gemini.api_key.clone(),
            model: config.gemini.model.clone(),
            api_base: config.gemini.api_base.clone(),
            request_timeout: Duration::from_secs(config.gemini.request_timeout_secs),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        })
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Gemini provider: {}", e)))?;

        tracing::info!(model = %config.gemini.model, "Initialized Gemini provider");

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application around any provider implementation.
    pub async fn build_with_provider(
        config: FlashcardConfig,
        provider: Arc<dyn GenerativeProvider>,
    ) -> Result<Self, AppError> {
        let media_store = MediaStore::new(&config.media.temp_dir).await.map_err(|e| {
            tracing::error!(
                "Failed to initialize media store at {}: {}",
                config.media.temp_dir.display(),
                e
            );
            e
        })?;

        let state = AppState {
            config: config.clone(),
            gateway: AiGateway::new(provider, &config.gateway),
            media_store,
            sessions: SessionStore::new(&config.session),
        };

        let router = build_router(state.clone());

        // Port 0 = random port for testing
        let addr: SocketAddr = config.common.bind_address().parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Invalid bind address {}: {}",
                config.common.bind_address(),
                e
            ))
        })?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Flashcard service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Handle to the in-memory session store.
    pub fn sessions(&self) -> SessionStore {
        self.state.sessions.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }

    /// Run until `signal` resolves, then drain in-flight requests.
    pub async fn run_with_graceful_shutdown<F>(self, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(signal)
            .await
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.media.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::index))
        .route("/upload", post(handlers::upload_media))
        .route("/chat", post(handlers::chat))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
