use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

/// Liveness check.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "flashcard-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness check: ready once the provider accepts our credentials.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.gateway.health_check().await.map_err(|e| {
        tracing::warn!(error = %e, "Provider not ready");
        AppError::ServiceUnavailable
    })?;

    Ok(Json(json!({ "status": "ready" })))
}
