use crate::dtos::{ChatForm, ChatResponse};
use crate::middleware::{SessionKey, ValidatedForm};
use crate::models::{Part, Role};
use crate::startup::AppState;
use axum::{extract::State, Json};
use service_core::error::AppError;

/// Message returned when a chat arrives before any media was uploaded.
pub const NO_MEDIA_MESSAGE: &str = "No media found.";

pub async fn chat(
    State(state): State<AppState>,
    session: SessionKey,
    ValidatedForm(form): ValidatedForm<ChatForm>,
) -> Result<Json<ChatResponse>, AppError> {
    let key = session.as_str();
    let lock = state
        .sessions
        .conversation_lock(key)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!(NO_MEDIA_MESSAGE)))?;
    let _guard = lock.lock().await;

    let history = state
        .sessions
        .get(key)
        .map(|s| s.history)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!(NO_MEDIA_MESSAGE)))?;

    let query = Part::text(form.query);
    let reply = state
        .gateway
        .converse(std::slice::from_ref(&query), &history)
        .await
        .map_err(|e| {
            tracing::error!(session = %key, error = %e, "Chat request failed");
            e
        })?;

    state.sessions.append_turn(key, Role::User, vec![query])?;
    state
        .sessions
        .append_turn(key, Role::Model, vec![Part::text(reply.clone())])?;

    tracing::info!(
        session = %key,
        history_len = history.len() + 2,
        reply_len = reply.len(),
        "Chat turn completed"
    );

    Ok(Json(ChatResponse { response: reply }))
}
