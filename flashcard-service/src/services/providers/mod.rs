//! Generative AI provider abstractions and implementations.
//!
//! The gateway talks to providers through [`GenerativeProvider`], so the
//! Gemini backend can be swapped for the mock in tests.

pub mod gemini;
pub mod mock;

use crate::models::{MediaReference, Part, Turn};
use async_trait::async_trait;
use service_core::error::AppError;
use std::path::Path;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("File {0} failed processing")]
    ProcessingFailed(String),

    #[error("File {name} still processing after {attempts} status checks")]
    ProcessingTimeout { name: String, attempts: u32 },
}

impl ProviderError {
    /// Whether the failure may clear up on its own and is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::NetworkError(_) | ProviderError::RateLimited | ProviderError::ServerError(_)
        )
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::ProcessingTimeout { .. } => AppError::GatewayTimeout(err.to_string()),
            other => AppError::BadGateway(other.to_string()),
        }
    }
}

/// Operations the service needs from a generative AI backend.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Upload a local file and return the provider's handle for it.
    async fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<MediaReference, ProviderError>;

    /// Fetch the current state of a previously uploaded file.
    async fn get_file(&self, name: &str) -> Result<MediaReference, ProviderError>;

    /// Generate a reply to `contents`, continuing the conversation in `history`.
    async fn generate(&self, history: &[Turn], contents: &[Part]) -> Result<String, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(ProviderError::NetworkError("reset".into()).is_transient());
        assert!(ProviderError::RateLimited.is_transient());
        assert!(ProviderError::ServerError("503".into()).is_transient());

        assert!(!ProviderError::InvalidRequest("bad".into()).is_transient());
        assert!(!ProviderError::ContentFiltered.is_transient());
        assert!(!ProviderError::MalformedResponse("no text".into()).is_transient());
        assert!(!ProviderError::ProcessingFailed("files/x".into()).is_transient());
    }

    #[test]
    fn polling_timeout_maps_to_gateway_timeout() {
        let err = AppError::from(ProviderError::ProcessingTimeout {
            name: "files/x".into(),
            attempts: 150,
        });
        assert!(matches!(err, AppError::GatewayTimeout(_)));

        let err = AppError::from(ProviderError::RateLimited);
        assert!(matches!(err, AppError::BadGateway(_)));
    }
}
