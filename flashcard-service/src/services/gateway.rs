//! Client-side orchestration of provider calls.
//!
//! Wraps a [`GenerativeProvider`] with upload-then-poll for media and
//! retry with backoff for conversations.

use crate::config::GatewayConfig;
use crate::models::{FileState, MediaReference, Part, Turn};
use crate::services::providers::{GenerativeProvider, ProviderError};
use crate::services::retry::{retry_provider_call, RetryConfig};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AiGateway {
    provider: Arc<dyn GenerativeProvider>,
    retry: RetryConfig,
    poll_interval: Duration,
    poll_max_attempts: u32,
}

impl AiGateway {
    pub fn new(provider: Arc<dyn GenerativeProvider>, config: &GatewayConfig) -> Self {
        Self {
            provider,
            retry: RetryConfig::new(config.max_attempts, config.initial_backoff()),
            poll_interval: config.poll_interval(),
            poll_max_attempts: config.poll_max_attempts,
        }
    }

    /// Upload a local file and wait until the provider has processed it.
    ///
    /// Status is checked every poll interval while the file reports
    /// `PROCESSING`, at most `poll_max_attempts` times.
    pub async fn upload_media(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<MediaReference, ProviderError> {
        let mut file = self
            .provider
            .upload_file(path, mime_type, display_name)
            .await?;

        let mut polls = 0;
        while file.is_processing() {
            if polls >= self.poll_max_attempts {
                tracing::warn!(name = %file.name, polls, "File processing timed out");
                return Err(ProviderError::ProcessingTimeout {
                    name: file.name,
                    attempts: polls,
                });
            }

            tokio::time::sleep(self.poll_interval).await;
            polls += 1;
            file = self.provider.get_file(&file.name).await?;
            tracing::debug!(name = %file.name, state = ?file.state, polls, "Polled file state");
        }

        if file.state == FileState::Failed {
            return Err(ProviderError::ProcessingFailed(file.name));
        }

        Ok(file)
    }

    /// Send `contents` as the newest user turn after `history` and return
    /// the generated text.
    pub async fn converse(&self, contents: &[Part], history: &[Turn]) -> Result<String, ProviderError> {
        let provider = self.provider.as_ref();
        retry_provider_call(&self.retry, "converse", move || async move {
            provider.generate(history, contents).await
        })
        .await
    }

    pub async fn health_check(&self) -> Result<(), ProviderError> {
        self.provider.health_check().await
    }
}
