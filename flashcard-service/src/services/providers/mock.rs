//! Mock provider implementation for testing.

use super::{GenerativeProvider, ProviderError};
use crate::models::{FileState, MediaReference, Part, Turn};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Reply used for flashcard requests when nothing is scripted.
const DEFAULT_FLASHCARDS: &str = "```json\n[\
{\"title\": \"Epistemology\", \"description\": \"The study of knowledge and justified belief.\"},\
{\"title\": \"Hermeneutics\", \"description\": \"The theory of interpretation.\"},\
{\"title\": \"Dialectic\", \"description\": \"Reasoning through contradiction.\"},\
{\"title\": \"Telos\", \"description\": \"The end toward which a thing aims.\"}\
]\n```";

/// A recorded `generate` call.
#[derive(Debug, Clone)]
pub struct GenerateCall {
    pub history: Vec<Turn>,
    pub contents: Vec<Part>,
}

/// Scriptable provider that never leaves the process.
///
/// Scripted replies are consumed in order; once exhausted, requests that
/// carry media get a fenced flashcard array and plain chat gets an echo.
pub struct MockProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    processing_polls: u32,
    fail_processing: bool,
    healthy: bool,
    upload_calls: AtomicU32,
    get_file_calls: AtomicU32,
    generate_calls: AtomicU32,
    uploaded_paths: Mutex<Vec<std::path::PathBuf>>,
    requests: Mutex<Vec<GenerateCall>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            processing_polls: 0,
            fail_processing: false,
            healthy: true,
            upload_calls: AtomicU32::new(0),
            get_file_calls: AtomicU32::new(0),
            generate_calls: AtomicU32::new(0),
            uploaded_paths: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply.
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: ProviderError) -> Self {
        self.push(Err(error));
        self
    }

    /// Report `PROCESSING` for the first `polls` status checks.
    pub fn with_processing_polls(mut self, polls: u32) -> Self {
        self.processing_polls = polls;
        self
    }

    /// End file processing in the `FAILED` state.
    pub fn failing_processing(mut self) -> Self {
        self.fail_processing = true;
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    fn push(&self, reply: Result<String, ProviderError>) {
        self.replies
            .lock()
            .expect("mock replies poisoned")
            .push_back(reply);
    }

    pub fn upload_calls(&self) -> u32 {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn get_file_calls(&self) -> u32 {
        self.get_file_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> u32 {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Local paths handed to `upload_file`, in call order.
    pub fn uploaded_paths(&self) -> Vec<std::path::PathBuf> {
        self.uploaded_paths
            .lock()
            .expect("mock uploads poisoned")
            .clone()
    }

    /// Every `generate` request received, in call order.
    pub fn requests(&self) -> Vec<GenerateCall> {
        self.requests.lock().expect("mock requests poisoned").clone()
    }

    fn state_after_polls(&self, polls: u32) -> FileState {
        if polls < self.processing_polls {
            FileState::Processing
        } else if self.fail_processing {
            FileState::Failed
        } else {
            FileState::Active
        }
    }
}

#[async_trait]
impl GenerativeProvider for MockProvider {
    async fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
        _display_name: &str,
    ) -> Result<MediaReference, ProviderError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);

        // The staged file must exist while the provider reads it
        tokio::fs::metadata(path).await.map_err(|e| {
            ProviderError::InvalidRequest(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.uploaded_paths
            .lock()
            .expect("mock uploads poisoned")
            .push(path.to_path_buf());

        let id = uuid::Uuid::new_v4();
        Ok(MediaReference {
            name: format!("files/{}", id),
            uri: format!("https://mock.invalid/v1beta/files/{}", id),
            mime_type: mime_type.to_string(),
            state: self.state_after_polls(0),
        })
    }

    async fn get_file(&self, name: &str) -> Result<MediaReference, ProviderError> {
        let polls = self.get_file_calls.fetch_add(1, Ordering::SeqCst) + 1;

        Ok(MediaReference {
            name: name.to_string(),
            uri: format!("https://mock.invalid/v1beta/{}", name),
            mime_type: "application/octet-stream".to_string(),
            state: self.state_after_polls(polls),
        })
    }

    async fn generate(&self, history: &[Turn], contents: &[Part]) -> Result<String, ProviderError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("mock requests poisoned")
            .push(GenerateCall {
                history: history.to_vec(),
                contents: contents.to_vec(),
            });

        let scripted = self
            .replies
            .lock()
            .expect("mock replies poisoned")
            .pop_front();
        if let Some(reply) = scripted {
            return reply;
        }

        if contents.iter().any(|p| matches!(p, Part::Media { .. })) {
            return Ok(DEFAULT_FLASHCARDS.to_string());
        }

        let prompt: Vec<&str> = contents
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::Media { .. } => None,
            })
            .collect();
        Ok(format!("Mock response for: {}", prompt.join(" ")))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.healthy {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock provider not enabled".to_string(),
            ))
        }
    }
}
