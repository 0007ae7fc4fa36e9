//! Gemini AI provider implementation.
//!
//! Uses the Gemini REST API (`v1beta`): the resumable Files API for media
//! uploads, `files.get` for processing status and `generateContent` for
//! conversations.

use super::{GenerativeProvider, ProviderError};
use crate::models::{FileState, MediaReference, Part, Role, Turn};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Gemini API version path segment.
const API_VERSION: &str = "v1beta";

/// Header carrying the session URL of a resumable upload.
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Header carrying the API key. Keeps the key out of request URLs.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Persona given to the model for every request.
pub const SYSTEM_INSTRUCTION: &str = "You are an Elite Intellectual Researcher. You analyze text, \
scanned documents, audio, and video with academic precision. Before answering, you must: \
1. Analyze the philosophical/scientific school of thought. \
2. Determine the specific context (Historical, Technical, or Literary). \
3. Synthesize answers with high cultural depth. \
Always return JSON for flashcard requests. Maintain an elite tone.";

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: SecretString,
    pub model: String,
    pub api_base: String,
    pub request_timeout: Duration,
    pub system_instruction: String,
}

/// Gemini provider.
pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn base(&self) -> &str {
        self.config.api_base.trim_end_matches('/')
    }

    /// Build the API URL for the given model method.
    fn model_url(&self, method: &str) -> String {
        format!(
            "{}/{}/models/{}:{}",
            self.base(),
            API_VERSION,
            self.config.model,
            method
        )
    }

    /// URL of a file resource, `name` being `files/<id>`.
    fn file_url(&self, name: &str) -> String {
        format!("{}/{}/{}", self.base(), API_VERSION, name)
    }

    fn upload_start_url(&self) -> String {
        format!("{}/upload/{}/files", self.base(), API_VERSION)
    }

    fn models_url(&self) -> String {
        format!("{}/{}/models", self.base(), API_VERSION)
    }

    /// Attach the API key to an outgoing request.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, self.config.api_key.expose_secret())
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.config.api_key.expose_secret().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Gemini API key not configured".to_string(),
            ));
        }
        Ok(())
    }

    fn build_request(&self, history: &[Turn], contents: &[Part]) -> GenerateContentRequest {
        let mut request_contents: Vec<Content> = history.iter().map(Content::from).collect();
        request_contents.push(Content {
            role: Some(Role::User.as_str().to_string()),
            parts: contents.iter().map(RequestPart::from).collect(),
        });

        GenerateContentRequest {
            system_instruction: if self.config.system_instruction.is_empty() {
                None
            } else {
                Some(Content {
                    role: None,
                    parts: vec![RequestPart::Text {
                        text: self.config.system_instruction.clone(),
                    }],
                })
            },
            contents: request_contents,
        }
    }
}

/// Map a non-success HTTP status onto the provider error taxonomy.
async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    let message = format!("Gemini API error {}: {}", status, error_text);

    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
        StatusCode::BAD_REQUEST => ProviderError::InvalidRequest(message),
        s if s.is_server_error() => ProviderError::ServerError(message),
        _ => ProviderError::ApiError(message),
    })
}

/// Transport failures are reported without the request URL.
fn network_error(e: reqwest::Error) -> ProviderError {
    ProviderError::NetworkError(e.without_url().to_string())
}

#[async_trait]
impl GenerativeProvider for GeminiProvider {
    async fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<MediaReference, ProviderError> {
        self.ensure_configured()?;

        let data = tokio::fs::read(path).await.map_err(|e| {
            ProviderError::InvalidRequest(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let content_length = data.len().to_string();

        tracing::debug!(
            path = %path.display(),
            mime_type = %mime_type,
            size = data.len(),
            "Starting Gemini file upload"
        );

        let start = self
            .authorized(self.client.post(self.upload_start_url()))
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", &content_length)
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&StartUploadRequest {
                file: StartUploadFile { display_name },
            })
            .send()
            .await
            .map_err(network_error)?;
        let start = check_status(start).await?;

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::MalformedResponse("Upload session URL missing".to_string())
            })?;

        let response = self
            .authorized(self.client.post(&upload_url))
            .header(header::CONTENT_LENGTH, &content_length)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(data)
            .send()
            .await
            .map_err(network_error)?;
        let response = check_status(response).await?;

        let uploaded: UploadFileResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to parse upload response: {}", e))
        })?;

        tracing::info!(
            name = %uploaded.file.name,
            state = ?uploaded.file.state,
            "Uploaded file to Gemini"
        );

        Ok(uploaded.file.into())
    }

    async fn get_file(&self, name: &str) -> Result<MediaReference, ProviderError> {
        self.ensure_configured()?;

        let response = self
            .authorized(self.client.get(self.file_url(name)))
            .send()
            .await
            .map_err(network_error)?;
        let response = check_status(response).await?;

        let file: GeminiFile = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to parse file status: {}", e))
        })?;

        Ok(file.into())
    }

    async fn generate(&self, history: &[Turn], contents: &[Part]) -> Result<String, ProviderError> {
        self.ensure_configured()?;

        let request = self.build_request(history, contents);

        tracing::debug!(
            model = %self.config.model,
            history_len = history.len(),
            part_count = contents.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .authorized(self.client.post(self.model_url("generateContent")))
            .json(&request)
            .send()
            .await
            .map_err(network_error)?;
        let response = check_status(response).await?;

        let api_response: GenerateContentResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to parse response: {}", e))
        })?;

        if let Some(usage) = &api_response.usage_metadata {
            tracing::debug!(
                input_tokens = usage.prompt_token_count.unwrap_or(0),
                output_tokens = usage.candidates_token_count.unwrap_or(0),
                "Gemini usage"
            );
        }

        api_response.into_text()
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        self.ensure_configured()?;

        // Listing models verifies the key without spending tokens
        let response = self
            .authorized(self.client.get(self.models_url()))
            .send()
            .await
            .map_err(network_error)?;
        check_status(response).await.map(|_| ())
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct StartUploadRequest<'a> {
    file: StartUploadFile<'a>,
}

#[derive(Debug, Serialize)]
struct StartUploadFile<'a> {
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadFileResponse {
    file: GeminiFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFile {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    state: FileState,
}

impl From<GeminiFile> for MediaReference {
    fn from(file: GeminiFile) -> Self {
        MediaReference {
            name: file.name,
            uri: file.uri,
            mime_type: file.mime_type,
            state: file.state,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<RequestPart>,
}

impl From<&Turn> for Content {
    fn from(turn: &Turn) -> Self {
        Content {
            role: Some(turn.role.as_str().to_string()),
            parts: turn.parts.iter().map(RequestPart::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

impl From<&Part> for RequestPart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text { text } => RequestPart::Text { text: text.clone() },
            Part::Media { media } => RequestPart::FileData {
                file_data: FileData {
                    mime_type: media.mime_type.clone(),
                    file_uri: media.uri.clone(),
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate.
    fn into_text(self) -> Result<String, ProviderError> {
        let blocked = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_ref())
            .is_some();

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(if blocked {
                ProviderError::ContentFiltered
            } else {
                ProviderError::MalformedResponse("Response contained no candidates".to_string())
            });
        };

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(ProviderError::ContentFiltered);
        }

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|p| !p.thought)
            .filter_map(|p| p.text)
            .collect();

        if text.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "Response contained no text".to_string(),
            ));
        }

        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use serde_json::json;
    use service_core::error::AppError;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(GeminiConfig {
            api_key: SecretString::new("test-key".to_string()),
            model: "gemini-2.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/".to_string(),
            request_timeout: Duration::from_secs(5),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        })
        .unwrap()
    }

    fn media() -> MediaReference {
        MediaReference {
            name: "files/abc".to_string(),
            uri: "https://generativelanguage.googleapis.com/v1beta/files/abc".to_string(),
            mime_type: "application/pdf".to_string(),
            state: FileState::Active,
        }
    }

    #[test]
    fn builds_versioned_urls() {
        let provider = provider();
        assert_eq!(
            provider.model_url("generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            provider.file_url("files/abc"),
            "https://generativelanguage.googleapis.com/v1beta/files/abc"
        );
        assert_eq!(
            provider.upload_start_url(),
            "https://generativelanguage.googleapis.com/upload/v1beta/files"
        );
        assert_eq!(
            provider.models_url(),
            "https://generativelanguage.googleapis.com/v1beta/models"
        );
    }

    #[test]
    fn api_key_travels_in_header() {
        let provider = provider();
        let request = provider
            .authorized(provider.client.get(provider.models_url()))
            .build()
            .unwrap();

        assert_eq!(request.headers()[API_KEY_HEADER], "test-key");
        assert!(!request.url().as_str().contains("test-key"));
    }

    #[tokio::test]
    async fn network_failure_does_not_expose_api_key() {
        let provider = GeminiProvider::new(GeminiConfig {
            api_key: SecretString::new("SUPER-SECRET-KEY".to_string()),
            model: "gemini-2.5-flash".to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_secs(1),
            system_instruction: String::new(),
        })
        .unwrap();

        let error = provider
            .generate(&[], &[Part::text("hi")])
            .await
            .unwrap_err();
        assert!(matches!(error, ProviderError::NetworkError(_)));
        assert!(!error.to_string().contains("SUPER-SECRET-KEY"));

        let response = AppError::from(error).into_response();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(!body.contains("SUPER-SECRET-KEY"));
        assert!(!body.contains("127.0.0.1:9/v1beta"));
    }

    #[test]
    fn request_carries_history_then_new_turn() {
        let history = vec![
            Turn::user(vec![Part::text("Context: essay.pdf"), Part::media(media())]),
            Turn::model_text("I have assimilated the media."),
        ];
        let request = provider().build_request(&history, &[Part::text("Who wrote it?")]);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["systemInstruction"]["parts"][0]["text"], SYSTEM_INSTRUCTION);
        assert!(value["systemInstruction"].get("role").is_none());

        let contents = value["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "Context: essay.pdf");
        assert_eq!(
            contents[0]["parts"][1]["fileData"],
            json!({
                "mimeType": "application/pdf",
                "fileUri": "https://generativelanguage.googleapis.com/v1beta/files/abc"
            })
        );
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "Who wrote it?");
    }

    #[test]
    fn response_text_joins_parts_and_skips_thoughts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "thinking...", "thought": true },
                        { "text": "Hello, " },
                        { "text": "scholar." }
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 10, "candidatesTokenCount": 3 }
        }))
        .unwrap();

        assert_eq!(response.into_text().unwrap(), "Hello, scholar.");
    }

    #[test]
    fn safety_stops_are_content_filtered() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        assert!(matches!(response.into_text(), Err(ProviderError::ContentFiltered)));

        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "OTHER" }
        }))
        .unwrap();
        assert!(matches!(blocked.into_text(), Err(ProviderError::ContentFiltered)));
    }

    #[test]
    fn file_status_parses_processing_state() {
        let file: GeminiFile = serde_json::from_value(json!({
            "name": "files/abc",
            "uri": "https://example.test/files/abc",
            "mimeType": "video/mp4",
            "state": "PROCESSING"
        }))
        .unwrap();
        let reference = MediaReference::from(file);
        assert!(reference.is_processing());
        assert_eq!(reference.mime_type, "video/mp4");
    }

    #[tokio::test]
    async fn missing_api_key_fails_on_first_call() {
        let provider = GeminiProvider::new(GeminiConfig {
            api_key: SecretString::new(String::new()),
            model: "gemini-2.5-flash".to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_secs(1),
            system_instruction: String::new(),
        })
        .unwrap();

        let result = provider.generate(&[], &[Part::text("hi")]).await;
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }
}
