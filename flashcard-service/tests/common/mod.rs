#![allow(dead_code)]

use flashcard_service::config::{
    FlashcardConfig, GatewayConfig, GeminiSettings, MediaConfig, SessionConfig,
};
use flashcard_service::services::providers::mock::MockProvider;
use flashcard_service::services::SessionStore;
use flashcard_service::startup::Application;
use reqwest::multipart;
use secrecy::SecretString;
use service_core::config::Config as CoreConfig;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub sessions: SessionStore,
    pub provider: Arc<MockProvider>,
    pub media_dir: PathBuf,
    pub client: reqwest::Client,
}

pub fn test_config(media_dir: PathBuf) -> FlashcardConfig {
    FlashcardConfig {
        common: CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port for testing
            log_level: "debug".to_string(),
        },
        gemini: GeminiSettings {
            api_key: SecretString::new("test-api-key".to_string()),
            model: "gemini-2.5-flash".to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 5,
        },
        media: MediaConfig {
            temp_dir: media_dir,
            max_upload_bytes: 10 * 1024 * 1024,
        },
        gateway: GatewayConfig {
            max_attempts: 5,
            initial_backoff_ms: 10,
            poll_interval_ms: 10,
            poll_max_attempts: 5,
        },
        session: SessionConfig::default(),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(MockProvider::new()).await
    }

    pub async fn spawn_with(provider: MockProvider) -> Self {
        let media_dir = PathBuf::from(format!("target/test-media-{}", Uuid::new_v4()));
        let provider = Arc::new(provider);

        let app = Application::build_with_provider(test_config(media_dir.clone()), provider.clone())
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let sessions = app.sessions();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            sessions,
            provider,
            media_dir,
            client,
        }
    }

    pub async fn upload(&self, filename: &str, session: Option<&str>) -> reqwest::Response {
        let form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(b"Plato, Republic, Book VII".to_vec())
                .file_name(filename.to_string())
                .mime_str("text/plain")
                .unwrap(),
        );

        let mut request = self
            .client
            .post(format!("{}/upload", self.address))
            .multipart(form);
        if let Some(session) = session {
            request = request.header("X-Session-ID", session);
        }

        request.send().await.expect("Failed to execute request.")
    }

    pub async fn chat(&self, query: &str, session: Option<&str>) -> reqwest::Response {
        let mut request = self
            .client
            .post(format!("{}/chat", self.address))
            .form(&[("query", query)]);
        if let Some(session) = session {
            request = request.header("X-Session-ID", session);
        }

        request.send().await.expect("Failed to execute request.")
    }

    /// Number of files left behind in the media staging directory.
    pub async fn staged_file_count(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.media_dir).await {
            Ok(entries) => entries,
            Err(_) => return 0,
        };
        let mut count = 0;
        while let Ok(Some(_)) = entries.next_entry().await {
            count += 1;
        }
        count
    }

    pub async fn cleanup(&self) {
        let _ = tokio::fs::remove_dir_all(&self.media_dir).await;
    }
}
