//! Integration tests for the liveness, readiness and index endpoints.

mod common;

use common::TestApp;
use flashcard_service::services::providers::mock::MockProvider;
use reqwest::StatusCode;

#[tokio::test]
async fn health_check_returns_ok() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "flashcard-service");

    app.cleanup().await;
}

#[tokio::test]
async fn readiness_follows_provider_health() {
    let healthy = TestApp::spawn().await;
    let response = healthy
        .client
        .get(format!("{}/ready", healthy.address))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ready");

    let unhealthy = TestApp::spawn_with(MockProvider::new().unhealthy()).await;
    let response = unhealthy
        .client
        .get(format!("{}/ready", unhealthy.address))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body, serde_json::json!({ "error": "Service unavailable" }));

    healthy.cleanup().await;
    unhealthy.cleanup().await;
}

#[tokio::test]
async fn index_renders_html_page() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(&app.address)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));

    let body = response.text().await.unwrap();
    assert!(body.contains("<form id=\"upload-form\">"));
    assert!(body.contains("/chat"));

    app.cleanup().await;
}
