//! Gemini client against a `wiremock` server.

#![allow(clippy::unwrap_used)]

use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use shelfwise_app::config::GeminiConfig;
use shelfwise_app::gemini::{ContentGenerator, GeminiClient, GeminiError, GenerationRequest};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-test";
const ENDPOINT: &str = "/v1beta/models/gemini-test:generateContent";

fn client(server: &MockServer) -> GeminiClient {
    GeminiClient::new(
        reqwest::Client::new(),
        &GeminiConfig {
            api_key: SecretString::from("test-gemini-key"),
            model: MODEL.to_string(),
            base_url: server.uri(),
        },
    )
}

fn answer(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 8}
    })
}

#[tokio::test]
async fn test_generate_sends_key_and_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "test-gemini-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "Name a mug"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer("The Morning Mug")))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server)
        .generate(&GenerationRequest::text("Name a mug"))
        .await
        .unwrap();
    assert_eq!(text, "The Morning Mug");
}

#[derive(Debug, Deserialize)]
struct Title {
    title: String,
}

#[tokio::test]
async fn test_generate_json_with_schema() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_partial_json(json!({
            "systemInstruction": {"parts": [{"text": "Be brief"}]},
            "generationConfig": {"responseMimeType": "application/json"}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(answer("```json\n{\"title\": \"Morning Mug\"}\n```")),
        )
        .mount(&server)
        .await;

    let request = GenerationRequest::text("Title please")
        .with_system("Be brief")
        .with_schema(json!({"type": "OBJECT", "properties": {"title": {"type": "STRING"}}}));
    let title: Title = client(&server).generate_json(&request).await.unwrap();
    assert_eq!(title.title, "Morning Mug");
}

#[tokio::test]
async fn test_invalid_json_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer("not json at all")))
        .mount(&server)
        .await;

    let result: Result<Title, _> = client(&server)
        .generate_json(&GenerationRequest::text("Title please"))
        .await;
    assert!(matches!(result, Err(GeminiError::Parse(_))));
}

#[tokio::test]
async fn test_429_uses_retry_after_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "12")
                .set_body_json(json!({
                    "error": {"code": 429, "message": "Slow down", "status": "RESOURCE_EXHAUSTED"}
                })),
        )
        .mount(&server)
        .await;

    let result = client(&server)
        .generate(&GenerationRequest::text("hi"))
        .await;
    assert!(matches!(result, Err(GeminiError::RateLimited(12))));
}

#[tokio::test]
async fn test_resource_exhausted_uses_retry_info() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "Quota exceeded",
                "status": "RESOURCE_EXHAUSTED",
                "details": [{
                    "@type": "type.googleapis.com/google.rpc.RetryInfo",
                    "retryDelay": "6.2s"
                }]
            }
        })))
        .mount(&server)
        .await;

    let result = client(&server)
        .generate(&GenerationRequest::text("hi"))
        .await;
    assert!(matches!(result, Err(GeminiError::RateLimited(7))));
}

#[tokio::test]
async fn test_invalid_key_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid.",
                "status": "INVALID_ARGUMENT",
                "details": [{"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "API_KEY_INVALID"}]
            }
        })))
        .mount(&server)
        .await;

    let result = client(&server)
        .generate(&GenerationRequest::text("hi"))
        .await;
    assert!(matches!(result, Err(GeminiError::Unauthorized(_))));
}

#[tokio::test]
async fn test_api_error_keeps_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"code": 500, "message": "Internal error", "status": "INTERNAL"}
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .generate(&GenerationRequest::text("hi"))
        .await
        .unwrap_err();
    match err {
        GeminiError::Api { status, message } => {
            assert_eq!(status, "INTERNAL");
            assert_eq!(message, "Internal error");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_blocked_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&server)
        .await;

    let result = client(&server)
        .generate(&GenerationRequest::text("hi"))
        .await;
    assert!(matches!(result, Err(GeminiError::Blocked(reason)) if reason.contains("SAFETY")));
}
