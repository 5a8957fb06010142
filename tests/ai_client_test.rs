//! Tests for the HTTP provider client against a local fake provider.

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use spendlens::cache::InsightCache;
use spendlens::config::AiSettings;
use spendlens::error::AppError;
use spendlens::server::serve;
use spendlens::services::ai_client::{AiClient, AiProvider, FailureKind, TextGenerator};
use spendlens::services::insights::InsightService;
use spendlens::services::prompt::SYSTEM_PROMPT;
use std::sync::Arc;
use std::time::Duration;

const API_KEY: &str = "test-key";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn error_response(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

async fn gemini(Path(call): Path<String>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if header(&headers, "x-goog-api-key") != Some(API_KEY) {
        return error_response(
            StatusCode::BAD_REQUEST,
            json!({"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}),
        );
    }

    let model = call.trim_end_matches(":generateContent");
    match model {
        "busy" => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            json!({"error": {"code": 503, "message": "The model is overloaded", "status": "UNAVAILABLE"}}),
        ),
        "quota" => error_response(
            StatusCode::FORBIDDEN,
            json!({"error": {"code": 403, "message": "Quota exhausted", "status": "RESOURCE_EXHAUSTED"}}),
        ),
        "broken" => error_response(
            StatusCode::NOT_FOUND,
            json!({"error": {"code": 404, "message": "models/broken is not found", "status": "NOT_FOUND"}}),
        ),
        "silent" => Json(json!({ "candidates": [] })).into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "candidates": [] })).into_response()
        }
        _ => {
            let system = body["systemInstruction"]["parts"][0]["text"]
                .as_str()
                .unwrap_or_default();
            let prompt = body["contents"][0]["parts"][0]["text"]
                .as_str()
                .unwrap_or_default();
            let text = format!("{model} | {system} | {prompt}");
            Json(json!({
                "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }]
            }))
            .into_response()
        }
    }
}

async fn openai(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let expected = format!("Bearer {API_KEY}");
    if header(&headers, "authorization") != Some(expected.as_str()) {
        return error_response(
            StatusCode::UNAUTHORIZED,
            json!({"error": {"message": "Incorrect API key provided", "code": "invalid_api_key"}}),
        );
    }

    let model = body["model"].as_str().unwrap_or_default();
    if model == "rate-limited" {
        return error_response(
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": {"message": "Rate limit reached", "code": "rate_limit_exceeded"}}),
        );
    }

    let user = body["messages"][1]["content"].as_str().unwrap_or_default();
    Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": format!("{model}: {user}") } }]
    }))
    .into_response()
}

async fn anthropic(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if header(&headers, "x-api-key") != Some(API_KEY)
        || header(&headers, "anthropic-version").is_none()
    {
        return error_response(
            StatusCode::UNAUTHORIZED,
            json!({"type": "error", "error": {"type": "authentication_error", "message": "invalid x-api-key"}}),
        );
    }

    let model = body["model"].as_str().unwrap_or_default();
    if model == "crowded" {
        return error_response(
            StatusCode::from_u16(529).unwrap(),
            json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}),
        );
    }

    Json(json!({
        "content": [
            { "type": "text", "text": format!("{model} says ") },
            { "type": "text", "text": body["system"].as_str().unwrap_or_default() }
        ]
    }))
    .into_response()
}

/// Start the fake provider and return its base address.
async fn fake_provider() -> String {
    let app = Router::new()
        .route("/v1beta/models/:call", post(gemini))
        .route("/v1/chat/completions", post(openai))
        .route("/v1/messages", post(anthropic));

    let (port, _handle) = serve(app, "127.0.0.1", 0).await.unwrap();
    format!("http://127.0.0.1:{port}")
}

fn settings(provider: AiProvider, base_url: String) -> AiSettings {
    let mut settings = AiSettings::for_provider(provider);
    settings.base_url = base_url;
    settings.api_key = API_KEY.into();
    settings
}

async fn client_for(provider: AiProvider) -> AiClient {
    let base = fake_provider().await;
    let base = match provider {
        AiProvider::OpenAi => format!("{base}/v1"),
        _ => base,
    };
    AiClient::new(&settings(provider, base)).unwrap()
}

// =============================================================================
// Gemini
// =============================================================================

#[tokio::test]
async fn test_gemini_success() {
    let client = client_for(AiProvider::Gemini).await;

    let text = client.generate("flash", "How am I doing?").await.unwrap();

    assert_eq!(text, format!("flash | {SYSTEM_PROMPT} | How am I doing?"));
}

#[tokio::test]
async fn test_gemini_overload_is_transient() {
    let client = client_for(AiProvider::Gemini).await;

    let err = client.generate("busy", "p").await.unwrap_err();

    assert_eq!(err.status, Some(503));
    assert_eq!(err.provider_status.as_deref(), Some("UNAVAILABLE"));
    assert_eq!(err.kind(), FailureKind::Transient);
    assert_eq!(err.message, "provider returned 503: The model is overloaded");
}

#[tokio::test]
async fn test_resource_exhausted_marker_is_transient() {
    let client = client_for(AiProvider::Gemini).await;

    let err = client.generate("quota", "p").await.unwrap_err();

    assert_eq!(err.status, Some(403));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unknown_model_is_permanent() {
    let client = client_for(AiProvider::Gemini).await;

    let err = client.generate("broken", "p").await.unwrap_err();

    assert_eq!(err.status, Some(404));
    assert_eq!(err.kind(), FailureKind::Permanent);
}

#[tokio::test]
async fn test_empty_response_is_permanent() {
    let client = client_for(AiProvider::Gemini).await;

    let err = client.generate("silent", "p").await.unwrap_err();

    assert_eq!(err.status, None);
    assert_eq!(err.kind(), FailureKind::Permanent);
    assert!(err.message.contains("returned no text"));
}

#[tokio::test]
async fn test_wrong_key_is_permanent() {
    let base = fake_provider().await;
    let mut settings = settings(AiProvider::Gemini, base);
    settings.api_key = "nope".into();
    let client = AiClient::new(&settings).unwrap();

    let err = client.generate("flash", "p").await.unwrap_err();

    assert_eq!(err.status, Some(400));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_missing_key_fails_without_request() {
    let mut settings = AiSettings::for_provider(AiProvider::Gemini);
    settings.base_url = "http://127.0.0.1:9".into();
    let client = AiClient::new(&settings).unwrap();

    let err = client.generate("flash", "p").await.unwrap_err();

    assert!(err.message.contains("no API key"));
    assert_eq!(err.kind(), FailureKind::Permanent);
}

#[tokio::test]
async fn test_call_timeout_is_transient() {
    let base = fake_provider().await;
    let mut settings = settings(AiProvider::Gemini, base);
    settings.call_timeout = Duration::from_millis(200);
    let client = AiClient::new(&settings).unwrap();

    let err = client.generate("slow", "p").await.unwrap_err();

    assert_eq!(err.status, None);
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_connection_refused_is_transient() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client =
        AiClient::new(&settings(AiProvider::Gemini, format!("http://127.0.0.1:{port}"))).unwrap();

    let err = client.generate("flash", "p").await.unwrap_err();

    assert!(err.is_transient(), "{err}");
}

// =============================================================================
// OpenAI-compatible and Anthropic
// =============================================================================

#[tokio::test]
async fn test_openai_success() {
    let client = client_for(AiProvider::OpenAi).await;

    let text = client.generate("gpt-test", "Summarize").await.unwrap();

    assert_eq!(text, "gpt-test: Summarize");
}

#[tokio::test]
async fn test_openai_rate_limit_is_transient() {
    let client = client_for(AiProvider::OpenAi).await;

    let err = client.generate("rate-limited", "p").await.unwrap_err();

    assert_eq!(err.status, Some(429));
    assert_eq!(err.provider_status.as_deref(), Some("rate_limit_exceeded"));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_anthropic_joins_text_blocks() {
    let client = client_for(AiProvider::Anthropic).await;

    let text = client.generate("haiku", "p").await.unwrap();

    assert_eq!(text, format!("haiku says {SYSTEM_PROMPT}"));
}

#[tokio::test]
async fn test_anthropic_overloaded_is_transient() {
    let client = client_for(AiProvider::Anthropic).await;

    let err = client.generate("crowded", "p").await.unwrap_err();

    assert_eq!(err.status, Some(529));
    assert_eq!(err.kind(), FailureKind::Transient);
}

// =============================================================================
// Fallback over real HTTP
// =============================================================================

#[tokio::test]
async fn test_service_falls_back_across_real_responses() {
    let base = fake_provider().await;
    let mut settings = settings(AiProvider::Gemini, base);
    settings.models = vec!["busy".into(), "broken".into(), "flash".into()];
    let client = AiClient::new(&settings).unwrap();

    let service = InsightService::new(
        Arc::new(client),
        InsightCache::new(Duration::from_secs(60), None),
        &settings,
        "USD",
    );

    let generated = service.generate("prompt").await.unwrap();
    assert_eq!(generated.model, "flash");
    assert!(generated.text.ends_with("| prompt"));
}

#[tokio::test]
async fn test_service_reports_last_failure() {
    let base = fake_provider().await;
    let mut settings = settings(AiProvider::Gemini, base);
    settings.models = vec!["busy".into(), "broken".into()];
    let client = AiClient::new(&settings).unwrap();

    let service = InsightService::new(
        Arc::new(client),
        InsightCache::new(Duration::from_secs(60), None),
        &settings,
        "USD",
    );

    match service.generate("prompt").await {
        Err(AppError::AllModelsUnavailable { last_error }) => {
            assert_eq!(
                last_error,
                "permanent: provider returned 404: models/broken is not found"
            );
        }
        other => panic!("expected AllModelsUnavailable, got {other:?}"),
    }
}
