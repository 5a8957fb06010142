//! Shared test utilities for integration tests.
//!
//! `TestClient` drives the full router against an in-memory database with a
//! scripted text generator standing in for the AI provider. Methods are
//! intentionally broad to support the different test files.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use spendlens::config::{AiSettings, Config};
use spendlens::db::{create_in_memory_pool, migrations};
use spendlens::server;
use spendlens::services::ai_client::{AiProvider, ProviderError, TextGenerator};
use spendlens::state::AppState;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const MODELS: [&str; 3] = ["model-flash", "model-flash-lite", "model-pro"];

pub const PASSWORD: &str = "hunter2hunter2";

/// What the scripted generator answers for a given model.
#[derive(Debug, Clone)]
pub enum Outcome {
    Text(String),
    Status(u16),
    Transport,
}

/// A [`TextGenerator`] that answers from a per-model script and records
/// every call it receives.
#[derive(Default)]
pub struct ScriptedGenerator {
    script: HashMap<String, Outcome>,
    calls: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(mut self, model: &str, text: &str) -> Self {
        self.script
            .insert(model.to_string(), Outcome::Text(text.to_string()));
        self
    }

    pub fn fail(mut self, model: &str, status: u16) -> Self {
        self.script.insert(model.to_string(), Outcome::Status(status));
        self
    }

    pub fn unreachable(mut self, model: &str) -> Self {
        self.script.insert(model.to_string(), Outcome::Transport);
        self
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(model.to_string());
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.script.get(model) {
            Some(Outcome::Text(text)) => Ok(text.clone()),
            Some(Outcome::Status(status)) => Err(ProviderError::http(
                *status,
                &format!(
                    r#"{{"error":{{"code":{status},"message":"{model} failed with {status}"}}}}"#
                ),
            )),
            Some(Outcome::Transport) => Err(ProviderError::transport(format!(
                "connection to {model} refused"
            ))),
            None => Err(ProviderError::http(
                404,
                r#"{"error":{"message":"model not found","status":"NOT_FOUND"}}"#,
            )),
        }
    }
}

pub fn test_config() -> Config {
    let mut ai = AiSettings::for_provider(AiProvider::Gemini);
    ai.api_key = "test-key".into();
    ai.models = MODELS.iter().map(|m| m.to_string()).collect();

    Config {
        host: "127.0.0.1".into(),
        port: 0,
        database_path: PathBuf::from(":memory:"),
        migrations_path: PathBuf::from("migrations"),
        jwt_secret: "test-secret-please-ignore".into(),
        token_ttl: Duration::from_secs(3600),
        currency: "INR".into(),
        ai,
        insight_ttl: Duration::from_secs(3600),
        insight_cache_max: Some(100),
    }
}

/// A test client that issues sequential requests against one application.
pub struct TestClient {
    state: AppState,
    pub generator: Arc<ScriptedGenerator>,
}

impl TestClient {
    /// Fresh database; the first model always succeeds.
    pub fn new() -> Self {
        Self::with_generator(ScriptedGenerator::new().succeed(MODELS[0], "• Spend less on travel"))
    }

    pub fn with_generator(generator: ScriptedGenerator) -> Self {
        Self::build(generator, |_| {})
    }

    /// Build with a scripted generator and a chance to adjust the config.
    pub fn build(generator: ScriptedGenerator, tweak: impl FnOnce(&mut Config)) -> Self {
        let pool = create_in_memory_pool().expect("Failed to create in-memory pool");
        {
            let conn = pool.get().expect("Failed to get connection");
            migrations::run_migrations(&conn, Path::new("migrations"))
                .expect("Failed to run migrations");
        }

        let mut config = test_config();
        tweak(&mut config);

        let generator = Arc::new(generator);
        let state = AppState::new(pool, config, generator.clone());

        Self { state, generator }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        server::router(self.state.clone())
    }

    /// Send a request and return status and body.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    /// Like [`request`](Self::request) but parses the body as JSON.
    pub async fn request_json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, body) = self.request(method, uri, token, body).await;
        let parsed = serde_json::from_str(&body).unwrap_or(Value::String(body));
        (status, parsed)
    }

    pub async fn get_json(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request_json("GET", uri, Some(token), None).await
    }

    // =========================================================================
    // Helpers for creating entities through the API
    // =========================================================================

    /// Register a user and return the new user id.
    pub async fn register(&self, name: &str, email: &str) -> i64 {
        let (status, body) = self
            .request_json(
                "POST",
                "/api/auth/register",
                None,
                Some(serde_json::json!({ "name": name, "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["user_id"].as_i64().unwrap()
    }

    /// Log in and return the bearer token.
    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .request_json(
                "POST",
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Register and log in; returns `(user_id, token)`.
    pub async fn signup(&self, email: &str) -> (i64, String) {
        let id = self.register("Test User", email).await;
        let token = self.login(email).await;
        (id, token)
    }

    /// Create an expense and return the stored record.
    pub async fn add_expense(&self, token: &str, amount: &str, category: &str, date: &str) -> Value {
        let (status, body) = self
            .request_json(
                "POST",
                "/api/expenses",
                Some(token),
                Some(serde_json::json!({
                    "title": format!("{category} on {date}"),
                    "amount": amount,
                    "category": category,
                    "date": date,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create expense failed: {body}");
        body
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}
