use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::config::AiSettings;
use crate::error::{AppError, AppResult};
use crate::services::prompt::SYSTEM_PROMPT;

const TEMPERATURE: f64 = 0.4;
const MAX_OUTPUT_TOKENS: u32 = 1024;

/// HTTP statuses that indicate overload or rate limiting.
pub const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Error codes some providers put in the body when they are overloaded.
const OVERLOAD_MARKERS: [&str; 3] = ["UNAVAILABLE", "RESOURCE_EXHAUSTED", "overloaded_error"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    Gemini,
    OpenAi,
    Anthropic,
}

impl AiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com",
        }
    }

    pub fn default_models(&self) -> &'static [&'static str] {
        match self {
            Self::Gemini => &[
                "gemini-2.5-flash",
                "gemini-2.5-flash-lite",
                "gemini-2.0-flash",
            ],
            Self::OpenAi => &["gpt-4.1-nano", "gpt-4o-mini"],
            Self::Anthropic => &["claude-3-5-haiku-latest", "claude-3-haiku-20240307"],
        }
    }

    /// Provider-specific variable consulted when no explicit key is set.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl FromStr for AiProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" | "openai_compatible" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Overload, rate limiting or a transport failure; another model may work.
    Transient,
    /// Bad request, auth, unknown model, unusable response.
    Permanent,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => f.write_str("transient"),
            Self::Permanent => f.write_str("permanent"),
        }
    }
}

/// A failed call to the text-generation provider.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    /// HTTP status, when the provider answered at all.
    pub status: Option<u16>,
    /// Provider error code from the response body, e.g. `UNAVAILABLE`.
    pub provider_status: Option<String>,
    pub message: String,
    transport: bool,
}

impl ProviderError {
    /// Build from a non-success HTTP response and its body.
    pub fn http(status: u16, body: &str) -> Self {
        let (provider_status, detail) = parse_error_body(body);
        let detail = detail.unwrap_or_else(|| truncate(body, 200));
        Self {
            status: Some(status),
            provider_status,
            message: format!("provider returned {}: {}", status, detail),
            transport: false,
        }
    }

    /// The request never produced a response (connect failure, timeout).
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            provider_status: None,
            message: message.into(),
            transport: true,
        }
    }

    /// The provider answered successfully but the payload was unusable.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            status: None,
            provider_status: None,
            message: message.into(),
            transport: false,
        }
    }

    pub fn kind(&self) -> FailureKind {
        if self.transport {
            return FailureKind::Transient;
        }
        if self.status.is_some_and(|s| TRANSIENT_STATUSES.contains(&s)) {
            return FailureKind::Transient;
        }
        if self
            .provider_status
            .as_deref()
            .is_some_and(|p| OVERLOAD_MARKERS.contains(&p))
        {
            return FailureKind::Transient;
        }
        FailureKind::Permanent
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::invalid_response(format!("failed to parse provider response: {}", e))
        } else {
            ProviderError::transport(format!("provider request failed: {}", e))
        }
    }
}

/// Extract `(code, message)` from the JSON error envelopes used by
/// Gemini (`error.status`), OpenAI (`error.code`) and Anthropic (`error.type`).
fn parse_error_body(body: &str) -> (Option<String>, Option<String>) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return (None, None);
    };
    let error = &value["error"];
    let code = ["status", "type", "code"]
        .iter()
        .find_map(|k| error[*k].as_str())
        .map(String::from);
    let message = error["message"].as_str().map(String::from);
    (code, message)
}

fn truncate(s: &str, max_chars: usize) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() <= max_chars {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

/// One text-generation call against a named model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError>;
}

/// HTTP client for the configured provider.
#[derive(Clone)]
pub struct AiClient {
    provider: AiProvider,
    base_url: String,
    api_key: String,
    client: Client,
}

impl AiClient {
    pub fn new(settings: &AiSettings) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(settings.call_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            provider: settings.provider,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            client,
        })
    }

    pub fn provider(&self) -> AiProvider {
        self.provider
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ProviderError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::http(status.as_u16(), &body));
        }
        Ok(response.json::<T>().await?)
    }

    async fn generate_with_gemini(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }

        #[derive(Serialize)]
        struct Content<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            role: Option<&'a str>,
            parts: Vec<Part<'a>>,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenerationConfig {
            temperature: f64,
            max_output_tokens: u32,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GeminiRequest<'a> {
            system_instruction: Content<'a>,
            contents: Vec<Content<'a>>,
            generation_config: GenerationConfig,
        }

        let request = GeminiRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_PROMPT,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        debug!(model, "Sending insight request to Gemini");

        let response: GeminiResponse = self
            .send_json(
                self.client
                    .post(&url)
                    .header("x-goog-api-key", &self.api_key)
                    .json(&request),
            )
            .await?;

        Ok(response.text())
    }

    async fn generate_with_openai(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        #[derive(Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct OpenAiRequest<'a> {
            model: &'a str,
            messages: Vec<Message<'a>>,
            temperature: f64,
        }

        #[derive(Deserialize)]
        struct OpenAiResponse {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: Option<String>,
        }

        let request = OpenAiRequest {
            model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
        };

        debug!(model, "Sending insight request to OpenAI-compatible API");

        let response: OpenAiResponse = self
            .send_json(
                self.client
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .json(&request),
            )
            .await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn generate_with_anthropic(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);

        #[derive(Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct AnthropicRequest<'a> {
            model: &'a str,
            max_tokens: u32,
            system: &'a str,
            temperature: f64,
            messages: Vec<Message<'a>>,
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            text: Option<String>,
        }

        let request = AnthropicRequest {
            model,
            max_tokens: MAX_OUTPUT_TOKENS,
            system: SYSTEM_PROMPT,
            temperature: TEMPERATURE,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model, "Sending insight request to Anthropic");

        let response: AnthropicResponse = self
            .send_json(
                self.client
                    .post(&url)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", "2023-06-01")
                    .json(&request),
            )
            .await?;

        Ok(response
            .content
            .into_iter()
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[async_trait]
impl TextGenerator for AiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::invalid_response(format!(
                "no API key configured for {}",
                self.provider.as_str()
            )));
        }

        let text = match self.provider {
            AiProvider::Gemini => self.generate_with_gemini(model, prompt).await?,
            AiProvider::OpenAi => self.generate_with_openai(model, prompt).await?,
            AiProvider::Anthropic => self.generate_with_anthropic(model, prompt).await?,
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::invalid_response(format!(
                "model {} returned no text",
                model
            )));
        }
        Ok(text.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

impl GeminiResponse {
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}
