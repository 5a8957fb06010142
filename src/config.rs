use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::ai_client::AiProvider;
use crate::services::prompt::PromptStyle;

/// Settings for the external text-generation provider.
#[derive(Debug, Clone)]
pub struct AiSettings {
    pub provider: AiProvider,
    pub base_url: String,
    pub api_key: String,
    /// Candidate models in priority order.
    pub models: Vec<String>,
    pub call_timeout: Duration,
    pub request_deadline: Duration,
    pub prompt_style: PromptStyle,
}

impl AiSettings {
    pub fn for_provider(provider: AiProvider) -> Self {
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            api_key: String::new(),
            models: provider
                .default_models()
                .iter()
                .map(|m| m.to_string())
                .collect(),
            call_timeout: Duration::from_secs(30),
            request_deadline: Duration::from_secs(90),
            prompt_style: PromptStyle::Summary,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub migrations_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub currency: String,
    pub ai: AiSettings,
    pub insight_ttl: Duration,
    /// `None` means the insight cache is unbounded.
    pub insight_cache_max: Option<usize>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let jwt_secret = match env::var("SPENDLENS_JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            Ok(_) => panic!("SPENDLENS_JWT_SECRET is empty. Set it to a long random string."),
            Err(_) => panic!(
                "SPENDLENS_JWT_SECRET environment variable is not set. Set it to a long \
                 random string used to sign login tokens."
            ),
        };

        let provider = match env::var("SPENDLENS_AI_PROVIDER") {
            Ok(p) => p.parse().unwrap_or_else(|_| {
                panic!("Invalid SPENDLENS_AI_PROVIDER '{p}': expected gemini, openai or anthropic")
            }),
            Err(_) => AiProvider::Gemini,
        };

        let mut ai = AiSettings::for_provider(provider);
        if let Ok(url) = env::var("SPENDLENS_AI_BASE_URL") {
            ai.base_url = url;
        }
        ai.api_key = env::var("SPENDLENS_AI_API_KEY")
            .or_else(|_| env::var(provider.api_key_env()))
            .unwrap_or_default();
        if let Ok(models) = env::var("SPENDLENS_AI_MODELS") {
            let models = parse_list(&models);
            if !models.is_empty() {
                ai.models = models;
            }
        }
        ai.call_timeout = env_secs("SPENDLENS_AI_TIMEOUT_SECS").unwrap_or(ai.call_timeout);
        ai.request_deadline =
            env_secs("SPENDLENS_AI_DEADLINE_SECS").unwrap_or(ai.request_deadline);
        if let Ok(style) = env::var("SPENDLENS_PROMPT_STYLE") {
            ai.prompt_style = style.parse().unwrap_or_else(|_| {
                tracing::warn!(style = %style, "Unknown prompt style, using summary");
                PromptStyle::Summary
            });
        }

        if ai.api_key.is_empty() {
            tracing::warn!(
                provider = provider.as_str(),
                "No AI API key configured, insight requests will fail"
            );
        }

        Self {
            host: env::var("SPENDLENS_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("SPENDLENS_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_path: env::var("SPENDLENS_DATABASE_URL")
                .map(|v| {
                    PathBuf::from(
                        v.strip_prefix("sqlite://")
                            .or_else(|| v.strip_prefix("sqlite:"))
                            .unwrap_or(&v),
                    )
                })
                .unwrap_or_else(|_| PathBuf::from("data/spendlens.db")),
            migrations_path: env::var("SPENDLENS_MIGRATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("migrations")),
            jwt_secret,
            token_ttl: env::var("SPENDLENS_TOKEN_TTL_HOURS")
                .ok()
                .and_then(|h| h.parse::<u64>().ok())
                .map(|h| Duration::from_secs(h * 3600))
                .unwrap_or(Duration::from_secs(72 * 3600)),
            currency: env::var("SPENDLENS_CURRENCY").unwrap_or_else(|_| "INR".into()),
            ai,
            insight_ttl: env_secs("SPENDLENS_INSIGHT_TTL_SECS")
                .unwrap_or(Duration::from_secs(3600)),
            insight_cache_max: match env::var("SPENDLENS_INSIGHT_CACHE_MAX")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
            {
                Some(0) => None,
                Some(n) => Some(n),
                None => Some(1024),
            },
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
