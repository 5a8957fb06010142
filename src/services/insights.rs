//! Insight generation: cache lookup, aggregation, prompt, model fallback.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::InsightCache;
use crate::config::AiSettings;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::Insight;
use crate::services::ai_client::{FailureKind, ProviderError, TextGenerator};
use crate::services::analytics;
use crate::services::prompt::{build_prompt, PromptStyle};

/// Text produced by the first model in the list that succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub text: String,
    pub model: String,
}

pub struct InsightService {
    generator: Arc<dyn TextGenerator>,
    cache: InsightCache,
    models: Vec<String>,
    prompt_style: PromptStyle,
    currency: String,
    request_deadline: Duration,
}

impl InsightService {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        cache: InsightCache,
        settings: &AiSettings,
        currency: &str,
    ) -> Self {
        Self {
            generator,
            cache,
            models: settings.models.clone(),
            prompt_style: settings.prompt_style,
            currency: currency.to_string(),
            request_deadline: settings.request_deadline,
        }
    }

    pub fn cache(&self) -> &InsightCache {
        &self.cache
    }

    /// Return a cached insight for `user_id` or generate a fresh one.
    pub async fn insights_for(&self, pool: &DbPool, user_id: i64) -> AppResult<Insight> {
        if let Some(hit) = self.cache.get(user_id) {
            debug!(user_id, "Serving cached insight");
            return Ok(Insight {
                insights: hit.text,
                cached: true,
                model_used: Some(hit.model),
            });
        }

        let _flight = self.cache.single_flight(user_id).await;

        // Another request for this user may have finished while we waited.
        if let Some(hit) = self.cache.get(user_id) {
            debug!(user_id, "Serving insight generated by a concurrent request");
            return Ok(Insight {
                insights: hit.text,
                cached: true,
                model_used: Some(hit.model),
            });
        }

        let spending = analytics::aggregate_from_pool(pool, user_id)?;
        let prompt = build_prompt(&spending, self.prompt_style, &self.currency);

        let generated = self.generate(&prompt).await?;
        self.cache
            .insert(user_id, generated.text.clone(), generated.model.clone());

        info!(user_id, model = %generated.model, "Generated fresh insight");
        Ok(Insight {
            insights: generated.text,
            cached: false,
            model_used: Some(generated.model),
        })
    }

    /// Try each configured model once, in order, until one succeeds.
    ///
    /// Every failure moves on to the next model regardless of its kind. The
    /// loop also stops when the per-request deadline passes; models not yet
    /// tried are then skipped. When every model fails, the reported error is
    /// the last permanent failure if there was one, otherwise the last one.
    pub async fn generate(&self, prompt: &str) -> AppResult<Generated> {
        let deadline = Instant::now() + self.request_deadline;
        let mut last_error: Option<ProviderError> = None;
        let mut last_permanent: Option<ProviderError> = None;

        for (attempt, model) in self.models.iter().enumerate() {
            if Instant::now() >= deadline {
                warn!(model = %model, attempt, "Insight request deadline exceeded");
                return Err(exhausted(&deadline_error(self.request_deadline)));
            }

            let outcome =
                tokio::time::timeout_at(deadline, self.generator.generate(model, prompt)).await;

            let err = match outcome {
                Ok(Ok(text)) => {
                    debug!(model = %model, attempt, "Model produced insight");
                    return Ok(Generated {
                        text,
                        model: model.clone(),
                    });
                }
                Ok(Err(err)) => err,
                Err(_) => {
                    warn!(model = %model, attempt, "Insight request deadline exceeded");
                    return Err(exhausted(&deadline_error(self.request_deadline)));
                }
            };

            match err.kind() {
                FailureKind::Transient => warn!(
                    model = %model,
                    status = ?err.status,
                    error = %err,
                    "Model unavailable, trying next candidate"
                ),
                FailureKind::Permanent => {
                    error!(
                        model = %model,
                        status = ?err.status,
                        error = %err,
                        "Model failed with a non-retryable error, trying next candidate"
                    );
                    last_permanent = Some(err.clone());
                }
            }
            last_error = Some(err);
        }

        match last_permanent.or(last_error) {
            Some(err) => Err(exhausted(&err)),
            None => Err(AppError::AllModelsUnavailable {
                last_error: "no models configured".to_string(),
            }),
        }
    }
}

fn exhausted(err: &ProviderError) -> AppError {
    AppError::AllModelsUnavailable {
        last_error: format!("{}: {}", err.kind(), err.message),
    }
}

fn deadline_error(limit: Duration) -> ProviderError {
    ProviderError::transport(format!(
        "request deadline of {}s exceeded",
        limit.as_secs_f64()
    ))
}
