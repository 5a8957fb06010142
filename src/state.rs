use std::sync::Arc;

use crate::cache::InsightCache;
use crate::config::Config;
use crate::db::DbPool;
use crate::services::ai_client::TextGenerator;
use crate::services::insights::InsightService;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub insights: Arc<InsightService>,
}

impl AppState {
    /// Wire the insight service to `generator` using the cache and model
    /// settings from `config`.
    pub fn new(db: DbPool, config: Config, generator: Arc<dyn TextGenerator>) -> Self {
        let cache = InsightCache::new(config.insight_ttl, config.insight_cache_max);
        let insights = InsightService::new(generator, cache, &config.ai, &config.currency);

        Self {
            db,
            config: Arc::new(config),
            insights: Arc::new(insights),
        }
    }
}
