use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use whisperer_core::{AppError, WhisperResult, compute_hash};

use crate::state::DynPipeline;

pub const DEFAULT_CAPACITY: u64 = 10;
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub type CachedResults = Arc<Vec<WhisperResult>>;

/// Pipeline results keyed by the SHA-256 of the query text.
///
/// Concurrent requests for the same uncached query share one pipeline run.
/// Failures are never cached.
#[derive(Clone)]
pub struct ResultCache {
    inner: Cache<String, CachedResults>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl ResultCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn key_for(query: &str) -> String {
        compute_hash(query)
    }

    /// Cached results for `query`, running the pipeline on a miss.
    /// Returns the cache key alongside the results.
    pub async fn get_or_run(
        &self,
        query: &str,
        pipeline: &dyn DynPipeline,
    ) -> Result<(String, CachedResults), Arc<AppError>> {
        let key = Self::key_for(query);
        let results = self
            .inner
            .try_get_with(key.clone(), async {
                tracing::info!(key = %&key[..8], "Cache miss, running pipeline");
                pipeline.run(query).await.map(Arc::new)
            })
            .await?;
        Ok((key, results))
    }

    pub async fn get(&self, key: &str) -> Option<CachedResults> {
        self.inner.get(key).await
    }
}
