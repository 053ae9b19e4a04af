use std::sync::Arc;

use futures::future::BoxFuture;
use whisperer_core::{AppError, Pipeline, WhisperResult};

use crate::cache::ResultCache;

/// Object-safe view of a [`Pipeline`], so handlers stay non-generic.
pub trait DynPipeline: Send + Sync {
    fn run<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<WhisperResult>, AppError>>;
}

impl<P: Pipeline + 'static> DynPipeline for P {
    fn run<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<WhisperResult>, AppError>> {
        Box::pin(self.whisper(query))
    }
}

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub pipeline: Arc<dyn DynPipeline>,
    pub cache: ResultCache,
    /// Bearer token required on `/v1/*`.
    pub api_key: String,
}

impl AppState {
    pub fn new(pipeline: impl Pipeline + 'static, api_key: impl Into<String>) -> Self {
        Self::with_cache(pipeline, ResultCache::default(), api_key)
    }

    pub fn with_cache(
        pipeline: impl Pipeline + 'static,
        cache: ResultCache,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            cache,
            api_key: api_key.into(),
        }
    }
}
