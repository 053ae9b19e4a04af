use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::inference::{BatchInputs, BatchOutputs, JobKind};
use crate::models::{Article, WhisperResult};

/// Fetches a raw HTML document from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Resolves a search keyword into ranked article URLs.
///
/// Implementations return at most `n` URLs, newest first. An empty list
/// means the search legitimately matched nothing.
pub trait SearchResolver: Send + Sync + Clone {
    fn resolve(
        &self,
        keyword: &str,
        n: usize,
    ) -> impl Future<Output = Result<Vec<String>, AppError>> + Send;
}

/// Parses one raw HTML document into an [`Article`].
pub trait ArticleParser: Send + Sync + Clone {
    fn parse(&self, html: &str) -> Result<Article, AppError>;
}

/// Runs one batched inference job and blocks until it reaches a terminal state.
///
/// On success the outputs are keyed by the input names, in submission order.
/// Inputs whose processing failed are absent from the outputs.
pub trait InferenceClient: Send + Sync + Clone {
    fn run_batch(
        &self,
        kind: &JobKind,
        inputs: &BatchInputs,
        timeout: Duration,
    ) -> impl Future<Output = Result<BatchOutputs, AppError>> + Send;
}

/// The end-to-end entry point consumed by the calling boundary.
pub trait Pipeline: Send + Sync {
    fn whisper(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<WhisperResult>, AppError>> + Send;
}
