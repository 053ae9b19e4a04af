//! Bounded retries with exponential backoff for flaky remote calls.
//!
//! [`RetryingFetcher`] wraps any [`Fetcher`]; the batch job runner applies
//! the same [`with_retries`] loop to its status, results and artifact calls.
//! Only errors reporting [`AppError::is_retryable`] are retried; everything
//! else fails on the first attempt. The default policy performs no retries
//! at all.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use whisperer_core::retry::{RetryPolicy, RetryingFetcher};
//!
//! # use whisperer_core::traits::Fetcher;
//! # #[derive(Clone)] struct MyFetcher;
//! # impl Fetcher for MyFetcher {
//! #     async fn fetch(&self, _: &str) -> Result<String, whisperer_core::error::AppError> { todo!() }
//! # }
//! let policy = RetryPolicy::new(3).with_base_delay(Duration::from_millis(250));
//! let fetcher = RetryingFetcher::new(MyFetcher, policy);
//! ```

use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::traits::Fetcher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (1-indexed): base, 2×base, 4×base, ... capped.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }
}

/// Run `op` until it succeeds, fails with a permanent error, or has been
/// retried `policy.max_retries` times. `what` names the call in logs.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    %what,
                    error = %e,
                    attempt,
                    delay_ms = %delay.as_millis(),
                    "Call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// A [`Fetcher`] wrapper that retries transient failures.
#[derive(Clone)]
pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: Fetcher> RetryingFetcher<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<F: Fetcher> Fetcher for RetryingFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        with_retries(&self.policy, url, move || self.inner.fetch(url)).await
    }
}
