use std::time::Duration;

use crate::content::DEFAULT_MAX_RESULTS;
use crate::error::AppError;
use crate::pipeline::DEFAULT_JOB_TIMEOUT;

pub const DEFAULT_API_BASE_URL: &str = "https://app.modzy.com/api";
pub const DEFAULT_SITE_URL: &str = "https://www.coindesk.com";

/// Runtime configuration shared by the binaries.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub job_timeout: Duration,
    pub site_url: String,
    pub max_results: usize,
    pub fetch_retries: u32,
}

impl WhisperConfig {
    /// Read configuration from environment variables.
    ///
    /// - `WHISPERER_API_KEY` (required)
    /// - `WHISPERER_API_BASE_URL` (optional, defaults to the Modzy API)
    /// - `WHISPERER_JOB_TIMEOUT_SECS` (optional, defaults to 3600)
    /// - `WHISPERER_SITE_URL` (optional, defaults to CoinDesk)
    /// - `WHISPERER_MAX_RESULTS` (optional, defaults to 3)
    /// - `WHISPERER_FETCH_RETRIES` (optional, defaults to 0)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let api_key = lookup("WHISPERER_API_KEY").ok_or_else(|| {
            AppError::ConfigError("WHISPERER_API_KEY not set. Required for inference jobs.".into())
        })?;

        let job_timeout_secs: u64 = parse_or(
            &lookup,
            "WHISPERER_JOB_TIMEOUT_SECS",
            DEFAULT_JOB_TIMEOUT.as_secs(),
        )?;
        let max_results: usize = parse_or(&lookup, "WHISPERER_MAX_RESULTS", DEFAULT_MAX_RESULTS)?;
        if max_results == 0 {
            return Err(AppError::ConfigError(
                "WHISPERER_MAX_RESULTS must be at least 1".into(),
            ));
        }
        let fetch_retries: u32 = parse_or(&lookup, "WHISPERER_FETCH_RETRIES", 0)?;

        Ok(Self {
            api_key,
            api_base_url: lookup("WHISPERER_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            job_timeout: Duration::from_secs(job_timeout_secs),
            site_url: lookup("WHISPERER_SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_string()),
            max_results,
            fetch_retries,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            AppError::ConfigError(format!(
                "Invalid {key} '{raw}': must be a non-negative integer"
            ))
        }),
    }
}
