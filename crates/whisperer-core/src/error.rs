use thiserror::Error;

/// Shown to the user instead of the raw error for [`AppError::is_bad_input`].
pub const BAD_INPUT_MESSAGE: &str =
    "Invalid URL! Please enter a valid CoinDesk URL (e.g. https://www.coindesk.com/markets/...)";

/// Application-wide error types for Crypto Whisperer.
///
/// Every variant is terminal for the request that raised it; the pipeline
/// never returns partial results.
#[derive(Error, Debug)]
pub enum AppError {
    /// The user's URL query could not be fetched as given.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A URL was malformed or points somewhere the fetcher refuses to go.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// An article GET returned a non-success status.
    #[error("HTTP {status} for {url}")]
    Fetch { status: u16, url: String },

    /// The inference job API or one of its artifact downloads returned a
    /// non-success status.
    #[error("Inference API returned HTTP {status} for {url}")]
    JobApi { status: u16, url: String },

    /// Keyword search produced zero article URLs.
    #[error("No result is found based on the keyword '{keyword}'")]
    NoResults { keyword: String },

    /// Search page automation could not locate an expected control.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Article markup is missing a required field.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Remote inference job ended in a non-completed state or timed out.
    #[error("{kind} job failed with status {status}")]
    JobFailed { kind: String, status: String },

    /// A stage produced a different number of outputs than it was given.
    #[error("Cannot assemble {stage} results: expected {expected} outputs, got {actual}")]
    Assembly {
        stage: String,
        expected: usize,
        actual: usize,
    },

    /// HTTP request failed before a status was received.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Headless browser could not be launched or driven.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => true,
            AppError::Fetch { status, .. } | AppError::JobApi { status, .. } => {
                *status == 429 || *status >= 500
            }
            AppError::HttpError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }

    /// Returns true if the user can fix this by correcting their input.
    ///
    /// Only [`AppError::InvalidQuery`] qualifies. The content stage raises it
    /// when the URL the user typed is malformed or answers with a client
    /// error; failures on search-resolved URLs or the inference API never do.
    pub fn is_bad_input(&self) -> bool {
        matches!(self, AppError::InvalidQuery(_))
    }

    /// Message for the end user: the corrective hint for bad input, the
    /// error text otherwise.
    pub fn user_message(&self) -> String {
        if self.is_bad_input() {
            BAD_INPUT_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}
