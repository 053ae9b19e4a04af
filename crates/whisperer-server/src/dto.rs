use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use whisperer_core::WhisperResult;

// ---------------------------------------------------------------------------
// Whisper
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct WhisperRequest {
    /// Article URL, or a keyword to search for
    pub query: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct WhisperResponse {
    /// Cache key; valid for speech downloads while the results are cached
    pub key: String,
    pub results: Vec<WhisperItem>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct WhisperItem {
    pub index: usize,
    pub title: String,
    /// Publish date as printed on the page
    pub published: String,
    /// `published` parsed to UTC; null when the page date is missing or unrecognized
    pub published_at: Option<DateTime<Utc>>,
    pub summary: String,
    /// Relative URL of the WAV clip
    pub speech_url: String,
}

impl WhisperItem {
    pub fn new(key: &str, index: usize, result: &WhisperResult) -> Self {
        Self {
            index,
            title: result.title.clone(),
            published: result.published.clone(),
            published_at: result.published_at(),
            summary: result.summary.clone(),
            speech_url: format!("/v1/speech/{key}/{index}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
        }
    }
}
