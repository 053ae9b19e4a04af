use chrono::{DateTime, NaiveDateTime, Utc};
use sha2::{Digest, Sha256};

/// Structured content extracted from one news page.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Article {
    pub title: String,
    /// Publish timestamp exactly as printed on the page (may be empty).
    pub published: String,
    pub body: String,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        published: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            published: published.into(),
            body: body.into(),
        }
    }

    /// Best-effort parse of [`Self::published`].
    ///
    /// Accepts RFC 3339, RFC 2822 and the CoinDesk display form
    /// `"Oct 18, 2022 at 8:47 a.m. UTC"`.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        parse_published(&self.published)
    }

    /// The flat text handed to the speech stage.
    ///
    /// Title and date are fused into the blob so the spoken output still
    /// carries them.
    pub fn speech_script(&self, summary: &str) -> String {
        format!(
            "Title: {} Date: {} Summary: {}",
            self.title, self.published, summary
        )
    }
}

fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let normalized = raw
        .replace("a.m.", "AM")
        .replace("p.m.", "PM")
        .trim_end_matches("UTC")
        .trim()
        .to_string();
    NaiveDateTime::parse_from_str(&normalized, "%b %d, %Y at %I:%M %p")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Class names that locate the article fields in the page markup.
///
/// These follow the news site's markup and change whenever it is
/// redesigned, so they are configuration rather than constants.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ArticleMarkers {
    /// Required; exactly one element expected.
    pub headline_class: String,
    /// Optional; the field is empty when absent.
    pub published_class: String,
    /// Zero or more paragraphs, concatenated in document order.
    pub body_class: String,
}

impl Default for ArticleMarkers {
    fn default() -> Self {
        Self {
            headline_class: "at-headline".to_string(),
            published_class: "dHSCiD".to_string(),
            body_class: "at-text".to_string(),
        }
    }
}

/// One fully processed article: metadata, summary and synthesized speech.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct WhisperResult {
    pub title: String,
    pub published: String,
    pub summary: String,
    /// WAV audio bytes.
    #[serde(skip)]
    pub speech: Vec<u8>,
}

impl WhisperResult {
    /// [`Self::published`] as a timestamp, when it parses.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        parse_published(&self.published)
    }
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
