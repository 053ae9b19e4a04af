use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Scheme, then a domain or dotted-quad IP, optional port, optional path/query.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^https?://",
        r"(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+(?:[A-Z]{2,6}\.?|[A-Z0-9-]{2,}\.?)",
        r"|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})",
        r"(?::\d+)?",
        r"(?:/?|[/?]\S+)$",
    ))
    .expect("URL pattern is a valid regex")
});

/// A user query, classified as either a direct article URL or a search keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Url(String),
    Keyword(String),
}

impl Query {
    /// Classify a raw query string. Never fails: anything that is not a
    /// well-formed http(s) URL is a keyword.
    pub fn classify(raw: &str) -> Self {
        if URL_PATTERN.is_match(raw) {
            Query::Url(raw.to_string())
        } else {
            Query::Keyword(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Query::Url(s) | Query::Keyword(s) => s,
        }
    }

    pub fn is_url(&self) -> bool {
        matches!(self, Query::Url(_))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
