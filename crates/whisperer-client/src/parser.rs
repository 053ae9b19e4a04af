use scraper::{ElementRef, Html, Selector};
use whisperer_core::error::AppError;
use whisperer_core::models::{Article, ArticleMarkers};
use whisperer_core::traits::ArticleParser;

/// HTML article parser driven by marker class names.
///
/// The headline is required; a missing timestamp or body leaves that field
/// empty. Body paragraphs are concatenated in document order with no
/// separator. Every field has its outer whitespace trimmed; whitespace inside
/// the body is kept as the page has it.
#[derive(Clone)]
pub struct MarkerArticleParser {
    headline: Selector,
    published: Selector,
    body: Selector,
}

impl MarkerArticleParser {
    pub fn new(markers: &ArticleMarkers) -> Result<Self, AppError> {
        Ok(Self {
            headline: class_selector(&markers.headline_class)?,
            published: class_selector(&markers.published_class)?,
            body: class_selector(&markers.body_class)?,
        })
    }
}

fn class_selector(class: &str) -> Result<Selector, AppError> {
    Selector::parse(&format!(".{class}"))
        .map_err(|e| AppError::ConfigError(format!("Invalid marker class '{class}': {e}")))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

impl ArticleParser for MarkerArticleParser {
    fn parse(&self, html: &str) -> Result<Article, AppError> {
        let document = Html::parse_document(html);

        let title = document
            .select(&self.headline)
            .next()
            .map(|el| text_of(el).trim().to_string())
            .ok_or_else(|| AppError::MalformedDocument("headline element not found".into()))?;

        let published = document
            .select(&self.published)
            .next()
            .map(|el| text_of(el).trim().to_string())
            .unwrap_or_default();

        let body: String = document.select(&self.body).map(text_of).collect();
        let body = body.trim().to_string();

        let article = Article {
            title,
            published,
            body,
        };
        tracing::debug!(
            title = %article.title,
            published = %article.published,
            published_at = ?article.published_at(),
            body_bytes = article.body.len(),
            "Parsed article"
        );
        Ok(article)
    }
}
