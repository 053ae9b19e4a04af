use crate::error::AppError;
use crate::query::Query;
use crate::traits::{Fetcher, SearchResolver};

/// Default number of articles resolved for a keyword query.
pub const DEFAULT_MAX_RESULTS: usize = 3;

/// Resolves a query into raw article documents.
///
/// A URL query is fetched directly. A keyword query is first resolved to
/// up to `max_results` article URLs, which are then fetched in resolution
/// order. The first failed fetch aborts the whole query.
///
/// Only a URL query can fail with [`AppError::InvalidQuery`]: a malformed
/// URL or a 4xx reply to the address the user typed is theirs to correct.
/// The same failures on search-resolved URLs pass through unchanged.
#[derive(Clone)]
pub struct ContentFetcher<F, R> {
    fetcher: F,
    resolver: R,
    max_results: usize,
}

impl<F, R> ContentFetcher<F, R>
where
    F: Fetcher,
    R: SearchResolver,
{
    pub fn new(fetcher: F, resolver: R) -> Self {
        Self {
            fetcher,
            resolver,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub async fn fetch(&self, query: &Query) -> Result<Vec<String>, AppError> {
        let urls = match query {
            Query::Url(url) => {
                let html = self.fetch_one(url).await.map_err(blame_user_url)?;
                return Ok(vec![html]);
            }
            Query::Keyword(keyword) => {
                let urls = self.resolver.resolve(keyword, self.max_results).await?;
                if urls.is_empty() {
                    return Err(AppError::NoResults {
                        keyword: keyword.clone(),
                    });
                }
                tracing::info!(%keyword, count = urls.len(), "Resolved article URLs");
                urls
            }
        };

        let mut documents = Vec::with_capacity(urls.len());
        for url in &urls {
            documents.push(self.fetch_one(url).await?);
        }
        Ok(documents)
    }

    async fn fetch_one(&self, url: &str) -> Result<String, AppError> {
        tracing::info!("Fetching {}", url);
        let html = self.fetcher.fetch(url).await?;
        tracing::info!("Fetched {} bytes of HTML", html.len());
        Ok(html)
    }
}

fn blame_user_url(err: AppError) -> AppError {
    match err {
        AppError::InvalidUrl(reason) => AppError::InvalidQuery(reason),
        AppError::Fetch { status, url } if (400..500).contains(&status) && status != 429 => {
            AppError::InvalidQuery(format!("HTTP {status} for {url}"))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockFetcher, MockResolver};

    #[tokio::test]
    async fn url_query_issues_exactly_one_get() {
        let fetcher = MockFetcher::new("<html>a</html>");
        let resolver = MockResolver::new(vec!["https://unused.example.com"]);
        let content = ContentFetcher::new(fetcher.clone(), resolver.clone());

        let docs = content
            .fetch(&Query::classify("https://example.com/a"))
            .await
            .unwrap();

        assert_eq!(docs, vec!["<html>a</html>".to_string()]);
        assert_eq!(
            fetcher.requested.lock().unwrap().as_slice(),
            ["https://example.com/a".to_string()]
        );
        assert!(resolver.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn keyword_query_fetches_resolved_urls_in_order() {
        let fetcher = MockFetcher::with_responses(vec![
            Ok("<html>1</html>".into()),
            Ok("<html>2</html>".into()),
            Ok("<html>3</html>".into()),
        ]);
        let resolver = MockResolver::new(vec![
            "https://www.coindesk.com/c",
            "https://www.coindesk.com/a",
            "https://www.coindesk.com/b",
            "https://www.coindesk.com/d",
        ]);
        let content = ContentFetcher::new(fetcher.clone(), resolver.clone());

        let docs = content.fetch(&Query::classify("bitcoin")).await.unwrap();

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0], "<html>1</html>");
        assert_eq!(
            fetcher.requested.lock().unwrap().as_slice(),
            [
                "https://www.coindesk.com/c".to_string(),
                "https://www.coindesk.com/a".to_string(),
                "https://www.coindesk.com/b".to_string(),
            ]
        );
        assert_eq!(
            resolver.calls.lock().unwrap().as_slice(),
            [("bitcoin".to_string(), 3)]
        );
    }

    #[tokio::test]
    async fn keyword_without_results_is_no_results_error() {
        let fetcher = MockFetcher::new("<html>unused</html>");
        let content = ContentFetcher::new(fetcher.clone(), MockResolver::empty());

        let err = content.fetch(&Query::classify("zzzz")).await.unwrap_err();

        assert!(matches!(err, AppError::NoResults { ref keyword } if keyword == "zzzz"));
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn keyword_fetch_stops_at_first_failure() {
        let fetcher = MockFetcher::with_responses(vec![
            Ok("<html>1</html>".into()),
            Err(AppError::Fetch {
                status: 500,
                url: "https://www.coindesk.com/b".into(),
            }),
            Ok("<html>3</html>".into()),
        ]);
        let resolver = MockResolver::new(vec![
            "https://www.coindesk.com/a",
            "https://www.coindesk.com/b",
            "https://www.coindesk.com/c",
        ]);
        let content = ContentFetcher::new(fetcher.clone(), resolver);

        let err = content.fetch(&Query::classify("ether")).await.unwrap_err();

        assert!(matches!(err, AppError::Fetch { status: 500, .. }));
        assert_eq!(fetcher.requested.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn client_error_on_user_url_is_bad_input() {
        let fetcher = MockFetcher::with_error(AppError::Fetch {
            status: 404,
            url: "https://www.coindesk.com/nope".into(),
        });
        let content = ContentFetcher::new(fetcher, MockResolver::empty());

        let err = content
            .fetch(&Query::classify("https://www.coindesk.com/nope"))
            .await
            .unwrap_err();

        assert!(err.is_bad_input());
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[tokio::test]
    async fn rejected_user_url_is_bad_input() {
        let fetcher = MockFetcher::with_error(AppError::InvalidUrl("SSRF blocked".into()));
        let content = ContentFetcher::new(fetcher, MockResolver::empty());

        let err = content
            .fetch(&Query::classify("http://127.0.0.1/admin"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn server_error_on_user_url_is_not_bad_input() {
        let fetcher = MockFetcher::with_error(AppError::Fetch {
            status: 503,
            url: "https://www.coindesk.com/a".into(),
        });
        let content = ContentFetcher::new(fetcher, MockResolver::empty());

        let err = content
            .fetch(&Query::classify("https://www.coindesk.com/a"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Fetch { status: 503, .. }));
        assert!(!err.is_bad_input());
    }

    #[tokio::test]
    async fn client_error_on_resolved_article_is_not_bad_input() {
        let fetcher = MockFetcher::with_error(AppError::Fetch {
            status: 404,
            url: "https://www.coindesk.com/gone".into(),
        });
        let resolver = MockResolver::new(vec!["https://www.coindesk.com/gone"]);
        let content = ContentFetcher::new(fetcher, resolver);

        let err = content.fetch(&Query::classify("bitcoin")).await.unwrap_err();

        assert!(matches!(err, AppError::Fetch { status: 404, .. }));
        assert!(!err.is_bad_input());
    }

    #[tokio::test]
    async fn resolver_errors_propagate() {
        let content = ContentFetcher::new(
            MockFetcher::new("<html></html>"),
            MockResolver::with_error(AppError::ElementNotFound("sort".into())),
        );

        let err = content.fetch(&Query::classify("bitcoin")).await.unwrap_err();
        assert!(matches!(err, AppError::ElementNotFound(_)));
    }

    #[tokio::test]
    async fn max_results_is_passed_to_resolver() {
        let resolver = MockResolver::new(vec!["https://a.example.com/1"]);
        let content = ContentFetcher::new(MockFetcher::new("<html></html>"), resolver.clone())
            .with_max_results(5);

        content.fetch(&Query::classify("defi")).await.unwrap();
        assert_eq!(resolver.calls.lock().unwrap()[0].1, 5);
    }
}
