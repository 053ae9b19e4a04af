use whisperer_core::retry::{RetryPolicy, RetryingFetcher};
use whisperer_core::{
    ArticleMarkers, BatchJobRunner, BrowserSearchResolver, ContentFetcher, SearchConfig,
    WhisperConfig, WhisperService, error::AppError,
};

use crate::{ChromiumLauncher, HttpJobBackend, MarkerArticleParser, ReqwestFetcher};

/// The production pipeline: reqwest downloads, Chromium search, marker
/// parsing and the remote job API.
pub type LiveWhisperService = WhisperService<
    RetryingFetcher<ReqwestFetcher>,
    BrowserSearchResolver<ChromiumLauncher>,
    MarkerArticleParser,
    BatchJobRunner<HttpJobBackend>,
>;

/// Wire a [`LiveWhisperService`] from runtime configuration.
///
/// `search.site_url` is overridden by `config.site_url`. Keep
/// `ssrf_protection` on whenever queries come from untrusted callers.
pub fn live_service(
    config: &WhisperConfig,
    search: SearchConfig,
    ssrf_protection: bool,
) -> Result<LiveWhisperService, AppError> {
    let mut fetcher = ReqwestFetcher::new()?;
    if !ssrf_protection {
        fetcher = fetcher.allow_private_urls();
    }
    let fetcher = RetryingFetcher::new(fetcher, RetryPolicy::new(config.fetch_retries));

    let resolver = BrowserSearchResolver::new(
        ChromiumLauncher::new(),
        search.with_site_url(config.site_url.as_str()),
    );
    let content = ContentFetcher::new(fetcher, resolver).with_max_results(config.max_results);

    let parser = MarkerArticleParser::new(&ArticleMarkers::default())?;
    let backend = HttpJobBackend::with_base_url(&config.api_key, &config.api_base_url)?;

    Ok(WhisperService::new(content, parser, BatchJobRunner::new(backend))
        .with_job_timeout(config.job_timeout))
}
