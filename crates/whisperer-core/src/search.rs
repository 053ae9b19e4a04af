//! Keyword search by driving the news site's own search page.
//!
//! The site ranks results by relevance and offers no readiness signal, so
//! the resolver opens the results page in an automated browser session,
//! switches the sort order to "newest" through the UI, waits a fixed settle
//! delay and then reads the result anchors. All of the fragile markup
//! knowledge lives in [`SearchConfig`].

use std::future::Future;
use std::time::Duration;

use url::Url;

use crate::error::AppError;
use crate::traits::SearchResolver;

/// Driver and markup configuration for the search resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// News site root, e.g. `https://www.coindesk.com`.
    pub site_url: String,
    pub headless: bool,
    pub window_size: (u32, u32),
    /// Extra command-line flags for the browser process.
    pub browser_args: Vec<String>,
    /// Fixed wait after page load and after re-sorting.
    pub settle_delay: Duration,
    /// Container that only exists when the search produced a results page.
    pub results_panel_xpath: String,
    /// Control that reveals the sort options.
    pub sort_toggle_xpath: String,
    /// The "By Newest" sort option.
    pub newest_option_xpath: String,
    /// One anchor per search hit, in ranking order.
    pub result_anchor_xpath: String,
    /// Leading result slots to ignore. CoinDesk puts a promoted card in the
    /// first slot; other sites will want 0.
    pub skip_leading: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            site_url: "https://www.coindesk.com".to_string(),
            headless: true,
            window_size: (1920, 1080),
            browser_args: [
                "--no-sandbox",
                "--disable-gpu",
                "--disable-dev-shm-usage",
                "--disable-extensions",
                "--disable-popup-blocking",
                "--disable-features=NetworkService,VizDisplayCompositor",
                "--no-first-run",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            settle_delay: Duration::from_millis(500),
            results_panel_xpath: r#"//*[@id="queryly_advanced_container"]"#.to_string(),
            sort_toggle_xpath:
                r#"//*[@id="queryly_advanced_container"]/div[4]/div[1]/div[1]/div/div"#
                    .to_string(),
            newest_option_xpath: "/html/body/div[3]/div/div[2]/p[text()='By Newest']"
                .to_string(),
            result_anchor_xpath: "//div[@class='searchstyles__SearchCard-ci5zlg-18 dLAdLq']/a"
                .to_string(),
            skip_leading: 1,
        }
    }
}

impl SearchConfig {
    pub fn with_site_url(mut self, site_url: impl Into<String>) -> Self {
        self.site_url = site_url.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// `<site>/search/?s=<keyword>`
    pub fn search_url(&self, keyword: &str) -> Result<String, AppError> {
        let base = Url::parse(&self.site_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid site URL '{}': {e}", self.site_url)))?;
        let mut url = base
            .join("/search/")
            .map_err(|e| AppError::ConfigError(format!("Invalid search URL: {e}")))?;
        url.query_pairs_mut().append_pair("s", keyword);
        Ok(url.to_string())
    }
}

/// One live browser session (a single tab in a dedicated browser process).
pub trait SearchSession: Send + Sync {
    fn open(&self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Number of elements matching `xpath`; zero when none match.
    fn count(&self, xpath: &str) -> impl Future<Output = Result<usize, AppError>> + Send;

    /// Bring the element into view and click it.
    ///
    /// Fails with [`AppError::ElementNotFound`] when nothing matches.
    fn click(&self, xpath: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// `href` attribute of every element matching `xpath`, in DOM order.
    fn hrefs(&self, xpath: &str)
    -> impl Future<Output = Result<Vec<Option<String>>, AppError>> + Send;

    /// Tear the session down. Must not fail.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Starts isolated browser sessions.
pub trait SessionLauncher: Send + Sync + Clone {
    type Session: SearchSession;

    fn launch(
        &self,
        config: &SearchConfig,
    ) -> impl Future<Output = Result<Self::Session, AppError>> + Send;
}

/// [`SearchResolver`] that automates the site's search page.
///
/// Every call launches a fresh session and closes it before returning,
/// whether or not the search succeeded.
#[derive(Clone)]
pub struct BrowserSearchResolver<L> {
    launcher: L,
    config: SearchConfig,
}

impl<L: SessionLauncher> BrowserSearchResolver<L> {
    pub fn new(launcher: L, config: SearchConfig) -> Self {
        Self { launcher, config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    async fn search(
        &self,
        session: &L::Session,
        keyword: &str,
        n: usize,
    ) -> Result<Vec<String>, AppError> {
        let url = self.config.search_url(keyword)?;
        tracing::info!("Searching {}", url);
        session.open(&url).await?;
        tokio::time::sleep(self.config.settle_delay).await;

        if session.count(&self.config.results_panel_xpath).await? == 0 {
            tracing::info!(%keyword, "Search page has no results panel");
            return Ok(Vec::new());
        }

        // Two steps: open the sort menu, then pick "newest".
        session.click(&self.config.sort_toggle_xpath).await?;
        session.click(&self.config.newest_option_xpath).await?;
        tokio::time::sleep(self.config.settle_delay).await;

        let hrefs = session.hrefs(&self.config.result_anchor_xpath).await?;
        tracing::debug!(anchors = hrefs.len(), "Collected result anchors");
        Ok(select_result_urls(hrefs, self.config.skip_leading, n))
    }
}

impl<L: SessionLauncher> SearchResolver for BrowserSearchResolver<L> {
    async fn resolve(&self, keyword: &str, n: usize) -> Result<Vec<String>, AppError> {
        let session = self.launcher.launch(&self.config).await?;
        let result = self.search(&session, keyword, n).await;
        session.close().await;

        if let Ok(urls) = &result {
            tracing::info!(%keyword, count = urls.len(), "Resolved search results");
        }
        result
    }
}

/// Skip the leading slots, then keep the first `n` anchors that carry an
/// `href`.
fn select_result_urls(hrefs: Vec<Option<String>>, skip: usize, n: usize) -> Vec<String> {
    hrefs.into_iter().skip(skip).flatten().take(n).collect()
}
