use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use whisperer_core::error::AppError;
use whisperer_core::search::{SearchConfig, SearchSession, SessionLauncher};

/// Launches one Chromium process per search session via the Chrome DevTools
/// Protocol.
///
/// Requires a Chromium / Chrome binary reachable via `$CHROME_BIN`, a
/// well-known install path, or the default lookup done by `chromiumoxide`.
///
/// # Example
///
/// ```rust,no_run
/// use whisperer_client::ChromiumLauncher;
/// use whisperer_core::{BrowserSearchResolver, SearchConfig, SearchResolver};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = BrowserSearchResolver::new(ChromiumLauncher::new(), SearchConfig::default());
/// let urls = resolver.resolve("bitcoin", 3).await?;
/// println!("{urls:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChromiumLauncher {
    navigation_timeout: Duration,
}

impl Default for ChromiumLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ChromiumLauncher {
    /// Launcher with a **30 s** navigation timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(navigation_timeout: Duration) -> Self {
        Self { navigation_timeout }
    }

    fn browser_config(config: &SearchConfig) -> Result<BrowserConfig, AppError> {
        let (width, height) = config.window_size;
        let mut builder = BrowserConfig::builder()
            .disable_default_args()
            .window_size(width, height);

        if let Some(bin) = find_chrome_binary() {
            tracing::debug!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        builder = if config.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };

        builder
            .args(config.browser_args.iter().map(String::as_str))
            .build()
            .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))
    }
}

impl SessionLauncher for ChromiumLauncher {
    type Session = ChromiumSession;

    async fn launch(&self, config: &SearchConfig) -> Result<ChromiumSession, AppError> {
        let (browser, mut handler) = Browser::launch(Self::browser_config(config)?)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                ChromiumSession::shutdown(browser, handler_task).await;
                return Err(AppError::BrowserError(format!("Failed to open tab: {e}")));
            }
        };

        tracing::debug!("Browser session started");
        Ok(ChromiumSession {
            browser,
            page,
            handler_task,
            navigation_timeout: self.navigation_timeout,
        })
    }
}

/// A single tab in a dedicated Chromium process.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl ChromiumSession {
    async fn shutdown(mut browser: Browser, handler_task: JoinHandle<()>) {
        if let Err(e) = browser.close().await {
            tracing::debug!("Browser close failed: {e}");
        }
        if let Err(e) = browser.wait().await {
            tracing::debug!("Browser wait failed: {e}");
        }
        handler_task.abort();
    }
}

impl SearchSession for ChromiumSession {
    async fn open(&self, url: &str) -> Result<(), AppError> {
        let navigation = self.page.goto(url);
        match tokio::time::timeout(self.navigation_timeout, navigation).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AppError::BrowserError(format!(
                "Failed to navigate to {url}: {e}"
            ))),
            Err(_) => Err(AppError::Timeout(self.navigation_timeout.as_secs())),
        }
    }

    async fn count(&self, xpath: &str) -> Result<usize, AppError> {
        match self.page.find_xpaths(xpath).await {
            Ok(elements) => Ok(elements.len()),
            Err(e) => {
                tracing::debug!(%xpath, "XPath lookup failed: {e}");
                Ok(0)
            }
        }
    }

    async fn click(&self, xpath: &str) -> Result<(), AppError> {
        let element = self
            .page
            .find_xpath(xpath)
            .await
            .map_err(|_| AppError::ElementNotFound(xpath.to_string()))?;

        element
            .scroll_into_view()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to scroll to {xpath}: {e}")))?;
        // A DOM click still lands when an overlay covers the element.
        element
            .call_js_fn("function() { this.click(); }", false)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to click {xpath}: {e}")))?;
        Ok(())
    }

    async fn hrefs(&self, xpath: &str) -> Result<Vec<Option<String>>, AppError> {
        let elements = match self.page.find_xpaths(xpath).await {
            Ok(elements) => elements,
            Err(e) => {
                tracing::debug!(%xpath, "XPath lookup failed: {e}");
                return Ok(Vec::new());
            }
        };

        let mut hrefs = Vec::with_capacity(elements.len());
        for element in &elements {
            let href = element
                .attribute("href")
                .await
                .map_err(|e| AppError::BrowserError(format!("Failed to read href: {e}")))?;
            hrefs.push(href);
        }
        Ok(hrefs)
    }

    async fn close(self) {
        Self::shutdown(self.browser, self.handler_task).await;
        tracing::debug!("Browser session closed");
    }
}

/// Tries to locate the real Chrome/Chromium binary.
///
/// On systems where Chromium is installed via **snap**, the wrapper at
/// `/snap/bin/chromium` strips unknown CLI flags, breaking headless mode.
/// We look for the real binary inside the snap first, then fall back to
/// well-known system paths. If nothing is found we return `None` and let
/// `chromiumoxide` do its own lookup.
fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    [
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}

