/// Smoke-test for `ChromiumLauncher`.
///
/// Launches a headless Chromium, runs a keyword search on CoinDesk sorted by
/// newest, and prints the resolved article URLs.
///
/// Run with:
///   cargo run -p whisperer-client --example search_smoke -- bitcoin
use whisperer_client::ChromiumLauncher;
use whisperer_core::{BrowserSearchResolver, SearchConfig, SearchResolver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let keyword = std::env::args().nth(1).unwrap_or_else(|| "bitcoin".to_string());
    let resolver = BrowserSearchResolver::new(ChromiumLauncher::new(), SearchConfig::default());

    println!("Searching for {keyword:?}…");
    let urls = resolver.resolve(&keyword, 3).await?;

    assert!(urls.len() <= 3, "Resolver returned {} URLs", urls.len());
    for url in &urls {
        assert!(url.starts_with("http"), "Unexpected href {url}");
        println!("{url}");
    }
    println!("OK, got {} result(s)", urls.len());
    Ok(())
}
