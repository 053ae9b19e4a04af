pub mod fetcher;
pub mod job_api;
pub mod parser;

#[cfg(feature = "browser")]
pub mod browser;
#[cfg(feature = "browser")]
pub mod service;

pub use fetcher::ReqwestFetcher;
pub use job_api::HttpJobBackend;
pub use parser::MarkerArticleParser;

#[cfg(feature = "browser")]
pub use browser::{ChromiumLauncher, ChromiumSession};
#[cfg(feature = "browser")]
pub use service::{LiveWhisperService, live_service};
