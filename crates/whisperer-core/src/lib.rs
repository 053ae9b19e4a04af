pub mod config;
pub mod content;
pub mod error;
pub mod inference;
pub mod models;
pub mod pipeline;
pub mod query;
pub mod retry;
pub mod search;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::WhisperConfig;
pub use content::ContentFetcher;
pub use error::AppError;
pub use inference::{BatchInputs, BatchJobRunner, BatchOutputs, JobBackend, JobKind, JobOutput};
pub use models::{Article, ArticleMarkers, WhisperResult, compute_hash};
pub use pipeline::WhisperService;
pub use query::Query;
pub use search::{BrowserSearchResolver, SearchConfig, SearchSession, SessionLauncher};
pub use traits::{ArticleParser, Fetcher, InferenceClient, Pipeline, SearchResolver};
