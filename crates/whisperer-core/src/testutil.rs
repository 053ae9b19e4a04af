//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::inference::{BatchInputs, BatchOutputs, JobBackend, JobKind, JobResults, JobStatus};
use crate::models::Article;
use crate::search::{SearchConfig, SearchSession, SessionLauncher};
use crate::traits::{ArticleParser, Fetcher, InferenceClient, SearchResolver};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns queued responses and records requested URLs.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default HTML string.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    pub requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(html.to_string())])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body>default</body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockResolver
// ---------------------------------------------------------------------------

/// Mock search resolver returning canned URLs.
#[derive(Clone)]
pub struct MockResolver {
    result: Arc<Mutex<Option<Result<Vec<String>, AppError>>>>,
    pub calls: Arc<Mutex<Vec<(String, usize)>>>,
}

impl MockResolver {
    pub fn new(urls: Vec<&str>) -> Self {
        Self {
            result: Arc::new(Mutex::new(Some(Ok(urls
                .into_iter()
                .map(String::from)
                .collect())))),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            result: Arc::new(Mutex::new(Some(Err(error)))),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl SearchResolver for MockResolver {
    async fn resolve(&self, keyword: &str, n: usize) -> Result<Vec<String>, AppError> {
        self.calls.lock().unwrap().push((keyword.to_string(), n));
        match self.result.lock().unwrap().take() {
            Some(Ok(urls)) => Ok(urls.into_iter().take(n).collect()),
            Some(Err(e)) => Err(e),
            None => Ok(Vec::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockParser
// ---------------------------------------------------------------------------

/// Mock parser that returns queued articles.
#[derive(Clone)]
pub struct MockParser {
    responses: Arc<Mutex<Vec<Result<Article, AppError>>>>,
}

impl MockParser {
    pub fn new(articles: Vec<Article>) -> Self {
        Self::with_responses(articles.into_iter().map(Ok).collect())
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<Article, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
        }
    }
}

impl ArticleParser for MockParser {
    fn parse(&self, _html: &str) -> Result<Article, AppError> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(Article::new("default", "", "default body"))
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockInference
// ---------------------------------------------------------------------------

/// Recorded batch submission: (job kind name, inputs).
pub type BatchCall = (String, BatchInputs);

/// Mock inference client answering each call from a queue.
#[derive(Clone)]
pub struct MockInference {
    responses: Arc<Mutex<Vec<Result<BatchOutputs, AppError>>>>,
    pub calls: Arc<Mutex<Vec<BatchCall>>>,
}

impl MockInference {
    pub fn with_responses(responses: Vec<Result<BatchOutputs, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl InferenceClient for MockInference {
    async fn run_batch(
        &self,
        kind: &JobKind,
        inputs: &BatchInputs,
        _timeout: Duration,
    ) -> Result<BatchOutputs, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((kind.name.clone(), inputs.clone()));
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(BatchOutputs::default())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockJobBackend
// ---------------------------------------------------------------------------

/// Recorded job submission: (model id, inputs).
pub type SubmittedJob = (String, BatchInputs);

/// Mock job API whose status walks through a scripted sequence.
#[derive(Clone)]
pub struct MockJobBackend {
    /// Status replies; the last one repeats forever.
    statuses: Arc<Mutex<Vec<JobStatus>>>,
    results: Arc<Mutex<JobResults>>,
    artifact: Arc<Mutex<Vec<u8>>>,
    /// Errors returned, in order, before the scripted replies resume.
    status_errors: Arc<Mutex<Vec<AppError>>>,
    results_errors: Arc<Mutex<Vec<AppError>>>,
    artifact_errors: Arc<Mutex<Vec<AppError>>>,
    pub submitted: Arc<Mutex<Vec<SubmittedJob>>>,
    pub artifact_urls: Arc<Mutex<Vec<String>>>,
    pub status_calls: Arc<Mutex<usize>>,
}

impl MockJobBackend {
    fn with_statuses(statuses: Vec<JobStatus>) -> Self {
        Self {
            statuses: Arc::new(Mutex::new(statuses)),
            results: Arc::new(Mutex::new(JobResults::default())),
            artifact: Arc::new(Mutex::new(Vec::new())),
            status_errors: Arc::new(Mutex::new(Vec::new())),
            results_errors: Arc::new(Mutex::new(Vec::new())),
            artifact_errors: Arc::new(Mutex::new(Vec::new())),
            submitted: Arc::new(Mutex::new(Vec::new())),
            artifact_urls: Arc::new(Mutex::new(Vec::new())),
            status_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Reports `IN_PROGRESS` for `polls` status checks, then `COMPLETED`.
    pub fn completing_after(polls: usize) -> Self {
        let mut statuses = vec![JobStatus::InProgress; polls];
        statuses.push(JobStatus::Completed);
        Self::with_statuses(statuses)
    }

    pub fn ending_with(status: JobStatus) -> Self {
        Self::with_statuses(vec![status])
    }

    pub fn never_completing() -> Self {
        Self::with_statuses(vec![JobStatus::InProgress])
    }

    pub fn with_source(
        self,
        name: &str,
        files: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.results
            .lock()
            .unwrap()
            .sources
            .insert(name.to_string(), files);
        self
    }

    pub fn with_artifact(self, bytes: Vec<u8>) -> Self {
        *self.artifact.lock().unwrap() = bytes;
        self
    }

    pub fn with_status_errors(self, errors: Vec<AppError>) -> Self {
        *self.status_errors.lock().unwrap() = errors;
        self
    }

    pub fn with_results_errors(self, errors: Vec<AppError>) -> Self {
        *self.results_errors.lock().unwrap() = errors;
        self
    }

    pub fn with_artifact_errors(self, errors: Vec<AppError>) -> Self {
        *self.artifact_errors.lock().unwrap() = errors;
        self
    }
}

fn next_error(errors: &Mutex<Vec<AppError>>) -> Option<AppError> {
    let mut errors = errors.lock().unwrap();
    if errors.is_empty() {
        None
    } else {
        Some(errors.remove(0))
    }
}

impl JobBackend for MockJobBackend {
    async fn submit(&self, kind: &JobKind, inputs: &BatchInputs) -> Result<String, AppError> {
        self.submitted
            .lock()
            .unwrap()
            .push((kind.model_id.clone(), inputs.clone()));
        Ok("job-1".to_string())
    }

    async fn status(&self, _job_id: &str) -> Result<JobStatus, AppError> {
        *self.status_calls.lock().unwrap() += 1;
        if let Some(e) = next_error(&self.status_errors) {
            return Err(e);
        }
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            Ok(statuses.remove(0))
        } else {
            Ok(statuses.first().copied().unwrap_or(JobStatus::Completed))
        }
    }

    async fn results(&self, _job_id: &str) -> Result<JobResults, AppError> {
        if let Some(e) = next_error(&self.results_errors) {
            return Err(e);
        }
        Ok(self.results.lock().unwrap().clone())
    }

    async fn fetch_artifact(&self, url: &str) -> Result<Vec<u8>, AppError> {
        self.artifact_urls.lock().unwrap().push(url.to_string());
        if let Some(e) = next_error(&self.artifact_errors) {
            return Err(e);
        }
        Ok(self.artifact.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// MockLauncher / MockSession
// ---------------------------------------------------------------------------

/// Mock browser launcher whose sessions serve a canned search page.
#[derive(Clone)]
pub struct MockLauncher {
    anchors: Vec<Option<String>>,
    has_results_panel: bool,
    missing_xpath: Option<String>,
    launch_error: Arc<Mutex<Option<AppError>>>,
    pub opened: Arc<Mutex<Vec<String>>>,
    pub clicks: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<Mutex<usize>>,
}

impl MockLauncher {
    pub fn with_anchors(anchors: Vec<Option<String>>) -> Self {
        Self {
            anchors,
            has_results_panel: true,
            missing_xpath: None,
            launch_error: Arc::new(Mutex::new(None)),
            opened: Arc::new(Mutex::new(Vec::new())),
            clicks: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(Mutex::new(0)),
        }
    }

    pub fn without_results_panel() -> Self {
        Self {
            has_results_panel: false,
            ..Self::with_anchors(Vec::new())
        }
    }

    pub fn with_missing_element(mut self, xpath: &str) -> Self {
        self.missing_xpath = Some(xpath.to_string());
        self
    }

    pub fn with_launch_error(error: AppError) -> Self {
        let launcher = Self::with_anchors(Vec::new());
        *launcher.launch_error.lock().unwrap() = Some(error);
        launcher
    }
}

impl SessionLauncher for MockLauncher {
    type Session = MockSession;

    async fn launch(&self, _config: &SearchConfig) -> Result<MockSession, AppError> {
        if let Some(e) = self.launch_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(MockSession {
            launcher: self.clone(),
        })
    }
}

pub struct MockSession {
    launcher: MockLauncher,
}

impl SearchSession for MockSession {
    async fn open(&self, url: &str) -> Result<(), AppError> {
        self.launcher.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn count(&self, _xpath: &str) -> Result<usize, AppError> {
        Ok(usize::from(self.launcher.has_results_panel))
    }

    async fn click(&self, xpath: &str) -> Result<(), AppError> {
        if self.launcher.missing_xpath.as_deref() == Some(xpath) {
            return Err(AppError::ElementNotFound(xpath.to_string()));
        }
        self.launcher.clicks.lock().unwrap().push(xpath.to_string());
        Ok(())
    }

    async fn hrefs(&self, _xpath: &str) -> Result<Vec<Option<String>>, AppError> {
        Ok(self.launcher.anchors.clone())
    }

    async fn close(self) {
        *self.launcher.closed.lock().unwrap() += 1;
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Build text outputs keyed `"0"`, `"1"`, ... from the given summaries.
pub fn text_outputs(texts: &[&str]) -> BatchOutputs {
    let mut outputs = BatchOutputs::default();
    for (i, text) in texts.iter().enumerate() {
        outputs.push(i.to_string(), crate::inference::JobOutput::Text(text.to_string()));
    }
    outputs
}

/// Build audio outputs keyed `"0"`, `"1"`, ... from the given clips.
pub fn audio_outputs(clips: Vec<Vec<u8>>) -> BatchOutputs {
    let mut outputs = BatchOutputs::default();
    for (i, clip) in clips.into_iter().enumerate() {
        outputs.push(i.to_string(), crate::inference::JobOutput::Audio(clip));
    }
    outputs
}
