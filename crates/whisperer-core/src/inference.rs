//! Batched inference jobs against a remote, asynchronous job API.
//!
//! Summarization and text-to-speech share one runner: a [`JobKind`]
//! descriptor pins the model and says how to read each input's output.
//! The runner submits every input as one job, waits for the job to reach a
//! terminal state, then collects outputs by input name in submission order.
//! Transient failures of the read-only calls (status polls, results,
//! artifact downloads) are retried per [`RetryPolicy`]; submission is not,
//! since a repeated submit would start a second job.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::retry::{RetryPolicy, with_retries};
use crate::traits::InferenceClient;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_CALL_RETRIES: u32 = 3;

/// How to turn one input's raw result files into a [`JobOutput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputKind {
    /// A string field inside a JSON result file.
    JsonField { file: String, field: String },
    /// A result file whose value is a URL to a binary artifact that must be
    /// downloaded with an authenticated GET.
    Artifact { file: String },
}

/// A version-pinned model plus the recipe for reading its outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobKind {
    pub name: String,
    pub model_id: String,
    pub version: String,
    pub output: OutputKind,
}

impl JobKind {
    pub fn summarization() -> Self {
        Self {
            name: "summarization".to_string(),
            model_id: "rs2qqwbjwb".to_string(),
            version: "0.0.2".to_string(),
            output: OutputKind::JsonField {
                file: "results.json".to_string(),
                field: "summary".to_string(),
            },
        }
    }

    pub fn text_to_speech() -> Self {
        Self {
            name: "text-to-speech".to_string(),
            model_id: "uvdncymn6q".to_string(),
            version: "0.0.3".to_string(),
            output: OutputKind::Artifact {
                file: "results.wav".to_string(),
            },
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}@{})", self.name, self.model_id, self.version)
    }
}

/// Ordered, named text inputs for one batch job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchInputs {
    entries: Vec<(String, String)>,
}

impl BatchInputs {
    /// Names each text by its position: `"0"`, `"1"`, ...
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: texts
                .into_iter()
                .enumerate()
                .map(|(i, text)| (i.to_string(), text.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.entries.push((name.into(), text.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One input's processed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutput {
    Text(String),
    Audio(Vec<u8>),
}

impl JobOutput {
    pub fn into_text(self) -> Option<String> {
        match self {
            JobOutput::Text(s) => Some(s),
            JobOutput::Audio(_) => None,
        }
    }

    pub fn into_audio(self) -> Option<Vec<u8>> {
        match self {
            JobOutput::Audio(b) => Some(b),
            JobOutput::Text(_) => None,
        }
    }
}

/// Outputs of a completed job, keyed by input name in submission order.
///
/// Keys are always a subset of the submitted input names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutputs {
    entries: Vec<(String, JobOutput)>,
}

impl BatchOutputs {
    pub fn push(&mut self, name: impl Into<String>, output: JobOutput) {
        self.entries.push((name.into(), output));
    }

    pub fn get(&self, name: &str) -> Option<&JobOutput> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, output)| output)
    }

    /// Removes and returns the output stored under `name`.
    pub fn take(&mut self, name: &str) -> Option<JobOutput> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Remote job state as reported by the job API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Submitted,
    InProgress,
    Completed,
    Failed,
    Canceled,
    TimedOut,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Canceled => "CANCELED",
            JobStatus::TimedOut => "TIMEDOUT",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Canceled | JobStatus::TimedOut
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SUBMITTED" | "OPEN" | "PENDING" => Ok(JobStatus::Submitted),
            "IN_PROGRESS" | "RUNNING" => Ok(JobStatus::InProgress),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            "CANCELED" | "CANCELLED" => Ok(JobStatus::Canceled),
            "TIMEDOUT" | "TIMED_OUT" => Ok(JobStatus::TimedOut),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

/// Raw per-input result files of a completed job.
///
/// Each source maps result file names (e.g. `results.json`) to their values.
#[derive(Debug, Clone, Default)]
pub struct JobResults {
    pub sources: HashMap<String, serde_json::Map<String, serde_json::Value>>,
}

/// Transport to the remote job API.
pub trait JobBackend: Send + Sync + Clone {
    /// Submit all inputs as one job. Returns the job identifier.
    fn submit(
        &self,
        kind: &JobKind,
        inputs: &BatchInputs,
    ) -> impl Future<Output = Result<String, AppError>> + Send;

    fn status(&self, job_id: &str) -> impl Future<Output = Result<JobStatus, AppError>> + Send;

    fn results(&self, job_id: &str)
    -> impl Future<Output = Result<JobResults, AppError>> + Send;

    /// Authenticated download of a binary result artifact.
    fn fetch_artifact(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, AppError>> + Send;
}

/// [`InferenceClient`] that drives any [`JobBackend`] to a terminal state.
#[derive(Clone)]
pub struct BatchJobRunner<B> {
    backend: B,
    poll_interval: Duration,
    retry: RetryPolicy,
}

impl<B: JobBackend> BatchJobRunner<B> {
    /// Polls every 2 s and retries each read-only call up to 3 times.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry: RetryPolicy::new(DEFAULT_CALL_RETRIES).with_base_delay(Duration::from_secs(1)),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn wait_until_terminal(&self, job_id: &str) -> Result<JobStatus, AppError> {
        loop {
            let status =
                with_retries(&self.retry, "job status", || self.backend.status(job_id)).await?;
            if status.is_terminal() {
                return Ok(status);
            }
            tracing::debug!(%job_id, %status, "Job not finished yet");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn read_output(
        &self,
        kind: &JobKind,
        name: &str,
        files: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<JobOutput, AppError> {
        let missing = |file: &str| AppError::JobFailed {
            kind: kind.name.clone(),
            status: format!("COMPLETED without '{file}' for input {name}"),
        };

        match &kind.output {
            OutputKind::JsonField { file, field } => files
                .get(file)
                .and_then(|v| v.get(field))
                .and_then(|v| v.as_str())
                .map(|s| JobOutput::Text(s.to_string()))
                .ok_or_else(|| missing(&format!("{file}.{field}"))),
            OutputKind::Artifact { file } => {
                let url = files
                    .get(file)
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| missing(file))?;
                let bytes =
                    with_retries(&self.retry, url, || self.backend.fetch_artifact(url)).await?;
                tracing::debug!(input = %name, bytes = bytes.len(), "Downloaded artifact");
                Ok(JobOutput::Audio(bytes))
            }
        }
    }
}

impl<B: JobBackend> InferenceClient for BatchJobRunner<B> {
    async fn run_batch(
        &self,
        kind: &JobKind,
        inputs: &BatchInputs,
        timeout: Duration,
    ) -> Result<BatchOutputs, AppError> {
        tracing::info!("Running {} job with {} inputs ...", kind, inputs.len());
        let job_id = self.backend.submit(kind, inputs).await?;
        tracing::info!(%job_id, "Job submitted");

        let status = match tokio::time::timeout(timeout, self.wait_until_terminal(&job_id)).await
        {
            Ok(status) => status?,
            Err(_) => {
                tracing::warn!(%job_id, "Job did not finish within {}s", timeout.as_secs());
                return Err(AppError::JobFailed {
                    kind: kind.name.clone(),
                    status: format!("not finished after {}s", timeout.as_secs()),
                });
            }
        };

        if status != JobStatus::Completed {
            return Err(AppError::JobFailed {
                kind: kind.name.clone(),
                status: status.to_string(),
            });
        }

        let results =
            with_retries(&self.retry, "job results", || self.backend.results(&job_id)).await?;
        let mut outputs = BatchOutputs::default();
        for name in inputs.names() {
            match results.sources.get(name) {
                Some(files) => {
                    let output = self.read_output(kind, name, files).await?;
                    outputs.push(name, output);
                }
                None => tracing::warn!(%job_id, input = %name, "No output for input"),
            }
        }

        tracing::info!(
            %job_id,
            "{} job complete: {}/{} outputs",
            kind.name,
            outputs.len(),
            inputs.len()
        );
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockJobBackend;

    fn summary_files(summary: &str) -> serde_json::Map<String, serde_json::Value> {
        let mut files = serde_json::Map::new();
        files.insert(
            "results.json".to_string(),
            serde_json::json!({ "summary": summary }),
        );
        files
    }

    fn wav_files(url: &str) -> serde_json::Map<String, serde_json::Value> {
        let mut files = serde_json::Map::new();
        files.insert("results.wav".to_string(), serde_json::json!(url));
        files
    }

    fn runner(backend: MockJobBackend) -> BatchJobRunner<MockJobBackend> {
        BatchJobRunner::new(backend).with_poll_interval(Duration::from_millis(10))
    }

    #[test]
    fn test_inputs_named_by_position() {
        let inputs = BatchInputs::from_texts(["a", "b", "c"]);
        let names: Vec<_> = inputs.names().collect();
        assert_eq!(names, vec!["0", "1", "2"]);
        assert_eq!(inputs.iter().nth(1), Some(("1", "b")));
    }

    #[test]
    fn test_status_roundtrip_and_terminal() {
        for status in [
            JobStatus::Submitted,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Canceled,
            JobStatus::TimedOut,
        ] {
            let parsed: JobStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!(!JobStatus::Submitted.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::TimedOut.is_terminal());
        assert!("bogus".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_job_kind_descriptors() {
        let s = JobKind::summarization();
        assert_eq!((s.model_id.as_str(), s.version.as_str()), ("rs2qqwbjwb", "0.0.2"));
        let t = JobKind::text_to_speech();
        assert_eq!((t.model_id.as_str(), t.version.as_str()), ("uvdncymn6q", "0.0.3"));
        assert!(matches!(t.output, OutputKind::Artifact { .. }));
    }

    #[tokio::test]
    async fn completed_job_returns_all_outputs_in_submission_order() {
        let backend = MockJobBackend::completing_after(2)
            .with_source("2", summary_files("third"))
            .with_source("0", summary_files("first"))
            .with_source("1", summary_files("second"));

        let inputs = BatchInputs::from_texts(["a", "b", "c"]);
        let outputs = runner(backend.clone())
            .run_batch(&JobKind::summarization(), &inputs, Duration::from_secs(5))
            .await
            .unwrap();

        let names: Vec<_> = outputs.names().collect();
        assert_eq!(names, vec!["0", "1", "2"]);
        assert_eq!(outputs.get("0"), Some(&JobOutput::Text("first".into())));
        assert_eq!(outputs.get("2"), Some(&JobOutput::Text("third".into())));

        let submitted = backend.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1, "all inputs go out as a single job");
        assert_eq!(submitted[0].0, "rs2qqwbjwb");
        assert_eq!(submitted[0].1.len(), 3);
    }

    #[tokio::test]
    async fn missing_source_is_left_out_of_outputs() {
        let backend = MockJobBackend::completing_after(0)
            .with_source("0", summary_files("first"))
            .with_source("2", summary_files("third"));

        let inputs = BatchInputs::from_texts(["a", "b", "c"]);
        let outputs = runner(backend)
            .run_batch(&JobKind::summarization(), &inputs, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(outputs.len(), 2);
        assert!(outputs.get("1").is_none());
    }

    #[tokio::test]
    async fn speech_outputs_are_downloaded() {
        let backend = MockJobBackend::completing_after(1)
            .with_source("0", wav_files("https://api.test/results/job/0.wav"))
            .with_artifact(vec![7u8; 1024]);

        let inputs = BatchInputs::from_texts(["Title: T Date: P Summary: S"]);
        let outputs = runner(backend.clone())
            .run_batch(&JobKind::text_to_speech(), &inputs, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(outputs.get("0"), Some(&JobOutput::Audio(vec![7u8; 1024])));
        assert_eq!(
            backend.artifact_urls.lock().unwrap().as_slice(),
            ["https://api.test/results/job/0.wav".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_job_reports_terminal_status() {
        let backend = MockJobBackend::ending_with(JobStatus::Failed)
            .with_source("0", summary_files("ignored"));

        let err = runner(backend)
            .run_batch(
                &JobKind::summarization(),
                &BatchInputs::from_texts(["a"]),
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();

        match err {
            AppError::JobFailed { kind, status } => {
                assert_eq!(kind, "summarization");
                assert_eq!(status, "FAILED");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn job_that_never_finishes_times_out() {
        let backend = MockJobBackend::never_completing();

        let err = runner(backend)
            .run_batch(
                &JobKind::text_to_speech(),
                &BatchInputs::from_texts(["a"]),
                Duration::from_secs(30),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::JobFailed { ref kind, .. } if kind == "text-to-speech"));
    }

    #[tokio::test]
    async fn completed_without_expected_field_fails() {
        let mut files = serde_json::Map::new();
        files.insert("results.json".to_string(), serde_json::json!({"other": 1}));
        let backend = MockJobBackend::completing_after(0).with_source("0", files);

        let err = runner(backend)
            .run_batch(
                &JobKind::summarization(),
                &BatchInputs::from_texts(["a"]),
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::JobFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_status_error_does_not_abort_job() {
        let backend = MockJobBackend::completing_after(2)
            .with_status_errors(vec![
                AppError::JobApi {
                    status: 503,
                    url: "https://api.test/jobs/job-1".into(),
                },
                AppError::NetworkError("connection reset".into()),
            ])
            .with_source("0", summary_files("first"));

        let outputs = runner(backend)
            .run_batch(
                &JobKind::summarization(),
                &BatchInputs::from_texts(["a"]),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        assert_eq!(outputs.get("0"), Some(&JobOutput::Text("first".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_results_and_artifact_errors_are_retried() {
        let backend = MockJobBackend::completing_after(0)
            .with_results_errors(vec![AppError::Timeout(120)])
            .with_artifact_errors(vec![AppError::JobApi {
                status: 502,
                url: "https://api.test/results/job/0.wav".into(),
            }])
            .with_source("0", wav_files("https://api.test/results/job/0.wav"))
            .with_artifact(b"RIFF".to_vec());

        let outputs = runner(backend.clone())
            .run_batch(
                &JobKind::text_to_speech(),
                &BatchInputs::from_texts(["a"]),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        assert_eq!(outputs.get("0"), Some(&JobOutput::Audio(b"RIFF".to_vec())));
        assert_eq!(backend.artifact_urls.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_transient_errors_give_up_after_policy() {
        let backend = MockJobBackend::completing_after(0).with_status_errors(
            (0..3)
                .map(|_| AppError::NetworkError("connection reset".into()))
                .collect(),
        );

        let err = runner(backend.clone())
            .with_retry_policy(RetryPolicy::new(2))
            .run_batch(
                &JobKind::summarization(),
                &BatchInputs::from_texts(["a"]),
                Duration::from_secs(60),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NetworkError(_)));
        assert_eq!(*backend.status_calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn permanent_status_error_is_not_retried() {
        let backend = MockJobBackend::completing_after(0).with_status_errors(vec![
            AppError::JobApi {
                status: 401,
                url: "https://api.test/jobs/job-1".into(),
            },
        ]);

        let err = runner(backend.clone())
            .run_batch(
                &JobKind::summarization(),
                &BatchInputs::from_texts(["a"]),
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::JobApi { status: 401, .. }));
        assert_eq!(*backend.status_calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_outputs_take() {
        let mut outputs = BatchOutputs::default();
        outputs.push("0", JobOutput::Text("x".into()));
        assert_eq!(outputs.take("0").and_then(JobOutput::into_text), Some("x".into()));
        assert!(outputs.take("0").is_none());
        assert!(outputs.is_empty());
    }
}
