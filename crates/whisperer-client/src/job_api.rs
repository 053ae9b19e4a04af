use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use whisperer_core::config::DEFAULT_API_BASE_URL;
use whisperer_core::error::AppError;
use whisperer_core::inference::{BatchInputs, JobBackend, JobKind, JobResults, JobStatus};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const INPUT_FILE: &str = "input.txt";

/// REST client for the asynchronous model job API.
///
/// Authenticates every call, artifact downloads included, with
/// `Authorization: ApiKey <key>`. A non-2xx reply is [`AppError::JobApi`].
#[derive(Clone)]
pub struct HttpJobBackend {
    client: Client,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
}

impl HttpJobBackend {
    pub fn new(api_key: &str) -> Result<Self, AppError> {
        Self::with_base_url(api_key, DEFAULT_API_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, AppError> {
        Self::build(api_key, base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(self, timeout: Duration) -> Result<Self, AppError> {
        Self::build(&self.api_key, &self.base_url, timeout)
    }

    fn build(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Accept", "application/json")
            .header("Authorization", format!("ApiKey {}", self.api_key))
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, AppError> {
        let response = self.authorized(request).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%url, status = status.as_u16(), %body, "Job API request failed");
            return Err(AppError::JobApi {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, AppError> {
        self.send(self.client.get(url), url)
            .await?
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse job API response: {e}")))
    }
}

// ---- Job API types ----

#[derive(Serialize)]
struct SubmitRequest<'a> {
    model: ModelRef<'a>,
    input: TextInput<'a>,
}

#[derive(Serialize)]
struct ModelRef<'a> {
    identifier: &'a str,
    version: &'a str,
}

#[derive(Serialize)]
struct TextInput<'a> {
    #[serde(rename = "type")]
    input_type: &'static str,
    sources: HashMap<&'a str, HashMap<&'static str, &'a str>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    job_identifier: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Deserialize)]
struct ResultsResponse {
    #[serde(default)]
    results: HashMap<String, serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    failures: HashMap<String, serde_json::Value>,
}

fn submit_body<'a>(kind: &'a JobKind, inputs: &'a BatchInputs) -> SubmitRequest<'a> {
    SubmitRequest {
        model: ModelRef {
            identifier: &kind.model_id,
            version: &kind.version,
        },
        input: TextInput {
            input_type: "text",
            sources: inputs
                .iter()
                .map(|(name, text)| (name, HashMap::from([(INPUT_FILE, text)])))
                .collect(),
        },
    }
}

impl JobBackend for HttpJobBackend {
    async fn submit(&self, kind: &JobKind, inputs: &BatchInputs) -> Result<String, AppError> {
        let url = format!("{}/jobs", self.base_url);
        let body = submit_body(kind, inputs);
        let response: SubmitResponse = self
            .send(self.client.post(&url).json(&body), &url)
            .await?
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse job handle: {e}")))?;
        Ok(response.job_identifier)
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus, AppError> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);
        let response: StatusResponse = self.get_json(&url).await?;
        response
            .status
            .parse()
            .map_err(|e: String| AppError::HttpError(format!("Job {job_id}: {e}")))
    }

    async fn results(&self, job_id: &str) -> Result<JobResults, AppError> {
        let url = format!("{}/results/{}", self.base_url, job_id);
        let response: ResultsResponse = self.get_json(&url).await?;
        for (name, reason) in &response.failures {
            tracing::warn!(%job_id, input = %name, %reason, "Input failed");
        }
        Ok(JobResults {
            sources: response.results,
        })
    }

    async fn fetch_artifact(&self, url: &str) -> Result<Vec<u8>, AppError> {
        let response = self.send(self.client.get(url), url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read artifact body: {e}")))?;
        Ok(bytes.to_vec())
    }
}
