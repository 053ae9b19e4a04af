use std::time::Duration;

use crate::content::ContentFetcher;
use crate::error::AppError;
use crate::inference::{BatchInputs, BatchOutputs, JobKind, JobOutput};
use crate::models::{Article, WhisperResult};
use crate::query::Query;
use crate::traits::{ArticleParser, Fetcher, InferenceClient, Pipeline, SearchResolver};

/// Default upper bound on each inference job's wait.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(3600);

/// Orchestrates the full pipeline: fetch → parse → summarize → speak → assemble.
///
/// Generic over all external dependencies via traits, enabling dependency injection
/// and testability without real HTTP, browser, or inference calls. Each stage
/// consumes the complete output of the previous one, and article order is
/// preserved end-to-end.
#[derive(Clone)]
pub struct WhisperService<F, R, P, I> {
    content: ContentFetcher<F, R>,
    parser: P,
    inference: I,
    summarization: JobKind,
    speech: JobKind,
    job_timeout: Duration,
}

impl<F, R, P, I> WhisperService<F, R, P, I>
where
    F: Fetcher,
    R: SearchResolver,
    P: ArticleParser,
    I: InferenceClient,
{
    pub fn new(content: ContentFetcher<F, R>, parser: P, inference: I) -> Self {
        Self {
            content,
            parser,
            inference,
            summarization: JobKind::summarization(),
            speech: JobKind::text_to_speech(),
            job_timeout: DEFAULT_JOB_TIMEOUT,
        }
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Override the model descriptors, e.g. to pin newer model versions.
    pub fn with_job_kinds(mut self, summarization: JobKind, speech: JobKind) -> Self {
        self.summarization = summarization;
        self.speech = speech;
        self
    }

    /// Stage 1: resolve the query and parse every document into an [`Article`].
    pub async fn extract_articles(&self, query: &str) -> Result<Vec<Article>, AppError> {
        let query = Query::classify(query);
        let documents = self.content.fetch(&query).await?;
        documents
            .iter()
            .map(|html| self.parser.parse(html))
            .collect()
    }

    /// Stage 2: summarize every article body, one summary per article.
    pub async fn summarize(&self, articles: &[Article]) -> Result<Vec<String>, AppError> {
        let inputs = BatchInputs::from_texts(articles.iter().map(|a| a.body.as_str()));
        let outputs = self
            .inference
            .run_batch(&self.summarization, &inputs, self.job_timeout)
            .await?;

        ordered_outputs(&self.summarization.name, outputs, articles.len())?
            .into_iter()
            .map(|output| {
                output.into_text().ok_or_else(|| AppError::JobFailed {
                    kind: self.summarization.name.clone(),
                    status: "COMPLETED with non-text output".to_string(),
                })
            })
            .collect()
    }

    /// Stage 3: synthesize speech for every script, one clip per script.
    pub async fn synthesize(&self, scripts: &[String]) -> Result<Vec<Vec<u8>>, AppError> {
        let inputs = BatchInputs::from_texts(scripts.iter().map(String::as_str));
        let outputs = self
            .inference
            .run_batch(&self.speech, &inputs, self.job_timeout)
            .await?;

        ordered_outputs(&self.speech.name, outputs, scripts.len())?
            .into_iter()
            .map(|output| {
                output.into_audio().ok_or_else(|| AppError::JobFailed {
                    kind: self.speech.name.clone(),
                    status: "COMPLETED with non-audio output".to_string(),
                })
            })
            .collect()
    }
}

impl<F, R, P, I> Pipeline for WhisperService<F, R, P, I>
where
    F: Fetcher,
    R: SearchResolver,
    P: ArticleParser,
    I: InferenceClient,
{
    async fn whisper(&self, query: &str) -> Result<Vec<WhisperResult>, AppError> {
        // 1. Fetch + parse
        tracing::info!(%query, "Extracting articles");
        let articles = self.extract_articles(query).await?;
        tracing::info!("Extracted {} articles", articles.len());

        // 2. Summarize
        let summaries = self.summarize(&articles).await?;

        // 3. Fuse metadata into the text that gets spoken
        let scripts: Vec<String> = articles
            .iter()
            .zip(&summaries)
            .map(|(article, summary)| article.speech_script(summary))
            .collect();

        // 4. Speak
        let speeches = self.synthesize(&scripts).await?;

        // 5. Assemble by shared position
        let results: Vec<WhisperResult> = articles
            .into_iter()
            .zip(summaries)
            .zip(speeches)
            .map(|((article, summary), speech)| WhisperResult {
                title: article.title,
                published: article.published,
                summary,
                speech,
            })
            .collect();

        tracing::info!(count = results.len(), "Whisper complete");
        Ok(results)
    }
}

/// Pull outputs `"0"..expected` out by name. Any missing name is fatal:
/// results are never truncated or shifted.
fn ordered_outputs(
    stage: &str,
    mut outputs: BatchOutputs,
    expected: usize,
) -> Result<Vec<JobOutput>, AppError> {
    let assembly_error = |actual: usize| AppError::Assembly {
        stage: stage.to_string(),
        expected,
        actual,
    };

    if outputs.len() != expected {
        return Err(assembly_error(outputs.len()));
    }
    let actual = outputs.len();
    (0..expected)
        .map(|i| {
            outputs
                .take(&i.to_string())
                .ok_or_else(|| assembly_error(actual))
        })
        .collect()
}
