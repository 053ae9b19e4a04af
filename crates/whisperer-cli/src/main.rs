use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use whisperer_client::live_service;
use whisperer_core::config::{DEFAULT_API_BASE_URL, DEFAULT_SITE_URL};
use whisperer_core::{AppError, Pipeline, SearchConfig, WhisperConfig, WhisperResult};

#[derive(Parser)]
#[command(
    name = "whisperer",
    version,
    about = "Summarize crypto news and read it aloud"
)]
struct Cli {
    /// Article URL, or a keyword to search for
    query: String,

    /// Directory the WAV files are written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Inference API key (reads from WHISPERER_API_KEY env var if not provided)
    #[arg(short, long, env = "WHISPERER_API_KEY")]
    api_key: String,

    /// Inference job API base URL
    #[arg(
        short,
        long,
        env = "WHISPERER_API_BASE_URL",
        default_value = DEFAULT_API_BASE_URL
    )]
    base_url: String,

    /// Upper bound on each inference job, in seconds
    #[arg(long, env = "WHISPERER_JOB_TIMEOUT_SECS", default_value_t = 3600)]
    job_timeout: u64,

    /// News site searched for keyword queries
    #[arg(long, env = "WHISPERER_SITE_URL", default_value = DEFAULT_SITE_URL)]
    site_url: String,

    /// Number of articles resolved for a keyword query
    #[arg(
        short = 'n',
        long,
        env = "WHISPERER_MAX_RESULTS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    max_results: u64,

    /// Retries for transient article download failures
    #[arg(long, env = "WHISPERER_FETCH_RETRIES", default_value_t = 0)]
    retries: u32,

    /// Show the browser window during keyword search
    #[arg(long, default_value_t = false)]
    headful: bool,
}

impl Cli {
    fn config(&self) -> WhisperConfig {
        WhisperConfig {
            api_key: self.api_key.clone(),
            api_base_url: self.base_url.clone(),
            job_timeout: Duration::from_secs(self.job_timeout),
            site_url: self.site_url.clone(),
            max_results: self.max_results as usize,
            fetch_retries: self.retries,
        }
    }
}

/// One line of the printed report.
#[derive(Debug, Serialize, PartialEq)]
struct ReportEntry {
    title: String,
    published: String,
    published_at: Option<DateTime<Utc>>,
    summary: String,
    speech_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("whisperer=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let search = SearchConfig::default().with_headless(!cli.headful);
    let service =
        live_service(&cli.config(), search, false).context("Failed to set up the pipeline")?;

    let results = match service.whisper(&cli.query).await {
        Ok(results) => results,
        Err(e) => return Ok(report_failure(&e)),
    };

    let report = write_speech_files(&results, &cli.out_dir)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(ExitCode::SUCCESS)
}

fn report_failure(err: &AppError) -> ExitCode {
    tracing::debug!("Pipeline failed: {err:?}");
    eprintln!("{}", err.user_message());
    ExitCode::from(failure_status(err))
}

/// 2 for input the user can correct, 1 for everything else.
fn failure_status(err: &AppError) -> u8 {
    if err.is_bad_input() { 2 } else { 1 }
}

/// Write each speech clip to `<out_dir>/<n>.wav` (1-based, in result order)
/// and build the report.
fn write_speech_files(results: &[WhisperResult], out_dir: &Path) -> Result<Vec<ReportEntry>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let path = out_dir.join(format!("{}.wav", i + 1));
            std::fs::write(&path, &result.speech)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(bytes = result.speech.len(), "Wrote {}", path.display());

            Ok(ReportEntry {
                title: result.title.clone(),
                published: result.published.clone(),
                published_at: result.published_at(),
                summary: result.summary.clone(),
                speech_file: path,
            })
        })
        .collect()
}
