//! CLI argument parsing and run wiring

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::EngineConfig;
use crate::orchestrator::OrchestratorBuilder;
use crate::payload::SamplingMode;
use crate::retry::{BackoffStrategy, RetryPolicy};
use crate::vocab::Vocabulary;

/// Flood one endpoint with disguised decoy submissions
#[derive(Parser, Debug)]
#[command(name = "chaff")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Target endpoint URL for submissions
    #[arg(short, long, env = "CHAFF_ENDPOINT")]
    pub endpoint: String,

    /// Origin for the Origin/Referer headers (defaults to the endpoint's origin)
    #[arg(long, env = "CHAFF_ORIGIN")]
    pub origin: Option<String>,

    /// Path to a line-delimited word list file
    #[arg(short, long, conflicts_with = "wordlist_url")]
    pub wordlist: Option<PathBuf>,

    /// URL returning the word list as a JSON array
    #[arg(long, env = "CHAFF_WORDLIST_URL", conflicts_with = "wordlist")]
    pub wordlist_url: Option<String>,

    /// Number of concurrent workers
    #[arg(short, long, default_value = "20")]
    pub concurrency: usize,

    /// Number of session identities to rotate through
    #[arg(short, long, default_value = "8")]
    pub sessions: usize,

    /// Allowed payload lengths, comma separated (e.g. "12,18,24")
    #[arg(long, default_value = "12,24")]
    pub length_classes: String,

    /// Word sampling within one payload: "unique" or "repeat"
    #[arg(long, default_value = "unique")]
    pub sampling: String,

    /// Submission-type weight table (e.g. "2:1,3:1,5:2")
    #[arg(long, default_value = "2:1,3:1,5:1")]
    pub type_weights: String,

    /// Submission-type code used for session bootstrap posts
    #[arg(long, default_value = "1")]
    pub bootstrap_code: u32,

    /// HTTP status the target uses to signal blocking
    #[arg(long, default_value = "403")]
    pub blocked_status: u16,

    /// Maximum attempts per submission
    #[arg(long, default_value = "3")]
    pub max_attempts: u32,

    /// Base backoff delay in milliseconds
    #[arg(long, default_value = "1000")]
    pub backoff_base_ms: u64,

    /// Backoff cap in seconds
    #[arg(long, default_value = "60")]
    pub backoff_cap_secs: u64,

    /// Use a fixed backoff window instead of exponential growth
    #[arg(long)]
    pub fixed_backoff: bool,

    /// Minimum pause between submissions, in milliseconds
    #[arg(long, default_value = "200")]
    pub pacing_min_ms: u64,

    /// Maximum pause between submissions, in milliseconds
    #[arg(long, default_value = "500")]
    pub pacing_max_ms: u64,

    /// Probability of rotating a session after each submission
    #[arg(long, default_value = "0.1")]
    pub rotate_probability: f64,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    pub request_timeout_secs: u64,

    /// Seconds between progress summaries
    #[arg(long, default_value = "10")]
    pub report_interval_secs: u64,

    /// Stop after this many seconds instead of running until Ctrl+C
    #[arg(long)]
    pub duration_secs: Option<u64>,
}

impl Cli {
    /// Build the engine configuration from the parsed arguments.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let sampling_mode = match self.sampling.as_str() {
            "unique" => SamplingMode::Unique,
            "repeat" => SamplingMode::Repeat,
            other => anyhow::bail!("unknown sampling mode: {other} (expected unique|repeat)"),
        };

        let strategy = if self.fixed_backoff {
            BackoffStrategy::FixedWindow {
                min: Duration::from_millis(self.backoff_base_ms),
                max: Duration::from_millis(self.backoff_base_ms * 2),
            }
        } else {
            BackoffStrategy::Exponential {
                base: Duration::from_millis(self.backoff_base_ms),
                cap: Duration::from_secs(self.backoff_cap_secs),
            }
        };

        let config = EngineConfig {
            endpoint: self.endpoint.clone(),
            origin: self
                .origin
                .clone()
                .unwrap_or_else(|| origin_of(&self.endpoint)),
            concurrency: self.concurrency,
            sessions: self.sessions,
            length_classes: EngineConfig::parse_length_classes(&self.length_classes)?,
            sampling_mode,
            type_weights: EngineConfig::parse_type_weights(&self.type_weights)?,
            bootstrap_code: self.bootstrap_code,
            blocked_status: self.blocked_status,
            rotate_probability: self.rotate_probability,
            pacing_min: Duration::from_millis(self.pacing_min_ms),
            pacing_max: Duration::from_millis(self.pacing_max_ms),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            report_interval: Duration::from_secs(self.report_interval_secs),
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                strategy,
                jitter: !self.fixed_backoff,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Load the word list, run the engine, and print the final summary.
    pub async fn run(&self) -> Result<()> {
        let config = self.engine_config()?;

        let vocab = if let Some(ref path) = self.wordlist {
            Vocabulary::from_file(path)
                .with_context(|| format!("failed to load word list from {}", path.display()))?
        } else if let Some(ref url) = self.wordlist_url {
            let client = reqwest::Client::builder()
                .danger_accept_invalid_certs(true)
                .build()?;
            Vocabulary::fetch(&client, url)
                .await
                .with_context(|| format!("failed to fetch word list from {url}"))?
        } else {
            anyhow::bail!("either --wordlist or --wordlist-url is required");
        };
        tracing::info!(words = vocab.len(), "vocabulary loaded");

        let orchestrator = OrchestratorBuilder::new(config)
            .vocabulary(Arc::new(vocab))
            .build()
            .await?;

        let snapshot = match self.duration_secs {
            Some(secs) => orchestrator.run_for(Duration::from_secs(secs)).await?,
            None => orchestrator.run_until_shutdown().await?,
        };

        println!();
        println!("{}", "=".repeat(50));
        println!("  Runtime:        {:.1}s", snapshot.runtime.as_secs_f64());
        println!("  Total sent:     {}", snapshot.sent);
        println!("  Succeeded:      {}", snapshot.succeeded);
        println!("  Errored:        {}", snapshot.errored);
        println!("  Success rate:   {:.2}%", snapshot.success_rate());
        if let Some(last) = snapshot.last_success {
            println!("  Last success:   {}", last.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        println!("{}", "=".repeat(50));

        Ok(())
    }
}

/// Derive an Origin value ("scheme://host") from the endpoint URL.
fn origin_of(endpoint: &str) -> String {
    endpoint
        .find("://")
        .and_then(|scheme_end| {
            endpoint[scheme_end + 3..]
                .find('/')
                .map(|path_start| endpoint[..scheme_end + 3 + path_start].to_string())
        })
        .unwrap_or_else(|| endpoint.to_string())
}
