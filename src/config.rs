//! Engine configuration
//!
//! Configuration is static at startup: the CLI (or env) builds one
//! `EngineConfig`, it is validated once, and nothing mutates it afterwards.

use std::time::Duration;

use crate::payload::SamplingMode;
use crate::retry::RetryPolicy;

/// Everything the engine needs to run against one target
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Target endpoint URL for submissions and bootstraps
    pub endpoint: String,

    /// Origin used for the cosmetic Origin/Referer headers
    pub origin: String,

    /// Number of concurrent worker tasks
    pub concurrency: usize,

    /// Number of session slots in the pool
    pub sessions: usize,

    /// Allowed payload lengths (words per submission)
    pub length_classes: Vec<usize>,

    /// Whether words within one payload may repeat
    pub sampling_mode: SamplingMode,

    /// Submission-type codes and their selection weights
    pub type_weights: Vec<(u32, f64)>,

    /// Submission-type code used for session bootstrap posts
    pub bootstrap_code: u32,

    /// HTTP status the target uses to signal active blocking
    pub blocked_status: u16,

    /// Probability a worker rotates its session after a completed sequence
    pub rotate_probability: f64,

    /// Lower bound of the pacing sleep between sequences
    pub pacing_min: Duration,

    /// Upper bound of the pacing sleep between sequences
    pub pacing_max: Duration,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// How often the orchestrator logs a stats summary
    pub report_interval: Duration,

    /// Retry behavior for blocked responses and transport failures
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            origin: String::new(),
            concurrency: 20,
            sessions: 8,
            length_classes: vec![12, 24],
            sampling_mode: SamplingMode::Unique,
            type_weights: vec![(2, 1.0), (3, 1.0), (5, 1.0)],
            bootstrap_code: 1,
            blocked_status: 403,
            rotate_probability: 0.1,
            pacing_min: Duration::from_millis(200),
            pacing_max: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
            report_interval: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration
    ///
    /// Called once before the orchestrator spawns anything; a valid config
    /// cannot later make a worker fail at payload-build time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.sessions == 0 {
            return Err(ConfigError::Invalid("session count must be at least 1".into()));
        }
        if self.length_classes.is_empty() {
            return Err(ConfigError::Invalid("at least one length class is required".into()));
        }
        if self.length_classes.iter().any(|&l| l == 0) {
            return Err(ConfigError::Invalid("length classes must be positive".into()));
        }
        if self.type_weights.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one submission-type weight is required".into(),
            ));
        }
        if self.type_weights.iter().any(|(_, w)| *w < 0.0) {
            return Err(ConfigError::Invalid("weights must be non-negative".into()));
        }
        if !self.type_weights.iter().any(|(_, w)| *w > 0.0) {
            return Err(ConfigError::Invalid("at least one weight must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.rotate_probability) {
            return Err(ConfigError::Invalid(
                "rotate probability must be within [0, 1]".into(),
            ));
        }
        if self.pacing_max < self.pacing_min {
            return Err(ConfigError::Invalid(
                "pacing upper bound must not be below the lower bound".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("max attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// Parse a weight table such as `"2:1,3:1,5:2"`
    pub fn parse_type_weights(spec: &str) -> Result<Vec<(u32, f64)>, ConfigError> {
        spec.split(',')
            .map(|pair| {
                let (code, weight) = pair
                    .split_once(':')
                    .ok_or_else(|| ConfigError::Invalid(format!("bad weight entry: {pair}")))?;
                let code = code
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| ConfigError::Invalid(format!("bad type code: {code}")))?;
                let weight = weight
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ConfigError::Invalid(format!("bad weight: {weight}")))?;
                Ok((code, weight))
            })
            .collect()
    }

    /// Parse a length-class list such as `"12,18,24"`
    pub fn parse_length_classes(spec: &str) -> Result<Vec<usize>, ConfigError> {
        spec.split(',')
            .map(|part| {
                part.trim()
                    .parse::<usize>()
                    .map_err(|_| ConfigError::Invalid(format!("bad length class: {part}")))
            })
            .collect()
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No endpoint URL was provided
    #[error("no target endpoint configured")]
    MissingEndpoint,

    /// A value failed validation
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
