//! Operator configuration.
//!
//! Layered: defaults, then a TOML or JSON file, then `RESUME_OPERATOR_*`
//! environment variables, then command-line flags.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use resume_reconciler::{Backoff, ControllerConfig, ReconcilerConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

pub const ENV_PREFIX: &str = "RESUME_OPERATOR_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::invalid("log_format", format!("'{s}' is not text or json"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_delay_ms: u64,
    pub max_delay_secs: u64,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            max_delay_secs: 300,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Workers per controller.
    pub workers: usize,
    /// Delay used when dependencies or children are not ready yet.
    pub requeue_interval_secs: u64,
    pub status_retries: u32,
    pub field_manager_prefix: String,
    pub log_format: LogFormat,
    pub backoff: BackoffConfig,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            requeue_interval_secs: 5,
            status_retries: 5,
            field_manager_prefix: "resume-operator".to_string(),
            log_format: LogFormat::Text,
            backoff: BackoffConfig::default(),
        }
    }
}

impl OperatorConfig {
    /// Load configuration from a file: JSON for `.json`, TOML otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::parse(path, e))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::parse(path, e))
        }
    }

    /// Apply `RESUME_OPERATOR_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable does not parse.
    pub fn from_env(self) -> ConfigResult<Self> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides looked up by full variable name, e.g.
    /// `RESUME_OPERATOR_WORKERS` or `RESUME_OPERATOR_BACKOFF_JITTER`.
    ///
    /// # Errors
    ///
    /// Returns an error if a present value does not parse.
    pub fn with_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            let var = format!("{ENV_PREFIX}{name}");
            lookup(&var).map(|value| (var, value))
        };

        if let Some((var, value)) = get("WORKERS") {
            self.workers = parse_var(&var, &value)?;
        }
        if let Some((var, value)) = get("REQUEUE_INTERVAL_SECS") {
            self.requeue_interval_secs = parse_var(&var, &value)?;
        }
        if let Some((var, value)) = get("STATUS_RETRIES") {
            self.status_retries = parse_var(&var, &value)?;
        }
        if let Some((_, value)) = get("FIELD_MANAGER_PREFIX") {
            self.field_manager_prefix = value;
        }
        if let Some((var, value)) = get("LOG_FORMAT") {
            self.log_format = parse_var(&var, &value)?;
        }
        if let Some((var, value)) = get("BACKOFF_INITIAL_DELAY_MS") {
            self.backoff.initial_delay_ms = parse_var(&var, &value)?;
        }
        if let Some((var, value)) = get("BACKOFF_MAX_DELAY_SECS") {
            self.backoff.max_delay_secs = parse_var(&var, &value)?;
        }
        if let Some((var, value)) = get("BACKOFF_MULTIPLIER") {
            self.backoff.multiplier = parse_var(&var, &value)?;
        }
        if let Some((var, value)) = get("BACKOFF_JITTER") {
            self.backoff.jitter = parse_var(&var, &value)?;
        }
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(self) -> ConfigResult<Self> {
        if self.workers == 0 {
            return Err(ConfigError::invalid("workers", "must be at least 1"));
        }
        if self.requeue_interval_secs == 0 {
            return Err(ConfigError::invalid("requeue_interval_secs", "must be at least 1"));
        }
        if self.field_manager_prefix.trim().is_empty() {
            return Err(ConfigError::invalid("field_manager_prefix", "must not be empty"));
        }
        if !self.backoff.multiplier.is_finite() || self.backoff.multiplier < 1.0 {
            return Err(ConfigError::invalid("backoff.multiplier", "must be a number >= 1.0"));
        }
        if Duration::from_millis(self.backoff.initial_delay_ms) > self.max_delay() {
            return Err(ConfigError::invalid(
                "backoff.initial_delay_ms",
                "must not exceed backoff.max_delay_secs",
            ));
        }
        Ok(self)
    }

    const fn max_delay(&self) -> Duration {
        Duration::from_secs(self.backoff.max_delay_secs)
    }

    #[must_use]
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig::default()
            .with_requeue_interval(Duration::from_secs(self.requeue_interval_secs))
            .with_status_retries(self.status_retries)
            .with_field_manager_prefix(self.field_manager_prefix.clone())
    }

    #[must_use]
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig::default()
            .with_workers(self.workers)
            .with_backoff(
                Backoff::default()
                    .with_initial_delay(Duration::from_millis(self.backoff.initial_delay_ms))
                    .with_max_delay(self.max_delay())
                    .with_multiplier(self.backoff.multiplier)
                    .with_jitter(self.backoff.jitter),
            )
    }
}

fn parse_var<T>(var: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::env(var, value, e))
}
