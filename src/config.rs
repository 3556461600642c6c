//! Runtime configuration: wire format and sampling parameters.
//!
//! Resolution order (later wins):
//! 1. Built-in defaults
//! 2. JSON file (`--config`, or `PERFREPORT_CONFIG_PATH`)
//! 3. `PERFREPORT_*` environment variables

use crate::error::{Error, Result};
use crate::wire::WireFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "PERFREPORT_CONFIG_PATH";
pub const WIRE_FORMAT_ENV: &str = "PERFREPORT_WIRE_FORMAT";
pub const SAMPLE_INTERVAL_ENV: &str = "PERFREPORT_SAMPLE_INTERVAL_MS";
pub const REQUIRED_SAMPLES_ENV: &str = "PERFREPORT_REQUIRED_SAMPLES";
pub const JOIN_TIMEOUT_ENV: &str = "PERFREPORT_JOIN_TIMEOUT_MS";

pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_REQUIRED_SAMPLES: usize = 100;
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 20_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SamplingConfig {
    /// Time the frame buffer is left to fill between clear and dump.
    pub sample_interval_ms: u64,
    /// Frame timestamps to collect before the loop stops on its own.
    pub required_samples: usize,
    /// Upper bound on how long `finish()` waits for the loop.
    pub join_timeout_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            required_samples: DEFAULT_REQUIRED_SAMPLES,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
        }
    }
}

impl SamplingConfig {
    #[must_use]
    pub const fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    #[must_use]
    pub const fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PerfReportConfig {
    pub wire_format: WireFormat,
    pub sampling: SamplingConfig,
}

impl PerfReportConfig {
    /// Load from `path` (or the path named by the environment) and apply
    /// environment overrides from the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`PerfReportConfig::load`], reading variables through `lookup`.
    pub fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| lookup(CONFIG_PATH_ENV).filter(|v| !v.is_empty()).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_json_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(lookup)?;
        tracing::debug!(
            event = "config.loaded",
            wire_format = %config.wire_format,
            sample_interval_ms = config.sampling.sample_interval_ms,
            required_samples = config.sampling.required_samples,
            join_timeout_ms = config.sampling.join_timeout_ms,
            "Configuration resolved"
        );
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            Error::config(format!("failed to read config {}: {err}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|err| {
            Error::config(format!("failed to parse config {}: {err}", path.display()))
        })
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(WIRE_FORMAT_ENV) {
            self.wire_format = value.parse()?;
        }
        if let Some(value) = lookup(SAMPLE_INTERVAL_ENV) {
            self.sampling.sample_interval_ms = parse_env(SAMPLE_INTERVAL_ENV, &value)?;
        }
        if let Some(value) = lookup(REQUIRED_SAMPLES_ENV) {
            self.sampling.required_samples = parse_env(REQUIRED_SAMPLES_ENV, &value)?;
        }
        if let Some(value) = lookup(JOIN_TIMEOUT_ENV) {
            self.sampling.join_timeout_ms = parse_env(JOIN_TIMEOUT_ENV, &value)?;
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| Error::config(format!("{key}='{value}': {err}")))
}
