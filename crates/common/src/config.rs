use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Runtime settings read from the environment at startup.
/// Every variable is optional; malformed values are a `Config` error.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Worker pool size for the feature aggregator; `None` = available parallelism.
    pub pool_size: Option<usize>,
    /// Label horizon in periods.
    pub horizon: usize,
    /// Wall-time bound for the parallel aggregation.
    pub aggregation_timeout: Option<Duration>,
    /// TOML feature file (see `indicators::FeatureFileConfig`).
    pub features_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pool_size: None,
            horizon: 1,
            aggregation_timeout: None,
            features_path: None,
        }
    }
}

impl Settings {
    /// Load from environment variables, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] against an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Settings::default();
        Ok(Settings {
            pool_size: optional_positive(&lookup, "TTI_POOL_SIZE")?,
            horizon: optional_positive(&lookup, "TTI_HORIZON")?.unwrap_or(defaults.horizon),
            aggregation_timeout: optional_positive(&lookup, "TTI_AGGREGATION_TIMEOUT_SECS")?
                .map(|secs| Duration::from_secs(secs as u64)),
            features_path: lookup("TTI_FEATURES_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

fn optional_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<usize>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<usize>() {
        Ok(v) if v > 0 => Ok(Some(v)),
        _ => Err(Error::Config(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}
