use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use common::{Error, Result, Settings};
use indicators::{FeatureFileConfig, IndicatorParams, IndicatorSpec};

use crate::labels::TieBreak;

/// Treatment of leading rows where some indicator is still warming up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WarmupPolicy {
    /// Keep the rows; their signal features are HOLD.
    #[default]
    HoldFill,
    /// Drop leading rows until every indicator's signal reads only defined
    /// data (see `TechnicalIndicator::warmup_rows`).
    Trim,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MlDataConfig {
    /// Feature columns in output order.
    pub indicators: Vec<IndicatorSpec>,
    pub include_close: bool,
    pub include_volume: bool,
    pub horizon: usize,
    pub tie_break: TieBreak,
    pub warmup: WarmupPolicy,
    /// `None` = available parallelism.
    pub pool_size: Option<usize>,
    pub timeout: Option<Duration>,
}

impl Default for MlDataConfig {
    fn default() -> Self {
        Self {
            indicators: Vec::new(),
            include_close: false,
            include_volume: false,
            horizon: 1,
            tie_break: TieBreak::default(),
            warmup: WarmupPolicy::default(),
            pool_size: None,
            timeout: None,
        }
    }
}

impl MlDataConfig {
    /// Every registered formula with default parameters plus close and volume.
    pub fn all_features() -> Self {
        Self {
            indicators: IndicatorSpec::all_defaults(),
            include_close: true,
            include_volume: true,
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &Settings, features: FeatureFileConfig) -> Self {
        Self {
            indicators: features.indicators,
            include_close: features.include_close,
            include_volume: features.include_volume,
            horizon: settings.horizon,
            pool_size: settings.pool_size,
            timeout: settings.aggregation_timeout,
            ..Self::default()
        }
    }

    /// Settings from the environment; features from `TTI_FEATURES_PATH`, or
    /// [`MlDataConfig::all_features`] when no feature file is configured.
    pub fn from_env() -> Result<Self> {
        let settings = Settings::from_env()?;
        let config = match &settings.features_path {
            Some(path) => {
                info!(path = %path.display(), "Loading feature file");
                Self::from_settings(&settings, FeatureFileConfig::load(path)?)
            }
            None => Self {
                horizon: settings.horizon,
                pool_size: settings.pool_size,
                timeout: settings.aggregation_timeout,
                ..Self::all_features()
            },
        };
        Ok(config)
    }

    pub fn with_indicator(mut self, spec: IndicatorSpec) -> Self {
        self.indicators.push(spec);
        self
    }

    /// Checks everything that does not depend on the input series and
    /// returns the validated indicator parameters in configuration order.
    pub fn validate(&self) -> Result<Vec<IndicatorParams>> {
        if self.indicators.is_empty() && !self.include_close && !self.include_volume {
            return Err(Error::NoFeaturesSelected);
        }
        if self.horizon == 0 {
            return Err(Error::Config("label horizon must be at least 1".into()));
        }
        if self.pool_size == Some(0) {
            return Err(Error::Config("worker pool size must be a positive integer".into()));
        }

        let names = self.feature_names();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(Error::Config(format!("feature column '{name}' configured twice")));
            }
        }

        self.indicators.iter().map(IndicatorSpec::validate).collect()
    }

    /// Output column names: indicators first, then close and volume.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indicators.iter().map(|s| s.feature_name()).collect();
        if self.include_close {
            names.push("close".into());
        }
        if self.include_volume {
            names.push("volume".into());
        }
        names
    }
}
