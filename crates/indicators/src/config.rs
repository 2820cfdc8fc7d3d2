use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use common::{Result, TimeSeries};

use crate::registry::{IndicatorKind, IndicatorParams};
use crate::TechnicalIndicator;

/// Keyword parameters of an indicator, kept in key order.
pub type ParamMap = BTreeMap<String, toml::Value>;

/// Feature selection file (TOML).
///
/// Example `config/features.toml`:
/// ```toml
/// include_close = true
/// include_volume = false
///
/// [[indicator]]
/// name = "rsi"
///
/// [indicator.params]
/// period = 14
/// overbought = 70.0
/// oversold = 30.0
///
/// [[indicator]]
/// name = "parabolic_sar"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FeatureFileConfig {
    #[serde(rename = "indicator", default)]
    pub indicators: Vec<IndicatorSpec>,
    /// Append the raw close as a feature column.
    #[serde(default)]
    pub include_close: bool,
    /// Append the raw volume as a feature column.
    #[serde(default)]
    pub include_volume: bool,
}

impl FeatureFileConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// One configured feature: a formula name plus its keyword parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IndicatorSpec {
    /// Registry identifier: "momentum", "rsi", "parabolic_sar", ...
    pub name: String,
    #[serde(default)]
    pub params: ParamMap,
}

impl IndicatorSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: ParamMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Every registered formula with its default parameters.
    pub fn all_defaults() -> Vec<IndicatorSpec> {
        IndicatorKind::ALL
            .into_iter()
            .map(|kind| IndicatorSpec::new(kind.name()))
            .collect()
    }

    pub fn kind(&self) -> Result<IndicatorKind> {
        IndicatorKind::from_name(&self.name)
    }

    /// Resolve the name and validate the parameters.
    pub fn validate(&self) -> Result<IndicatorParams> {
        self.kind()?.parse_params(&self.params)
    }

    pub fn build(&self, input: TimeSeries) -> Result<Box<dyn TechnicalIndicator>> {
        self.validate()?.build(input)
    }

    /// Column name: `<name>_<key>_<value>` for each parameter in key order.
    pub fn feature_name(&self) -> String {
        let mut out = self.name.trim().to_ascii_lowercase();
        for (key, value) in &self.params {
            out.push('_');
            out.push_str(key);
            out.push('_');
            match value {
                toml::Value::String(s) => out.push_str(s),
                toml::Value::Integer(i) => out.push_str(&i.to_string()),
                toml::Value::Float(f) => out.push_str(&f.to_string()),
                toml::Value::Boolean(b) => out.push_str(&b.to_string()),
                other => out.push_str(&other.to_string()),
            }
        }
        out
    }
}
