use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInputType(String),

    #[error("Invalid value for '{name}' of {indicator}: {value} (expected {expected})")]
    InvalidParameterValue {
        indicator: String,
        name: String,
        value: String,
        expected: String,
    },

    #[error("Not enough history for {what}: need {required} periods, got {available}")]
    InsufficientHistory {
        what: String,
        required: usize,
        available: usize,
    },

    #[error("No features selected: configure at least one indicator, close or volume")]
    NoFeaturesSelected,

    #[error("Unsupported indicator '{0}'")]
    UnsupportedIndicator(String),

    #[error("Aggregation failed on '{indicator}': {source}")]
    AggregationFailure {
        indicator: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("Aggregation timed out after {0:?}")]
    AggregationTimeout(Duration),

    #[error("Model training is not supported for loaded models")]
    ModelTrainingUnsupported,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_value(
        indicator: impl Into<String>,
        name: impl Into<String>,
        value: impl ToString,
        expected: impl Into<String>,
    ) -> Self {
        Error::InvalidParameterValue {
            indicator: indicator.into(),
            name: name.into(),
            value: value.to_string(),
            expected: expected.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
