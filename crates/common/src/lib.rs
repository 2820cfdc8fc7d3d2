pub mod config;
pub mod error;
pub mod fill;
pub mod series;
pub mod types;

pub use config::Settings;
pub use error::{Error, Result};
pub use fill::{fill_missing, FillPolicy};
pub use series::TimeSeries;
pub use types::*;
