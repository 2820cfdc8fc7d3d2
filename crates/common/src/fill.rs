use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How gaps in raw input are handled before a series reaches any indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Any gap is an `InvalidInputType` error.
    Reject,
    /// Carry the last value forward; a leading gap takes the first known value.
    #[default]
    ForwardBackward,
}

pub fn fill_missing(values: &[Option<f64>], policy: FillPolicy, column: &str) -> Result<Vec<f64>> {
    let first_known = values.iter().flatten().next().copied();

    match policy {
        FillPolicy::Reject => values
            .iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| {
                    Error::InvalidInputType(format!("missing value in column '{column}' at row {row}"))
                })
            })
            .collect(),
        FillPolicy::ForwardBackward => {
            let mut last = first_known.ok_or_else(|| {
                Error::InvalidInputType(format!("column '{column}' has no values"))
            })?;
            Ok(values
                .iter()
                .map(|v| {
                    if let Some(v) = v {
                        last = *v;
                    }
                    last
                })
                .collect())
        }
    }
}
