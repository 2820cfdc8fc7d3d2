use common::{Error, Result};

use crate::config::ParamMap;

/// Typed, validating reader over an indicator's keyword parameters.
///
/// Every key read is recorded; [`Params::finish`] rejects keys that no
/// reader asked for, so misspelled parameters never pass silently.
pub struct Params<'a> {
    indicator: &'static str,
    raw: &'a ParamMap,
    known: Vec<&'static str>,
}

impl<'a> Params<'a> {
    pub fn new(indicator: &'static str, raw: &'a ParamMap) -> Self {
        Self {
            indicator,
            raw,
            known: Vec::new(),
        }
    }

    /// Integer parameter that must be `>= min`.
    pub fn usize_at_least(&mut self, key: &'static str, default: usize, min: usize) -> Result<usize> {
        self.known.push(key);
        let Some(value) = self.raw.get(key) else {
            return Ok(default);
        };
        let v = value.as_integer().ok_or_else(|| self.wrong_type(key, value, "an integer"))?;
        if v < min as i64 {
            return Err(Error::invalid_value(self.indicator, key, v, format!(">= {min}")));
        }
        Ok(v as usize)
    }

    /// Float parameter (integers accepted) that must satisfy `check`.
    pub fn f64_checked(
        &mut self,
        key: &'static str,
        default: f64,
        expected: &str,
        check: impl Fn(f64) -> bool,
    ) -> Result<f64> {
        self.known.push(key);
        let Some(value) = self.raw.get(key) else {
            return Ok(default);
        };
        let v = match value {
            toml::Value::Float(f) => *f,
            toml::Value::Integer(i) => *i as f64,
            other => return Err(self.wrong_type(key, other, "a number")),
        };
        if !v.is_finite() || !check(v) {
            return Err(Error::invalid_value(self.indicator, key, v, expected));
        }
        Ok(v)
    }

    /// Reject keys this indicator does not take.
    pub fn finish(self) -> Result<()> {
        match self.raw.keys().find(|k| !self.known.contains(&k.as_str())) {
            None => Ok(()),
            Some(unknown) => Err(Error::invalid_value(
                self.indicator,
                unknown.as_str(),
                &self.raw[unknown],
                if self.known.is_empty() {
                    "no parameters".to_string()
                } else {
                    format!("one of {:?}", self.known)
                },
            )),
        }
    }

    fn wrong_type(&self, key: &str, value: &toml::Value, expected: &str) -> Error {
        Error::InvalidInputType(format!(
            "parameter '{key}' of {} must be {expected}, got {} ({value})",
            self.indicator,
            value.type_str()
        ))
    }
}
