use common::{Result, Signal, TimeSeries};

use crate::params::Params;
use crate::smoothing::{rolling_std, sma};
use crate::{ensure_history, TechnicalIndicator, TiData};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerParams {
    pub period: usize,
    /// Band width in sample standard deviations.
    pub std_dev: f64,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev: 2.0,
        }
    }
}

impl BollingerParams {
    pub fn parse(p: &mut Params) -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            period: p.usize_at_least("period", d.period, 2)?,
            std_dev: p.f64_checked("std_dev", d.std_dev, "> 0", |v| v > 0.0)?,
        })
    }
}

/// Bollinger Bands: simple moving average of closes with bands `std_dev`
/// deviations above and below.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    params: BollingerParams,
    input: TimeSeries,
    ti: TiData,
}

impl BollingerBands {
    pub const NAME: &'static str = "bollinger_bands";

    pub fn new(input: TimeSeries, params: BollingerParams) -> Result<Self> {
        ensure_history("Bollinger Bands", params.period, &input)?;
        let ti = compute(&input, params);
        Ok(Self { params, input, ti })
    }

    pub fn params(&self) -> BollingerParams {
        self.params
    }
}

fn compute(input: &TimeSeries, params: BollingerParams) -> TiData {
    let middle = sma(input.close(), params.period);
    let std = rolling_std(input.close(), params.period);
    let upper = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| m + params.std_dev * s)
        .collect();
    let lower = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| m - params.std_dev * s)
        .collect();
    TiData::new(vec![("middle", middle), ("upper", upper), ("lower", lower)])
}

impl TechnicalIndicator for BollingerBands {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn input(&self) -> &TimeSeries {
        &self.input
    }

    fn ti_data(&self) -> &TiData {
        &self.ti
    }

    fn calculate(&self, input: &TimeSeries) -> Result<TiData> {
        ensure_history("Bollinger Bands", self.params.period, input)?;
        Ok(compute(input, self.params))
    }

    fn min_history(&self) -> usize {
        self.params.period
    }

    fn signal_lookback(&self) -> usize {
        1
    }

    fn signal_rule(&self, input: &TimeSeries, ti: &TiData) -> Signal {
        let (Some(&close), Some(upper), Some(lower)) =
            (input.close().last(), ti.last("upper"), ti.last("lower"))
        else {
            return Signal::Hold;
        };
        if close < lower {
            Signal::Buy
        } else if close > upper {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}
