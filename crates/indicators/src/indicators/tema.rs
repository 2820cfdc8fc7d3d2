use common::{Result, Signal, TimeSeries};

use crate::params::Params;
use crate::smoothing::ewm;
use crate::{ensure_history, TechnicalIndicator, TiData};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemaParams {
    pub period: usize,
}

impl Default for TemaParams {
    fn default() -> Self {
        Self { period: 5 }
    }
}

impl TemaParams {
    pub fn parse(p: &mut Params) -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            period: p.usize_at_least("period", d.period, 1)?,
        })
    }
}

/// Triple Exponential Moving Average: `3·EMA − 3·EMA(EMA) + EMA(EMA(EMA))`.
#[derive(Debug, Clone)]
pub struct TripleExponentialMovingAverage {
    params: TemaParams,
    input: TimeSeries,
    ti: TiData,
}

impl TripleExponentialMovingAverage {
    pub const NAME: &'static str = "tema";

    pub fn new(input: TimeSeries, params: TemaParams) -> Result<Self> {
        ensure_history("TEMA", params.period, &input)?;
        let ti = compute(&input, params.period);
        Ok(Self { params, input, ti })
    }

    pub fn params(&self) -> TemaParams {
        self.params
    }
}

fn compute(input: &TimeSeries, period: usize) -> TiData {
    let single = ewm(input.close(), period, period);
    let double = ewm(&single, period, period);
    let triple = ewm(&double, period, period);
    let tema = single
        .iter()
        .zip(&double)
        .zip(&triple)
        .map(|((e1, e2), e3)| 3.0 * e1 - 3.0 * e2 + e3)
        .collect();
    TiData::new(vec![("tema", tema)])
}

impl TechnicalIndicator for TripleExponentialMovingAverage {
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
        ensure_history("TEMA", self.params.period, input)?;
        Ok(compute(input, self.params.period))
    }

    fn min_history(&self) -> usize {
        self.params.period
    }

    fn signal_lookback(&self) -> usize {
        1
    }

    fn signal_rule(&self, input: &TimeSeries, ti: &TiData) -> Signal {
        let (Some(&close), Some(tema)) = (input.close().last(), ti.last("tema")) else {
            return Signal::Hold;
        };
        if close < tema {
            Signal::Buy
        } else if close > tema {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}
