//! Momentum indicator.
//!
//! `mom[t] = close[t] - close[t - period]`, with a 9-period EMA of the
//! momentum as its signal line. Crossings of the line drive the signal.

use common::{Result, Signal, TimeSeries};

use crate::params::Params;
use crate::smoothing::ewm;
use crate::{ensure_history, TechnicalIndicator, TiData};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumParams {
    pub period: usize,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self { period: 12 }
    }
}

impl MomentumParams {
    pub fn parse(p: &mut Params) -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            period: p.usize_at_least("period", d.period, 1)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Momentum {
    params: MomentumParams,
    input: TimeSeries,
    ti: TiData,
}

impl Momentum {
    pub const NAME: &'static str = "momentum";
    pub const SIGNAL_SPAN: usize = 9;

    pub fn new(input: TimeSeries, params: MomentumParams) -> Result<Self> {
        ensure_history("Momentum", params.period, &input)?;
        let ti = compute(&input, params);
        Ok(Self { params, input, ti })
    }

    pub fn params(&self) -> MomentumParams {
        self.params
    }
}

fn compute(input: &TimeSeries, params: MomentumParams) -> TiData {
    let close = input.close();
    let mom: Vec<f64> = (0..close.len())
        .map(|i| {
            if i >= params.period {
                close[i] - close[i - params.period]
            } else {
                f64::NAN
            }
        })
        .collect();
    let line = ewm(&mom, Momentum::SIGNAL_SPAN, Momentum::SIGNAL_SPAN);
    TiData::new(vec![("mom", mom), ("mom_ema", line)])
}

impl TechnicalIndicator for Momentum {
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
        ensure_history("Momentum", self.params.period, input)?;
        Ok(compute(input, self.params))
    }

    fn min_history(&self) -> usize {
        self.params.period
    }

    fn signal_lookback(&self) -> usize {
        Self::SIGNAL_SPAN
    }

    fn signal_depth(&self) -> usize {
        2
    }

    fn signal_rule(&self, _input: &TimeSeries, ti: &TiData) -> Signal {
        let (Some(mom), Some(line)) = (ti.tail("mom", 2), ti.tail("mom_ema", 2)) else {
            return Signal::Hold;
        };

        // Momentum rising through its average marks a peak forming
        if mom[0] < line[0] && mom[1] > line[1] {
            Signal::Sell
        } else if mom[0] > line[0] && mom[1] < line[1] {
            Signal::Buy
        } else {
            Signal::Hold
        }
    }
}
