use common::{Result, Signal, TimeSeries};

use crate::params::Params;
use crate::smoothing::rolling_sum;
use crate::{ensure_history, TechnicalIndicator, TiData};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiParams {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            period: 14,
            overbought: 70.0,
            oversold: 30.0,
        }
    }
}

impl RsiParams {
    pub fn parse(p: &mut Params) -> Result<Self> {
        let d = Self::default();
        let period = p.usize_at_least("period", d.period, 1)?;
        let overbought =
            p.f64_checked("overbought", d.overbought, "in (0, 100)", |v| v > 0.0 && v < 100.0)?;
        let oversold = p.f64_checked(
            "oversold",
            d.oversold,
            &format!("in (0, {overbought})"),
            |v| v > 0.0 && v < overbought,
        )?;
        Ok(Self {
            period,
            overbought,
            oversold,
        })
    }
}

/// RSI (Relative Strength Index) indicator.
///
/// Share of upward movement in the last `period` close-to-close changes,
/// scaled to 0..=100. A window without any movement reads 50.
/// Defined from row `period` on, so at least `period + 1` closes are needed.
#[derive(Debug, Clone)]
pub struct RelativeStrengthIndex {
    params: RsiParams,
    input: TimeSeries,
    ti: TiData,
}

impl RelativeStrengthIndex {
    pub const NAME: &'static str = "rsi";

    pub fn new(input: TimeSeries, params: RsiParams) -> Result<Self> {
        ensure_history("RSI", params.period + 1, &input)?;
        let ti = compute(&input, params.period);
        Ok(Self { params, input, ti })
    }

    pub fn params(&self) -> RsiParams {
        self.params
    }
}

fn compute(input: &TimeSeries, period: usize) -> TiData {
    let close = input.close();
    let mut gains = vec![f64::NAN; close.len()];
    let mut moves = vec![f64::NAN; close.len()];
    for i in 1..close.len() {
        let change = close[i] - close[i - 1];
        gains[i] = change.max(0.0);
        moves[i] = change.abs();
    }

    let gain_sum = rolling_sum(&gains, period);
    let move_sum = rolling_sum(&moves, period);
    let rsi = gain_sum
        .iter()
        .zip(&move_sum)
        .map(|(&g, &m)| {
            if !m.is_finite() {
                f64::NAN
            } else if m == 0.0 {
                50.0
            } else {
                100.0 * g / m
            }
        })
        .collect();

    TiData::new(vec![("rsi", rsi)])
}

impl TechnicalIndicator for RelativeStrengthIndex {
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
        ensure_history("RSI", self.params.period + 1, input)?;
        Ok(compute(input, self.params.period))
    }

    fn min_history(&self) -> usize {
        self.params.period + 1
    }

    fn signal_lookback(&self) -> usize {
        2
    }

    fn signal_rule(&self, _input: &TimeSeries, ti: &TiData) -> Signal {
        let Some(rsi) = ti.tail("rsi", 2) else {
            return Signal::Hold;
        };
        let (prev, curr) = (rsi[0], rsi[1]);

        if prev < self.params.overbought && curr > self.params.overbought {
            Signal::Sell
        } else if prev > self.params.oversold && curr < self.params.oversold {
            Signal::Buy
        } else {
            Signal::Hold
        }
    }
}
