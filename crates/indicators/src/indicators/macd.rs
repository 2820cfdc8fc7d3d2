use common::{Result, Signal, TimeSeries};

use crate::params::Params;
use crate::smoothing::ewm;
use crate::{ensure_history, TechnicalIndicator, TiData};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

impl MacdParams {
    pub fn parse(p: &mut Params) -> Result<Self> {
        let d = Self::default();
        let fast = p.usize_at_least("fast", d.fast, 1)?;
        let slow = p.usize_at_least("slow", d.slow, fast + 1)?;
        let signal = p.usize_at_least("signal", d.signal, 1)?;
        Ok(Self { fast, slow, signal })
    }
}

/// MACD (Moving Average Convergence/Divergence) indicator.
///
/// Computes: MACD line = EMA(fast) − EMA(slow), signal line = EMA(macd_line, signal).
/// The trading signal fires when the MACD line crosses the signal line.
#[derive(Debug, Clone)]
pub struct Macd {
    params: MacdParams,
    input: TimeSeries,
    ti: TiData,
}

impl Macd {
    pub const NAME: &'static str = "macd";

    pub fn new(input: TimeSeries, params: MacdParams) -> Result<Self> {
        ensure_history("MACD", params.slow, &input)?;
        let ti = compute(&input, params);
        Ok(Self { params, input, ti })
    }

    pub fn params(&self) -> MacdParams {
        self.params
    }
}

fn compute(input: &TimeSeries, params: MacdParams) -> TiData {
    let close = input.close();
    let fast = ewm(close, params.fast, params.fast);
    let slow = ewm(close, params.slow, params.slow);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal_line = ewm(&line, params.signal, params.signal);
    TiData::new(vec![("macd", line), ("signal_line", signal_line)])
}

impl TechnicalIndicator for Macd {
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
        ensure_history("MACD", self.params.slow, input)?;
        Ok(compute(input, self.params))
    }

    fn min_history(&self) -> usize {
        self.params.slow
    }

    fn signal_lookback(&self) -> usize {
        2
    }

    fn signal_rule(&self, _input: &TimeSeries, ti: &TiData) -> Signal {
        let (Some(line), Some(sig)) = (ti.tail("macd", 2), ti.tail("signal_line", 2)) else {
            return Signal::Hold;
        };

        // Detect crossover
        if line[0] <= sig[0] && line[1] > sig[1] {
            Signal::Buy
        } else if line[0] >= sig[0] && line[1] < sig[1] {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::testing::closes;

    fn trending_up(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64 * 0.5).collect()
    }

    #[test]
    fn warmup_covers_signal_line() {
        let m = Macd::new(closes(&trending_up(80)), MacdParams::default()).unwrap();
        let sig = m.ti_data().column("signal_line").unwrap();
        // slow - 1 rows for the line, signal - 1 more for its average
        assert!(sig[32].is_nan());
        assert!(sig[33].is_finite());
        assert_eq!(m.min_history(), 26);
        assert_eq!(m.warmup_rows(), 35);
    }

    fn small() -> MacdParams {
        MacdParams {
            fast: 3,
            slow: 6,
            signal: 3,
        }
    }

    #[test]
    fn macd_rejects_insufficient_data() {
        let err = Macd::new(closes(&[100.0; 20]), MacdParams::default()).unwrap_err();
        assert!(matches!(err, common::Error::InsufficientHistory { required: 26, .. }));
    }

    #[test]
    fn signal_line_warm_up() {
        let m = Macd::new(closes(&trending_up(20)), small()).unwrap();
        let sig = m.ti_data().column("signal_line").unwrap();
        // slow - 1 rows for the line, signal - 1 more for its average
        assert!(sig[..7].iter().all(|v| v.is_nan()));
        assert!(sig[7].is_finite());
    }

    #[test]
    fn macd_detects_bullish_crossover() {
        // Build a series: down then sharply up → MACD crosses above its signal
        let mut prices: Vec<f64> = (0..20).map(|i| 100.0 - i as f64 * 0.5).collect();
        prices.extend((0..20).map(|i| 90.0 + i as f64 * 2.0));
        let m = Macd::new(closes(&prices), small()).unwrap();
        let signals: Vec<Signal> = (0..=prices.len()).map(|rows| m.signal_at(rows)).collect();
        let first_buy = signals.iter().position(|s| *s == Signal::Buy);
        assert!(matches!(first_buy, Some(i) if i > 20), "no buy after the turn: {signals:?}");
    }

    #[test]
    fn macd_holds_on_steady_trend() {
        // A perfectly linear up-trend keeps MACD above signal without crossing
        let m = Macd::new(closes(&trending_up(60)), small()).unwrap();
        assert_eq!(m.signal(), Signal::Hold);
    }

    #[test]
    fn fast_must_be_below_slow() {
        let raw: crate::ParamMap = [
            ("fast".to_string(), toml::Value::Integer(26)),
            ("slow".to_string(), toml::Value::Integer(12)),
        ]
        .into_iter()
        .collect();
        let mut p = Params::new(Macd::NAME, &raw);
        assert!(matches!(
            MacdParams::parse(&mut p),
            Err(common::Error::InvalidParameterValue { .. })
        ));
    }
}
