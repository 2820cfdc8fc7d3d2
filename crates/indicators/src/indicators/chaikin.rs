use common::{Column, Result, Signal, TimeSeries};

use crate::params::Params;
use crate::smoothing::ewm;
use crate::{ensure_history, TechnicalIndicator, TiData};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaikinParams {
    pub short: usize,
    pub long: usize,
}

impl Default for ChaikinParams {
    fn default() -> Self {
        Self { short: 3, long: 10 }
    }
}

impl ChaikinParams {
    pub fn parse(p: &mut Params) -> Result<Self> {
        let d = Self::default();
        let short = p.usize_at_least("short", d.short, 1)?;
        let long = p.usize_at_least("long", d.long, short + 1)?;
        Ok(Self { short, long })
    }
}

/// Chaikin Oscillator: fast minus slow EMA of the accumulation/distribution
/// line. Needs high, low, close and volume.
#[derive(Debug, Clone)]
pub struct ChaikinOscillator {
    params: ChaikinParams,
    input: TimeSeries,
    ti: TiData,
}

impl ChaikinOscillator {
    pub const NAME: &'static str = "chaikin_oscillator";
    pub const MIN_HISTORY: usize = 10;
    /// Rows of closes averaged for the trend filter in the signal rule.
    pub const TREND_WINDOW: usize = 90;

    pub fn new(input: TimeSeries, params: ChaikinParams) -> Result<Self> {
        let ti = compute(&input, params)?;
        Ok(Self { params, input, ti })
    }

    pub fn params(&self) -> ChaikinParams {
        self.params
    }

    fn required(params: ChaikinParams) -> usize {
        Self::MIN_HISTORY.max(params.long)
    }
}

fn compute(input: &TimeSeries, params: ChaikinParams) -> Result<TiData> {
    ensure_history("Chaikin Oscillator", ChaikinOscillator::required(params), input)?;
    let high = input.require(Column::High, "Chaikin Oscillator")?;
    let low = input.require(Column::Low, "Chaikin Oscillator")?;
    let volume = input.require(Column::Volume, "Chaikin Oscillator")?;
    let close = input.close();

    let mut running = 0.0;
    let adl: Vec<f64> = (0..close.len())
        .map(|i| {
            let range = high[i] - low[i];
            // a bar without range moves no money
            if range != 0.0 {
                running += volume[i] * ((close[i] - low[i]) - (high[i] - close[i])) / range;
            }
            running
        })
        .collect();

    let fast = ewm(&adl, params.short, params.short);
    let slow = ewm(&adl, params.long, params.long);
    let co = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();

    Ok(TiData::new(vec![("adl", adl), ("co", co)]))
}

impl TechnicalIndicator for ChaikinOscillator {
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
        compute(input, self.params)
    }

    fn min_history(&self) -> usize {
        Self::required(self.params)
    }

    fn signal_lookback(&self) -> usize {
        Self::TREND_WINDOW
    }

    fn signal_depth(&self) -> usize {
        2
    }

    fn signal_rule(&self, input: &TimeSeries, ti: &TiData) -> Signal {
        let close = input.close();
        let (Some(co), Some(&last)) = (ti.tail("co", 2), close.last()) else {
            return Signal::Hold;
        };
        let window = &close[close.len().saturating_sub(Self::TREND_WINDOW)..];
        let trend = window.iter().sum::<f64>() / window.len() as f64;

        // upturn in negative territory while price holds above trend
        if last > trend && co[0] < co[1] && co[1] < 0.0 {
            Signal::Buy
        } else if last < trend && co[0] > co[1] && co[1] > 0.0 {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::testing::{bars, wave};

    #[test]
    fn requires_ten_rows() {
        let err = ChaikinOscillator::new(bars(&[10.0; 9], 100.0), ChaikinParams::default()).unwrap_err();
        assert!(matches!(err, common::Error::InsufficientHistory { required: 10, .. }));
    }

    #[test]
    fn requires_volume() {
        let input = TimeSeries::daily(vec![
            (Column::Close, vec![10.0; 12]),
            (Column::High, vec![11.0; 12]),
            (Column::Low, vec![9.0; 12]),
        ])
        .unwrap();
        let err = ChaikinOscillator::new(input, ChaikinParams::default()).unwrap_err();
        assert!(matches!(err, common::Error::InvalidInputType(_)));
    }

    #[test]
    fn close_at_high_accumulates_full_volume() {
        let input = TimeSeries::daily(vec![
            (Column::Close, vec![11.0; 10]),
            (Column::High, vec![11.0; 10]),
            (Column::Low, vec![9.0; 10]),
            (Column::Volume, vec![5.0; 10]),
        ])
        .unwrap();
        let co = ChaikinOscillator::new(input, ChaikinParams::default()).unwrap();
        let adl = co.ti_data().column("adl").unwrap();
        assert_eq!(adl[9], 50.0);
    }

    #[test]
    fn flat_bars_add_nothing() {
        let input = TimeSeries::daily(vec![
            (Column::Close, vec![10.0; 10]),
            (Column::High, vec![10.0; 10]),
            (Column::Low, vec![10.0; 10]),
            (Column::Volume, vec![5.0; 10]),
        ])
        .unwrap();
        let co = ChaikinOscillator::new(input, ChaikinParams::default()).unwrap();
        assert!(co.ti_data().column("adl").unwrap().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn hold_until_trend_window_is_filled() {
        let co = ChaikinOscillator::new(bars(&wave(150), 1_000.0), ChaikinParams::default()).unwrap();
        for rows in 0..ChaikinOscillator::TREND_WINDOW {
            assert_eq!(co.signal_at(rows), Signal::Hold);
        }
        assert_eq!(co.warmup_rows(), ChaikinOscillator::TREND_WINDOW);
    }
}
