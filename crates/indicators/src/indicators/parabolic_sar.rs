//! Parabolic SAR (stop and reverse).
//!
//! A two-state machine (LONG / SHORT) driven by the bar highs and lows. Each
//! row is computed under the previous row's position; if that row's price
//! pierces the new stop, the same row is computed once more under the opposite
//! position. A row can reverse at most once, so the loop never re-enters.

use common::{Column, Result, Signal, TimeSeries};

use crate::params::Params;
use crate::{ensure_history, TechnicalIndicator, TiData};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SarParams {
    /// Acceleration step, also the factor a new position starts with.
    pub af_increase: f64,
    /// Ceiling for the acceleration factor.
    pub af_max: f64,
}

impl Default for SarParams {
    fn default() -> Self {
        Self {
            af_increase: 0.02,
            af_max: 0.2,
        }
    }
}

impl SarParams {
    pub fn parse(p: &mut Params) -> Result<Self> {
        let d = Self::default();
        let af_increase =
            p.f64_checked("af_increase", d.af_increase, "in (0, 1]", |v| v > 0.0 && v <= 1.0)?;
        let af_max = p.f64_checked(
            "af_max",
            d.af_max,
            &format!(">= af_increase ({af_increase}) and <= 1"),
            |v| v >= af_increase && v <= 1.0,
        )?;
        Ok(Self {
            af_increase,
            af_max,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SarPosition {
    Long,
    Short,
}

impl SarPosition {
    pub fn code(self) -> f64 {
        match self {
            SarPosition::Long => 1.0,
            SarPosition::Short => -1.0,
        }
    }

    pub fn from_code(code: f64) -> Option<Self> {
        if code == 1.0 {
            Some(SarPosition::Long)
        } else if code == -1.0 {
            Some(SarPosition::Short)
        } else {
            None
        }
    }

    fn reversed(self) -> Self {
        match self {
            SarPosition::Long => SarPosition::Short,
            SarPosition::Short => SarPosition::Long,
        }
    }
}

/// Per-row machine state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SarState {
    pub af: f64,
    pub ep: f64,
    pub sar: f64,
    pub position: SarPosition,
}

/// Run the state machine over `high`/`low` (equal lengths, at least 2 rows).
pub fn sar_states(high: &[f64], low: &[f64], params: SarParams) -> Vec<SarState> {
    let n = high.len().min(low.len());
    if n < 2 {
        return Vec::new();
    }

    // Initial position guessed from the direction of the first two highs
    let first = if high[1] > high[0] {
        SarState {
            af: params.af_increase,
            ep: high[0],
            sar: low[0],
            position: SarPosition::Long,
        }
    } else {
        SarState {
            af: params.af_increase,
            ep: low[0],
            sar: high[0],
            position: SarPosition::Short,
        }
    };

    let mut states = Vec::with_capacity(n);
    states.push(first);
    let mut position_start = 0usize;

    for i in 1..n {
        let prev = states[i - 1];
        let state = match continue_position(high, low, i, position_start, &prev, params) {
            Some(state) => state,
            None => {
                let state = reverse_position(high, low, i, position_start, &prev, params);
                position_start = i;
                state
            }
        };
        states.push(state);
    }

    states
}

/// Row `i` under the previous position; `None` when the row reverses it.
fn continue_position(
    high: &[f64],
    low: &[f64],
    i: usize,
    position_start: usize,
    prev: &SarState,
    params: SarParams,
) -> Option<SarState> {
    let recent = i.saturating_sub(2)..i;
    let sar = prev.sar + prev.af * (prev.ep - prev.sar);

    let (ep, new_extreme, sar, pierced) = match prev.position {
        SarPosition::Long => {
            let ep = max(&high[position_start..=i]);
            // not above the two prior lows
            let sar = sar.min(min(&low[recent]));
            (ep, ep > prev.ep, sar, low[i] < sar)
        }
        SarPosition::Short => {
            let ep = min(&low[position_start..=i]);
            // not below the two prior highs
            let sar = sar.max(max(&high[recent]));
            (ep, ep < prev.ep, sar, high[i] > sar)
        }
    };

    if pierced {
        return None;
    }

    let af = if new_extreme {
        (prev.af + params.af_increase).min(params.af_max)
    } else {
        prev.af
    };

    Some(SarState {
        af,
        ep,
        sar,
        position: prev.position,
    })
}

/// Row `i` as the first row of the opposite position.
fn reverse_position(
    high: &[f64],
    low: &[f64],
    i: usize,
    position_start: usize,
    prev: &SarState,
    params: SarParams,
) -> SarState {
    let position = prev.position.reversed();
    let (ep, sar) = match position {
        SarPosition::Short => (low[i], max(&high[position_start..i])),
        SarPosition::Long => (high[i], min(&low[position_start..i])),
    };
    SarState {
        af: params.af_increase,
        ep,
        sar,
        position,
    }
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[derive(Debug, Clone)]
pub struct ParabolicSar {
    params: SarParams,
    input: TimeSeries,
    ti: TiData,
}

impl ParabolicSar {
    pub const NAME: &'static str = "parabolic_sar";
    pub const MIN_HISTORY: usize = 2;

    pub fn new(input: TimeSeries, params: SarParams) -> Result<Self> {
        let ti = compute(&input, params)?;
        Ok(Self { params, input, ti })
    }

    pub fn params(&self) -> SarParams {
        self.params
    }

    /// Machine state at row `i`, rebuilt from the stored columns.
    pub fn state_at(&self, i: usize) -> Option<SarState> {
        let ti = &self.ti;
        Some(SarState {
            af: *ti.column("af")?.get(i)?,
            ep: *ti.column("ep")?.get(i)?,
            sar: *ti.column("sar_raw")?.get(i)?,
            position: SarPosition::from_code(*ti.column("position")?.get(i)?)?,
        })
    }
}

fn compute(input: &TimeSeries, params: SarParams) -> Result<TiData> {
    ensure_history("Parabolic SAR", ParabolicSar::MIN_HISTORY, input)?;
    let high = input.require(Column::High, "Parabolic SAR")?;
    let low = input.require(Column::Low, "Parabolic SAR")?;
    let states = sar_states(high, low, params);

    Ok(TiData::new(vec![
        ("sar", states.iter().map(|s| round4(s.sar)).collect()),
        ("sar_raw", states.iter().map(|s| s.sar).collect()),
        ("af", states.iter().map(|s| s.af).collect()),
        ("ep", states.iter().map(|s| s.ep).collect()),
        ("position", states.iter().map(|s| s.position.code()).collect()),
    ]))
}

impl TechnicalIndicator for ParabolicSar {
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
        Self::MIN_HISTORY
    }

    fn signal_lookback(&self) -> usize {
        2
    }

    fn signal_rule(&self, input: &TimeSeries, ti: &TiData) -> Signal {
        let close = input.close();
        let Some(sar) = ti.tail("sar", 2) else {
            return Signal::Hold;
        };
        let Some(close) = close.len().checked_sub(2).map(|start| &close[start..]) else {
            return Signal::Hold;
        };

        if close[0] > sar[0] && close[1] < sar[1] {
            Signal::Buy
        } else if close[0] < sar[0] && close[1] > sar[1] {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}
