use common::{Column, Result, Signal, TimeSeries};

use crate::params::Params;
use crate::{ensure_history, TechnicalIndicator, TiData};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VrocParams {
    pub period: usize,
}

impl Default for VrocParams {
    fn default() -> Self {
        Self { period: 5 }
    }
}

impl VrocParams {
    pub fn parse(p: &mut Params) -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            period: p.usize_at_least("period", d.period, 1)?,
        })
    }
}

/// Volume Rate of Change: percent change of volume over `period` rows.
/// Undefined where the reference volume is zero.
#[derive(Debug, Clone)]
pub struct VolumeRateOfChange {
    params: VrocParams,
    input: TimeSeries,
    ti: TiData,
}

impl VolumeRateOfChange {
    pub const NAME: &'static str = "vroc";

    pub fn new(input: TimeSeries, params: VrocParams) -> Result<Self> {
        let ti = compute(&input, params.period)?;
        Ok(Self { params, input, ti })
    }

    pub fn params(&self) -> VrocParams {
        self.params
    }
}

fn compute(input: &TimeSeries, period: usize) -> Result<TiData> {
    ensure_history("Volume Rate of Change", period, input)?;
    let volume = input.require(Column::Volume, "Volume Rate of Change")?;
    let vroc = (0..volume.len())
        .map(|i| match i.checked_sub(period).map(|j| volume[j]) {
            Some(reference) if reference != 0.0 => 100.0 * (volume[i] - reference) / reference,
            _ => f64::NAN,
        })
        .collect();
    Ok(TiData::new(vec![("vroc", vroc)]))
}

impl TechnicalIndicator for VolumeRateOfChange {
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
        compute(input, self.params.period)
    }

    fn min_history(&self) -> usize {
        self.params.period
    }

    fn signal_lookback(&self) -> usize {
        3
    }

    fn signal_rule(&self, _input: &TimeSeries, ti: &TiData) -> Signal {
        let Some(v) = ti.tail("vroc", 3) else {
            return Signal::Hold;
        };
        // a three-row slide warns of a downward breakout
        if v[0] > v[1] && v[1] > v[2] {
            Signal::Buy
        } else if v[0] < v[1] && v[1] < v[2] {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}
