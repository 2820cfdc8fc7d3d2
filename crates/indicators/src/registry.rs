use tracing::debug;

use common::{Error, Result, TimeSeries};

use crate::config::ParamMap;
use crate::indicators::{
    BollingerBands, BollingerParams, ChaikinOscillator, ChaikinParams, Macd, MacdParams, Momentum,
    MomentumParams, ParabolicSar, RelativeStrengthIndex, RsiParams, SarParams, TemaParams,
    TripleExponentialMovingAverage, VolumeRateOfChange, VrocParams,
};
use crate::params::Params;
use crate::TechnicalIndicator;

/// Every formula the library can build, keyed by its registry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Momentum,
    Rsi,
    ParabolicSar,
    ChaikinOscillator,
    Tema,
    Vroc,
    Macd,
    BollingerBands,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 8] = [
        IndicatorKind::Momentum,
        IndicatorKind::Rsi,
        IndicatorKind::ParabolicSar,
        IndicatorKind::ChaikinOscillator,
        IndicatorKind::Tema,
        IndicatorKind::Vroc,
        IndicatorKind::Macd,
        IndicatorKind::BollingerBands,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IndicatorKind::Momentum => Momentum::NAME,
            IndicatorKind::Rsi => RelativeStrengthIndex::NAME,
            IndicatorKind::ParabolicSar => ParabolicSar::NAME,
            IndicatorKind::ChaikinOscillator => ChaikinOscillator::NAME,
            IndicatorKind::Tema => TripleExponentialMovingAverage::NAME,
            IndicatorKind::Vroc => VolumeRateOfChange::NAME,
            IndicatorKind::Macd => Macd::NAME,
            IndicatorKind::BollingerBands => BollingerBands::NAME,
        }
    }

    /// Case-insensitive lookup; fails with `UnsupportedIndicator`.
    pub fn from_name(name: &str) -> Result<Self> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnsupportedIndicator(name.to_string()))
    }

    /// Validate keyword parameters without touching any data.
    pub fn parse_params(self, raw: &ParamMap) -> Result<IndicatorParams> {
        let mut p = Params::new(self.name(), raw);
        let parsed = match self {
            IndicatorKind::Momentum => IndicatorParams::Momentum(MomentumParams::parse(&mut p)?),
            IndicatorKind::Rsi => IndicatorParams::Rsi(RsiParams::parse(&mut p)?),
            IndicatorKind::ParabolicSar => IndicatorParams::ParabolicSar(SarParams::parse(&mut p)?),
            IndicatorKind::ChaikinOscillator => {
                IndicatorParams::ChaikinOscillator(ChaikinParams::parse(&mut p)?)
            }
            IndicatorKind::Tema => IndicatorParams::Tema(TemaParams::parse(&mut p)?),
            IndicatorKind::Vroc => IndicatorParams::Vroc(VrocParams::parse(&mut p)?),
            IndicatorKind::Macd => IndicatorParams::Macd(MacdParams::parse(&mut p)?),
            IndicatorKind::BollingerBands => {
                IndicatorParams::BollingerBands(BollingerParams::parse(&mut p)?)
            }
        };
        p.finish()?;
        Ok(parsed)
    }

    pub fn build(self, input: TimeSeries, raw: &ParamMap) -> Result<Box<dyn TechnicalIndicator>> {
        self.parse_params(raw)?.build(input)
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated parameters, one variant per formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorParams {
    Momentum(MomentumParams),
    Rsi(RsiParams),
    ParabolicSar(SarParams),
    ChaikinOscillator(ChaikinParams),
    Tema(TemaParams),
    Vroc(VrocParams),
    Macd(MacdParams),
    BollingerBands(BollingerParams),
}

impl IndicatorParams {
    pub fn kind(&self) -> IndicatorKind {
        match self {
            IndicatorParams::Momentum(_) => IndicatorKind::Momentum,
            IndicatorParams::Rsi(_) => IndicatorKind::Rsi,
            IndicatorParams::ParabolicSar(_) => IndicatorKind::ParabolicSar,
            IndicatorParams::ChaikinOscillator(_) => IndicatorKind::ChaikinOscillator,
            IndicatorParams::Tema(_) => IndicatorKind::Tema,
            IndicatorParams::Vroc(_) => IndicatorKind::Vroc,
            IndicatorParams::Macd(_) => IndicatorKind::Macd,
            IndicatorParams::BollingerBands(_) => IndicatorKind::BollingerBands,
        }
    }

    /// Construct the indicator on `input`, computing its TiData.
    pub fn build(self, input: TimeSeries) -> Result<Box<dyn TechnicalIndicator>> {
        let indicator: Box<dyn TechnicalIndicator> = match self {
            IndicatorParams::Momentum(p) => Box::new(Momentum::new(input, p)?),
            IndicatorParams::Rsi(p) => Box::new(RelativeStrengthIndex::new(input, p)?),
            IndicatorParams::ParabolicSar(p) => Box::new(ParabolicSar::new(input, p)?),
            IndicatorParams::ChaikinOscillator(p) => Box::new(ChaikinOscillator::new(input, p)?),
            IndicatorParams::Tema(p) => Box::new(TripleExponentialMovingAverage::new(input, p)?),
            IndicatorParams::Vroc(p) => Box::new(VolumeRateOfChange::new(input, p)?),
            IndicatorParams::Macd(p) => Box::new(Macd::new(input, p)?),
            IndicatorParams::BollingerBands(p) => Box::new(BollingerBands::new(input, p)?),
        };
        debug!(
            indicator = indicator.name(),
            rows = indicator.input().len(),
            "Built indicator"
        );
        Ok(indicator)
    }
}
