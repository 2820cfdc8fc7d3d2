pub mod config;
pub mod indicators;
pub mod params;
pub mod registry;
pub mod smoothing;
pub mod ti_data;

pub use config::{FeatureFileConfig, IndicatorSpec, ParamMap};
pub use registry::{IndicatorKind, IndicatorParams};
pub use ti_data::TiData;

use common::{Error, Result, Signal, TimeSeries};

/// All indicator formulas must satisfy this trait.
///
/// An instance owns its input series and the TiData computed from it at
/// construction. Both are immutable afterwards; looking back in time is done
/// through [`TechnicalIndicator::signal_at`], which evaluates the signal rule
/// on fresh prefix views instead of touching the stored data.
pub trait TechnicalIndicator: Send + Sync {
    /// Registry identifier, e.g. `"rsi"`.
    fn name(&self) -> &'static str;

    fn input(&self) -> &TimeSeries;

    fn ti_data(&self) -> &TiData;

    /// Recompute TiData for `input` with this instance's parameters.
    /// Row `i` of the result depends only on input rows `0..=i`.
    fn calculate(&self, input: &TimeSeries) -> Result<TiData>;

    /// Rows needed to construct the indicator at all.
    fn min_history(&self) -> usize;

    /// Rows the signal rule needs; with fewer the signal is HOLD.
    fn signal_lookback(&self) -> usize;

    /// Trailing TiData rows the signal rule reads.
    fn signal_depth(&self) -> usize {
        self.signal_lookback()
    }

    /// Rows before which the signal is HOLD for lack of data: the larger of
    /// the construction minimum, the lookback floor, and the point where
    /// `signal_depth()` rows of fully defined TiData exist. Exceeds the input
    /// length when the data never fills in.
    fn warmup_rows(&self) -> usize {
        let defined = match self.ti_data().first_complete_row() {
            Some(row) => row + self.signal_depth(),
            None => self.input().len() + 1,
        };
        self.min_history().max(self.signal_lookback()).max(defined)
    }

    /// Signal rule on the last rows of `input` and `ti`.
    /// Callers guarantee at least `signal_lookback()` rows.
    fn signal_rule(&self, input: &TimeSeries, ti: &TiData) -> Signal;

    /// Signal an observer would have seen after the first `rows` rows.
    ///
    /// HOLD when `rows` is below either the construction minimum or the
    /// signal lookback.
    fn signal_at(&self, rows: usize) -> Signal {
        let rows = rows.min(self.input().len());
        if rows < self.min_history() || rows < self.signal_lookback() {
            return Signal::Hold;
        }
        let input = self.input().prefix(rows);
        let ti = self.ti_data().prefix(rows);
        self.signal_rule(&input, &ti)
    }

    /// Signal on the full stored history.
    fn signal(&self) -> Signal {
        self.signal_at(self.input().len())
    }
}

/// Fail with `InsufficientHistory` when `input` is shorter than `required`.
pub(crate) fn ensure_history(what: &str, required: usize, input: &TimeSeries) -> Result<()> {
    if input.len() < required {
        return Err(Error::InsufficientHistory {
            what: what.to_string(),
            required,
            available: input.len(),
        });
    }
    Ok(())
}
