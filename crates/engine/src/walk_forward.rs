use common::{Error, Result, Signal};
use indicators::TechnicalIndicator;

/// Signals an observer would have computed at each row of the indicator's
/// input, using only the rows up to and including that one.
///
/// Full-history TiData is reused through prefix views: every formula is
/// causal, so the first `i + 1` rows of it equal what a fresh indicator on
/// those rows would compute. Rows below the construction minimum are HOLD.
pub fn walk_forward(indicator: &dyn TechnicalIndicator) -> Result<Vec<Signal>> {
    let rows = indicator.input().len();
    let ti_rows = indicator.ti_data().len();
    if ti_rows != rows {
        return Err(Error::InvalidInputType(format!(
            "{} data has {ti_rows} rows but its input has {rows}",
            indicator.name()
        )));
    }

    Ok((1..=rows).map(|n| indicator.signal_at(n)).collect())
}

/// [`walk_forward`] as buy = -1 / hold = 0 / sell = 1 codes.
pub fn walk_forward_codes(indicator: &dyn TechnicalIndicator) -> Result<Vec<i8>> {
    Ok(walk_forward(indicator)?.into_iter().map(Signal::code).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Column, TimeSeries};
    use indicators::{IndicatorSpec, ParamMap};

    fn closes(values: &[f64]) -> TimeSeries {
        TimeSeries::daily(vec![(Column::Close, values.to_vec())]).unwrap()
    }

    #[test]
    fn one_signal_per_row() {
        let spec = IndicatorSpec::new("tema").with_param("period", 2);
        let indicator = spec.build(closes(&[1.0, 2.0, 3.0, 2.0, 1.0, 5.0])).unwrap();
        assert_eq!(walk_forward(indicator.as_ref()).unwrap().len(), 6);
    }

    #[test]
    fn rows_before_minimum_history_hold() {
        let prices: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 10.0 } else { 12.0 }).collect();
        let indicator = indicators::IndicatorKind::Rsi
            .build(closes(&prices), &ParamMap::new())
            .unwrap();
        let signals = walk_forward(indicator.as_ref()).unwrap();
        assert!(signals[..indicator.min_history() - 1]
            .iter()
            .all(|s| *s == Signal::Hold));
    }

    #[test]
    fn last_row_matches_plain_signal() {
        let prices = [10.0, 10.0, 10.0, 10.0, 10.0, 12.0];
        let spec = IndicatorSpec::new("rsi").with_param("period", 3);
        let indicator = spec.build(closes(&prices)).unwrap();
        let codes = walk_forward_codes(indicator.as_ref()).unwrap();
        assert_eq!(codes.last().copied(), Some(indicator.signal().code()));
        assert_eq!(codes, vec![0, 0, 0, 0, 0, 1]);
    }
}
