use proptest::prelude::*;

use common::{Column, Signal, TimeSeries};
use indicators::{IndicatorKind, ParamMap};

fn ohlcv() -> impl Strategy<Value = TimeSeries> {
    prop::collection::vec((10.0f64..100.0, 0.0f64..5.0, 1.0f64..1_000.0), 30..140).prop_map(
        |rows| {
            let close: Vec<f64> = rows.iter().map(|r| r.0).collect();
            let high = rows.iter().map(|r| r.0 + r.1).collect();
            let low = rows.iter().map(|r| r.0 - r.1).collect();
            let volume = rows.iter().map(|r| r.2).collect();
            TimeSeries::daily(vec![
                (Column::Close, close),
                (Column::High, high),
                (Column::Low, low),
                (Column::Volume, volume),
            ])
            .unwrap()
        },
    )
}

fn small_params(kind: IndicatorKind) -> ParamMap {
    let pairs: Vec<(&str, toml::Value)> = match kind {
        IndicatorKind::Momentum => vec![("period", 4.into())],
        IndicatorKind::Rsi => vec![("period", 5.into())],
        IndicatorKind::Tema | IndicatorKind::Vroc => vec![("period", 3.into())],
        IndicatorKind::Macd => vec![("fast", 3.into()), ("slow", 7.into()), ("signal", 4.into())],
        IndicatorKind::BollingerBands => vec![("period", 6.into())],
        IndicatorKind::ParabolicSar | IndicatorKind::ChaikinOscillator => vec![],
    };
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

proptest! {
    /// TiData computed on a prefix equals the prefix of full-history TiData.
    #[test]
    fn ti_data_is_prefix_consistent(series in ohlcv(), cut_frac in 0.0f64..1.0) {
        for kind in IndicatorKind::ALL {
            let params = small_params(kind);
            let full = kind.build(series.clone(), &params).unwrap();
            let min = full.min_history();
            let cut = min + ((series.len() - min) as f64 * cut_frac) as usize;

            let fresh = kind.build(series.prefix(cut), &params).unwrap();
            prop_assert!(
                fresh.ti_data().bit_eq(&full.ti_data().prefix(cut)),
                "{} diverged on a {}-row prefix", kind, cut
            );
        }
    }

    /// Same input and parameters give bit-identical TiData and signals.
    #[test]
    fn construction_is_idempotent(series in ohlcv()) {
        for kind in IndicatorKind::ALL {
            let params = small_params(kind);
            let a = kind.build(series.clone(), &params).unwrap();
            let b = kind.build(series.clone(), &params).unwrap();
            prop_assert!(a.ti_data().bit_eq(b.ti_data()));
            for rows in 0..=series.len() {
                prop_assert_eq!(a.signal_at(rows), b.signal_at(rows));
            }
        }
    }

    /// Below the lookback floor every formula holds.
    #[test]
    fn hold_below_minimum_lookback(series in ohlcv()) {
        for kind in IndicatorKind::ALL {
            let indicator = kind.build(series.clone(), &small_params(kind)).unwrap();
            let floor = indicator.min_history().max(indicator.signal_lookback());
            for rows in 0..floor.min(series.len()) {
                prop_assert_eq!(indicator.signal_at(rows), Signal::Hold, "{} at {} rows", kind, rows);
            }
        }
    }

    /// Signals are HOLD through the warm-up, and the first post-warm-up row
    /// reads only defined TiData.
    #[test]
    fn warmup_rows_bound_undefined_data(series in ohlcv()) {
        for kind in IndicatorKind::ALL {
            let indicator = kind.build(series.clone(), &small_params(kind)).unwrap();
            let warmup = indicator.warmup_rows();
            for rows in 0..warmup.min(series.len() + 1) {
                prop_assert_eq!(indicator.signal_at(rows), Signal::Hold, "{} at {} rows", kind, rows);
            }
            if warmup <= series.len() {
                let ti = indicator.ti_data().prefix(warmup);
                let depth = indicator.signal_depth();
                for name in ti.names() {
                    let tail = ti.tail(name, depth).unwrap();
                    prop_assert!(tail.iter().all(|v| v.is_finite()), "{}.{} undefined", kind, name);
                }
            }
        }
    }

    /// `calculate` on the stored input reproduces the stored TiData.
    #[test]
    fn calculate_matches_stored(series in ohlcv()) {
        for kind in IndicatorKind::ALL {
            let indicator = kind.build(series.clone(), &small_params(kind)).unwrap();
            let again = indicator.calculate(indicator.input()).unwrap();
            prop_assert!(again.bit_eq(indicator.ti_data()));
        }
    }
}
