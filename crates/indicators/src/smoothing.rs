//! Rolling and recursive averages shared by the indicator formulas.
//!
//! Every function here is causal: output `i` only reads inputs `0..=i`, which
//! is what lets walk-forward replay reuse full-history results.

/// Exponential moving average with `alpha = 2 / (span + 1)`.
///
/// Non-adjusted recursive form seeded with the first finite value. Non-finite
/// inputs leave the average unchanged and do not count as observations.
/// Rows before `min_periods` observations are `NaN`.
pub fn ewm(values: &[f64], span: usize, min_periods: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut avg: Option<f64> = None;
    let mut seen = 0usize;

    values
        .iter()
        .map(|&v| {
            if v.is_finite() {
                seen += 1;
                avg = Some(match avg {
                    None => v,
                    Some(prev) => prev + alpha * (v - prev),
                });
            }
            match avg {
                Some(a) if seen >= min_periods => a,
                _ => f64::NAN,
            }
        })
        .collect()
}

/// Simple moving average over a full window; `NaN` until `period` rows exist
/// or when the window holds a non-finite value.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| w.iter().sum::<f64>() / period as f64)
}

/// Sum over a full window.
pub fn rolling_sum(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| w.iter().sum())
}

/// Sample standard deviation (n - 1) over a full window.
pub fn rolling_std(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| {
        if w.len() < 2 {
            return f64::NAN;
        }
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let var = w.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (w.len() - 1) as f64;
        var.sqrt()
    })
}

fn rolling(values: &[f64], period: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return f64::NAN;
            }
            let window = &values[i + 1 - period..=i];
            if window.iter().all(|v| v.is_finite()) {
                f(window)
            } else {
                f64::NAN
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ewm_is_seeded_with_first_value() {
        let out = ewm(&[10.0, 20.0], 3, 1);
        // alpha = 0.5
        assert_eq!(out, vec![10.0, 15.0]);
    }

    #[test]
    fn ewm_masks_until_min_periods() {
        let out = ewm(&[1.0, 2.0, 3.0], 2, 2);
        assert!(out[0].is_nan());
        assert!(out[1].is_finite());
    }

    #[test]
    fn ewm_skips_leading_nan() {
        let out = ewm(&[f64::NAN, f64::NAN, 4.0, 4.0], 5, 2);
        assert!(out[2].is_nan());
        assert_eq!(out[3], 4.0);
    }

    #[test]
    fn sma_window() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0], 2);
        assert!(out[0].is_nan());
        assert_eq!(&out[1..], &[1.5, 2.5, 3.5]);
    }

    #[test]
    fn rolling_std_matches_sample_formula() {
        let out = rolling_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8);
        let expected = (32.0f64 / 7.0).sqrt();
        assert!((out[7] - expected).abs() < 1e-12);
    }

    #[test]
    fn causal_outputs() {
        let full = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        let head = &full[..5];
        assert_eq!(&ewm(&full, 3, 2)[..5], &ewm(head, 3, 2)[..]);
        let a = sma(&full, 3);
        let b = sma(head, 3);
        assert!(a[..5].iter().zip(&b).all(|(x, y)| x.to_bits() == y.to_bits()));
    }
}
