use serde::{Deserialize, Serialize};

use common::{Error, Label, Result};

/// What a zero price change over the horizon is labelled as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// `close[t+h] - close[t] <= 0` is DOWN.
    #[default]
    Down,
    /// Zero-difference rows get no label and are dropped from the matrix.
    Unlabeled,
}

/// Forward price-direction labels over a fixed horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelGenerator {
    horizon: usize,
    tie: TieBreak,
}

impl LabelGenerator {
    pub fn new(horizon: usize, tie: TieBreak) -> Result<Self> {
        if horizon == 0 {
            return Err(Error::Config("label horizon must be at least 1".into()));
        }
        Ok(Self { horizon, tie })
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie
    }

    /// One entry per row of `close`.
    ///
    /// The last `horizon` rows have no future reference and are `None`, as
    /// are ties under [`TieBreak::Unlabeled`].
    pub fn generate(&self, close: &[f64]) -> Vec<Option<Label>> {
        let h = self.horizon;
        (0..close.len())
            .map(|t| {
                let future = close.get(t + h)?;
                let diff = future - close[t];
                if diff > 0.0 {
                    Some(Label::Up)
                } else if diff < 0.0 || self.tie == TieBreak::Down {
                    Some(Label::Down)
                } else {
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_step_labels() {
        let labels = LabelGenerator::new(1, TieBreak::Down)
            .unwrap()
            .generate(&[10.0, 12.0, 11.0, 11.0, 15.0]);
        assert_eq!(
            labels,
            vec![
                Some(Label::Up),
                Some(Label::Down),
                Some(Label::Down),
                Some(Label::Up),
                None
            ]
        );
    }

    #[test]
    fn ties_can_stay_unlabeled() {
        let labels = LabelGenerator::new(1, TieBreak::Unlabeled)
            .unwrap()
            .generate(&[10.0, 12.0, 11.0, 11.0, 15.0]);
        assert_eq!(labels[2], None);
        assert_eq!(labels[1], Some(Label::Down));
    }

    #[test]
    fn longer_horizon_trims_more_rows() {
        let labels = LabelGenerator::new(2, TieBreak::Down)
            .unwrap()
            .generate(&[1.0, 2.0, 3.0, 0.5]);
        assert_eq!(labels, vec![Some(Label::Up), Some(Label::Down), None, None]);
    }

    #[test]
    fn zero_horizon_rejected() {
        assert!(matches!(
            LabelGenerator::new(0, TieBreak::Down),
            Err(Error::Config(_))
        ));
    }
}
