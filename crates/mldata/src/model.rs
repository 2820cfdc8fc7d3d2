//! Boundary to whatever trains and serves the prediction model.
//!
//! The pipeline only needs a [`Predictor`]; training goes through
//! [`Trainable`]. [`KnnClassifier`] is a small reference implementation and
//! [`LoadedModel`] wraps a predictor restored from elsewhere, which can serve
//! predictions but never retrain.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use common::{Error, Label, Result};

use crate::data::MlData;

pub trait Predictor {
    fn predict(&self, row: &[f64]) -> Label;

    /// Share of `rows` whose prediction matches `labels`; 0 for no rows.
    fn score(&self, rows: &[Vec<f64>], labels: &[Label]) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        let correct = rows
            .iter()
            .zip(labels)
            .filter(|(row, label)| self.predict(row) == **label)
            .count();
        correct as f64 / rows.len() as f64
    }
}

pub trait Trainable: Predictor {
    fn train(&mut self, data: &MlData) -> Result<ModelDetails>;
}

/// Metadata stored next to a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDetails {
    pub model_type: String,
    pub training_score: f64,
    pub test_score: f64,
    pub training_instances: usize,
    pub feature_names: Vec<String>,
    /// Label code to class name.
    pub class_mapping: BTreeMap<u8, String>,
    pub scaler_used: bool,
}

impl ModelDetails {
    pub fn new(model_type: impl Into<String>, feature_names: Vec<String>) -> Self {
        Self {
            model_type: model_type.into(),
            training_score: 0.0,
            test_score: 0.0,
            training_instances: 0,
            feature_names,
            class_mapping: [Label::Down, Label::Up]
                .into_iter()
                .map(|l| (l.code(), l.to_string()))
                .collect(),
            scaler_used: false,
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// A predictor restored from a stored artifact. Training is refused.
#[derive(Debug, Clone)]
pub struct LoadedModel<P> {
    predictor: P,
    details: ModelDetails,
}

impl<P: Predictor> LoadedModel<P> {
    pub fn new(predictor: P, details: ModelDetails) -> Self {
        Self { predictor, details }
    }

    pub fn details(&self) -> &ModelDetails {
        &self.details
    }

    pub fn into_inner(self) -> P {
        self.predictor
    }
}

impl<P: Predictor> Predictor for LoadedModel<P> {
    fn predict(&self, row: &[f64]) -> Label {
        self.predictor.predict(row)
    }
}

impl<P: Predictor> Trainable for LoadedModel<P> {
    fn train(&mut self, _data: &MlData) -> Result<ModelDetails> {
        Err(Error::ModelTrainingUnsupported)
    }
}

/// Per-column standardization fitted on training rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Scaler {
    /// Population mean and standard deviation of each column. A constant
    /// column keeps a divisor of 1.
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(1) as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }
        let std = (0..width)
            .map(|j| {
                let var = rows
                    .iter()
                    .filter_map(|r| r.get(j))
                    .map(|v| (v - mean[j]).powi(2))
                    .sum::<f64>()
                    / n;
                let sd = var.sqrt();
                if sd > 0.0 && sd.is_finite() {
                    sd
                } else {
                    1.0
                }
            })
            .collect();
        Self { mean, std }
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

/// k-nearest-neighbours vote with Euclidean distance on standardized
/// features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnClassifier {
    k: usize,
    test_fraction: f64,
    scaler: Option<Scaler>,
    /// Training rows, already standardized.
    rows: Vec<Vec<f64>>,
    labels: Vec<Label>,
}

impl KnnClassifier {
    pub const MODEL_TYPE: &'static str = "knn";

    pub fn new(k: usize) -> Result<Self> {
        if k == 0 {
            return Err(Error::invalid_value(Self::MODEL_TYPE, "k", k, "a positive integer"));
        }
        Ok(Self {
            k,
            test_fraction: 0.2,
            scaler: None,
            rows: Vec::new(),
            labels: Vec::new(),
        })
    }

    /// Share of the data held out for the test score.
    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    pub fn is_fitted(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn scaler(&self) -> Option<&Scaler> {
        self.scaler.as_ref()
    }
}

impl Predictor for KnnClassifier {
    /// DOWN until fitted; vote ties go to DOWN as well.
    fn predict(&self, row: &[f64]) -> Label {
        let scaled;
        let row = match &self.scaler {
            Some(scaler) => {
                scaled = scaler.transform(row);
                scaled.as_slice()
            }
            None => row,
        };
        let mut distances: Vec<(f64, Label)> = self
            .rows
            .iter()
            .zip(&self.labels)
            .map(|(train, label)| {
                let d: f64 = train.iter().zip(row).map(|(a, b)| (a - b).powi(2)).sum();
                (d, *label)
            })
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));

        let up = distances
            .iter()
            .take(self.k)
            .filter(|(_, label)| *label == Label::Up)
            .count();
        let voters = distances.len().min(self.k);
        if up * 2 > voters {
            Label::Up
        } else {
            Label::Down
        }
    }
}

impl Trainable for KnnClassifier {
    fn train(&mut self, data: &MlData) -> Result<ModelDetails> {
        let (train, test) = data.split(self.test_fraction)?;
        let scaler = Scaler::fit(&train.rows);
        self.rows = train.rows.iter().map(|r| scaler.transform(r)).collect();
        self.labels = train.labels.clone();
        self.scaler = Some(scaler);

        let mut details = ModelDetails::new(Self::MODEL_TYPE, data.feature_names.clone());
        details.scaler_used = true;
        details.training_instances = train.len();
        details.training_score = self.score(&train.rows, &train.labels);
        details.test_score = self.score(&test.rows, &test.labels);

        info!(
            model = Self::MODEL_TYPE,
            instances = details.training_instances,
            training_score = details.training_score,
            test_score = details.test_score,
            "Model trained"
        );
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    /// Feature 0 is +1 before every rise and -1 before every fall.
    fn separable(n: usize) -> MlData {
        let start = DateTime::<Utc>::UNIX_EPOCH;
        let labels: Vec<Label> = (0..n)
            .map(|i| if i % 3 == 0 { Label::Up } else { Label::Down })
            .collect();
        let rows = labels
            .iter()
            .map(|l| vec![if *l == Label::Up { 1.0 } else { -1.0 }, 0.0])
            .collect();
        MlData::new(
            (0..n).map(|i| start + Duration::days(i as i64)).collect(),
            vec!["signal".into(), "noise".into()],
            rows,
            labels,
        )
        .unwrap()
    }

    #[test]
    fn knn_learns_separable_data() {
        let mut model = KnnClassifier::new(3).unwrap();
        let details = model.train(&separable(30)).unwrap();
        assert_eq!(details.training_instances, 24);
        assert_eq!(details.training_score, 1.0);
        assert_eq!(details.test_score, 1.0);
        assert_eq!(model.predict(&[0.9, 0.0]), Label::Up);
        assert_eq!(model.predict(&[-0.8, 0.1]), Label::Down);
    }

    #[test]
    fn large_scale_noise_does_not_drown_the_signal() {
        let mut data = separable(30);
        for (i, row) in data.rows.iter_mut().enumerate() {
            row[1] = ((i * 37) % 11) as f64 * 1000.0;
        }
        let mut model = KnnClassifier::new(3).unwrap();
        let details = model.train(&data).unwrap();
        assert!(details.scaler_used);
        assert_eq!(details.test_score, 1.0);

        let scaler = model.scaler().unwrap();
        assert_eq!(scaler.mean.len(), 2);
        assert!(scaler.std[1] > 1000.0);
    }

    #[test]
    fn constant_column_scales_by_one() {
        let scaler = Scaler::fit(&[vec![2.0, 5.0], vec![4.0, 5.0]]);
        assert_eq!(scaler.mean, vec![3.0, 5.0]);
        assert_eq!(scaler.std, vec![1.0, 1.0]);
        assert_eq!(scaler.transform(&[5.0, 5.0]), vec![2.0, 0.0]);
    }

    #[test]
    fn unfitted_model_predicts_down() {
        let model = KnnClassifier::new(1).unwrap();
        assert!(!model.is_fitted());
        assert_eq!(model.predict(&[1.0]), Label::Down);
    }

    #[test]
    fn loaded_model_refuses_training() {
        let mut trained = KnnClassifier::new(1).unwrap();
        let details = trained.train(&separable(10)).unwrap();

        let mut loaded = LoadedModel::new(trained, details);
        assert_eq!(loaded.predict(&[1.0, 0.0]), Label::Up);
        assert!(matches!(
            loaded.train(&separable(10)),
            Err(Error::ModelTrainingUnsupported)
        ));
    }

    #[test]
    fn details_survive_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let details = ModelDetails::new("knn", vec!["rsi_period_14".into()]);
        details.save(&path).unwrap();
        let loaded = ModelDetails::load(&path).unwrap();
        assert_eq!(loaded, details);
        assert_eq!(loaded.class_mapping[&1], "up");
    }

    #[test]
    fn score_is_accuracy() {
        let model = KnnClassifier::new(1).unwrap();
        let rows = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let labels = vec![Label::Down, Label::Up, Label::Down, Label::Down];
        assert_eq!(model.score(&rows, &labels), 0.75);
    }
}
