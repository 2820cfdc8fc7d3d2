use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use common::{Column, Error, Result, TimeSeries};
use engine::{FeatureAggregator, FeatureTask, SignalColumn};
use indicators::IndicatorParams;

use crate::config::{MlDataConfig, WarmupPolicy};
use crate::data::MlData;
use crate::labels::LabelGenerator;

/// Feature values at the last row of a series, for prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestFeatures {
    pub timestamp: DateTime<Utc>,
    pub feature_names: Vec<String>,
    pub values: Vec<f64>,
}

/// Work prepared before the parallel stage runs.
struct Plan {
    tasks: Vec<FeatureTask>,
    first_row: usize,
}

/// Turns an OHLCV series into an aligned feature matrix and label vector.
///
/// Configuration is validated once, in [`MlDataAssembler::new`], so a bad
/// indicator name or keyword fails before any series is touched. Indicator
/// construction and labelling run on the calling thread; only the
/// walk-forward replay is spread over the worker pool.
#[derive(Debug, Clone)]
pub struct MlDataAssembler {
    config: MlDataConfig,
    params: Vec<IndicatorParams>,
    aggregator: FeatureAggregator,
    labels: LabelGenerator,
}

impl MlDataAssembler {
    pub fn new(config: MlDataConfig) -> Result<Self> {
        let params = config.validate()?;
        let aggregator = FeatureAggregator::new(config.pool_size)?;
        let labels = LabelGenerator::new(config.horizon, config.tie_break)?;
        Ok(Self {
            config,
            params,
            aggregator,
            labels,
        })
    }

    pub fn config(&self) -> &MlDataConfig {
        &self.config
    }

    /// Build the matrix, blocking until the worker pool is done.
    ///
    /// With a configured timeout this drives a private single-threaded tokio
    /// runtime, and fails with `Error::Worker` when called from inside an
    /// async context; use [`MlDataAssembler::assemble_async`] there.
    pub fn assemble(&self, series: &TimeSeries) -> Result<MlData> {
        if self.config.timeout.is_some() && tokio::runtime::Handle::try_current().is_ok() {
            return Err(Error::Worker(
                "assemble with a timeout cannot block inside a tokio runtime; use assemble_async"
                    .into(),
            ));
        }
        let started = Instant::now();
        let plan = self.prepare(series)?;
        let columns = match self.config.timeout {
            None => self.aggregator.run(plan.tasks)?,
            Some(timeout) => tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?
                .block_on(self.aggregator.run_with_timeout(plan.tasks, timeout))?,
        };
        self.finish(series, plan.first_row, columns, started)
    }

    pub async fn assemble_async(&self, series: &TimeSeries) -> Result<MlData> {
        let started = Instant::now();
        let plan = self.prepare(series)?;
        let columns = match self.config.timeout {
            None => {
                let aggregator = self.aggregator.clone();
                let tasks = plan.tasks;
                tokio::task::spawn_blocking(move || aggregator.run(tasks))
                    .await
                    .map_err(|e| Error::Worker(format!("aggregation task failed: {e}")))??
            }
            Some(timeout) => self.aggregator.run_with_timeout(plan.tasks, timeout).await?,
        };
        self.finish(series, plan.first_row, columns, started)
    }

    /// Current signal of every configured indicator plus the passthrough
    /// values, all taken at the last row of `series`.
    pub fn latest_features(&self, series: &TimeSeries) -> Result<LatestFeatures> {
        let last = series.len().checked_sub(1).ok_or_else(|| {
            Error::InvalidInputType("input series is empty".into())
        })?;

        let mut values = Vec::with_capacity(self.params.len() + 2);
        for params in &self.params {
            let indicator = params.build(series.clone())?;
            values.push(indicator.signal().code() as f64);
        }
        self.push_passthrough(series, last, &mut values)?;

        Ok(LatestFeatures {
            timestamp: series.index()[last],
            feature_names: self.config.feature_names(),
            values,
        })
    }

    /// Series-dependent checks and sequential indicator construction.
    fn prepare(&self, series: &TimeSeries) -> Result<Plan> {
        let rows = series.len();
        let horizon = self.labels.horizon();
        if horizon >= rows {
            return Err(Error::InsufficientHistory {
                what: "label horizon".into(),
                required: horizon + 1,
                available: rows,
            });
        }
        if self.config.include_volume {
            series.require(Column::Volume, "volume passthrough")?;
        }

        info!(
            rows,
            indicators = self.params.len(),
            horizon,
            "Assembling ML data"
        );

        let names = self.config.feature_names();
        let mut tasks = Vec::with_capacity(self.params.len());
        let mut warmup = 0;
        for (params, label) in self.params.iter().zip(names) {
            let indicator = params.build(series.clone())?;
            warmup = warmup.max(indicator.warmup_rows());
            tasks.push(FeatureTask::new(label, indicator));
        }

        let first_row = match self.config.warmup {
            WarmupPolicy::HoldFill => 0,
            WarmupPolicy::Trim => warmup.saturating_sub(1),
        };
        Ok(Plan { tasks, first_row })
    }

    fn finish(
        &self,
        series: &TimeSeries,
        first_row: usize,
        columns: Vec<SignalColumn>,
        started: Instant,
    ) -> Result<MlData> {
        let total = series.len();
        let labels = self.labels.generate(series.close());

        let mut index = Vec::new();
        let mut rows = Vec::new();
        let mut kept = Vec::new();
        for (t, label) in labels.iter().enumerate().skip(first_row) {
            let Some(label) = label else { continue };
            let mut row: Vec<f64> = columns
                .iter()
                .map(|c| c.signals[t].code() as f64)
                .collect();
            self.push_passthrough(series, t, &mut row)?;
            index.push(series.index()[t]);
            rows.push(row);
            kept.push(*label);
        }

        if rows.is_empty() {
            return Err(Error::InsufficientHistory {
                what: "labelled rows after warm-up".into(),
                required: first_row + self.labels.horizon() + 1,
                available: total,
            });
        }

        debug!(
            trimmed = total - rows.len(),
            warmup_rows = first_row,
            "Dropped rows without a valid label or feature"
        );
        let data = MlData::new(index, self.config.feature_names(), rows, kept)?;
        info!(
            rows = data.len(),
            columns = data.feature_names.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ML data assembled"
        );
        Ok(data)
    }

    fn push_passthrough(&self, series: &TimeSeries, t: usize, row: &mut Vec<f64>) -> Result<()> {
        if self.config.include_close {
            row.push(series.close()[t]);
        }
        if self.config.include_volume {
            row.push(series.require(Column::Volume, "volume passthrough")?[t]);
        }
        Ok(())
    }
}
