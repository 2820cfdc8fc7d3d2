use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};

use common::{Error, Result, Signal};
use indicators::TechnicalIndicator;

use crate::walk_forward::walk_forward;

/// One unit of parallel work: a constructed indicator and the column label its
/// signals will be stored under.
pub struct FeatureTask {
    pub label: String,
    pub indicator: Box<dyn TechnicalIndicator>,
}

impl FeatureTask {
    pub fn new(label: impl Into<String>, indicator: Box<dyn TechnicalIndicator>) -> Self {
        Self {
            label: label.into(),
            indicator,
        }
    }
}

/// Walk-forward signals of one indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalColumn {
    pub label: String,
    pub signals: Vec<Signal>,
}

/// Runs walk-forward replay for many indicators on a bounded worker pool.
///
/// Tasks share nothing mutable: each owns its indicator, and the indicators
/// only hand out read-only prefix views of their data. Output columns come
/// back in task order whatever order the workers finish in. The first failing
/// task aborts the run and no partial result is returned.
#[derive(Debug, Clone)]
pub struct FeatureAggregator {
    pool_size: usize,
}

impl FeatureAggregator {
    /// `None` sizes the pool to the available parallelism.
    pub fn new(pool_size: Option<usize>) -> Result<Self> {
        let pool_size = match pool_size {
            Some(0) => {
                return Err(Error::Config("worker pool size must be a positive integer".into()))
            }
            Some(n) => n,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        };
        Ok(Self { pool_size })
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Run every task and block until all are done.
    pub fn run(&self, tasks: Vec<FeatureTask>) -> Result<Vec<SignalColumn>> {
        let started = Instant::now();
        let task_count = tasks.len();
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.pool_size)
            .build()
            .map_err(|e| Error::Worker(format!("failed to build worker pool: {e}")))?;

        info!(tasks = task_count, pool_size = self.pool_size, "Aggregating indicator signals");

        let columns = pool.install(|| {
            tasks
                .into_par_iter()
                .map(run_task)
                .collect::<Result<Vec<SignalColumn>>>()
        })?;

        info!(
            tasks = task_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Aggregation finished"
        );
        Ok(columns)
    }

    /// [`FeatureAggregator::run`] bounded by wall time.
    ///
    /// The pool runs on a blocking task; if `timeout` elapses first the call
    /// fails with `AggregationTimeout` and the late result is dropped.
    pub async fn run_with_timeout(
        &self,
        tasks: Vec<FeatureTask>,
        timeout: Duration,
    ) -> Result<Vec<SignalColumn>> {
        let aggregator = self.clone();
        let handle = tokio::task::spawn_blocking(move || aggregator.run(tasks));

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(Error::Worker(format!("aggregation task failed: {join_err}"))),
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Aggregation timed out");
                Err(Error::AggregationTimeout(timeout))
            }
        }
    }
}

fn run_task(task: FeatureTask) -> Result<SignalColumn> {
    let FeatureTask { label, indicator } = task;
    let started = Instant::now();

    let outcome = catch_unwind(AssertUnwindSafe(|| walk_forward(indicator.as_ref())))
        .unwrap_or_else(|panic| Err(Error::Worker(panic_message(panic.as_ref()))));

    match outcome {
        Ok(signals) => {
            debug!(
                feature = %label,
                rows = signals.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Walk-forward done"
            );
            Ok(SignalColumn { label, signals })
        }
        Err(e) => {
            warn!(feature = %label, error = %e, "Walk-forward failed");
            Err(Error::AggregationFailure {
                indicator: label,
                source: Box::new(e),
            })
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Column, TimeSeries};
    use indicators::IndicatorSpec;

    fn series() -> TimeSeries {
        let close: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 / 4.0).sin() * 5.0).collect();
        TimeSeries::daily(vec![(Column::Close, close)]).unwrap()
    }

    fn task(spec: IndicatorSpec) -> FeatureTask {
        FeatureTask::new(spec.feature_name(), spec.build(series()).unwrap())
    }

    #[test]
    fn zero_pool_size_rejected() {
        assert!(matches!(FeatureAggregator::new(Some(0)), Err(Error::Config(_))));
    }

    #[test]
    fn default_pool_uses_available_parallelism() {
        assert!(FeatureAggregator::new(None).unwrap().pool_size() >= 1);
    }

    #[test]
    fn columns_follow_task_order() {
        let specs = vec![
            IndicatorSpec::new("tema"),
            IndicatorSpec::new("rsi").with_param("period", 5),
            IndicatorSpec::new("momentum").with_param("period", 3),
        ];
        let labels: Vec<String> = specs.iter().map(|s| s.feature_name()).collect();
        let columns = FeatureAggregator::new(Some(2))
            .unwrap()
            .run(specs.into_iter().map(task).collect())
            .unwrap();
        let got: Vec<String> = columns.iter().map(|c| c.label.clone()).collect();
        assert_eq!(got, labels);
        assert!(columns.iter().all(|c| c.signals.len() == 80));
    }

    #[test]
    fn empty_task_list_yields_no_columns() {
        let columns = FeatureAggregator::new(Some(1)).unwrap().run(Vec::new()).unwrap();
        assert!(columns.is_empty());
    }
}
