use std::thread;
use std::time::Duration;

use common::{Column, Error, Result, Signal, TimeSeries};
use engine::{walk_forward, FeatureAggregator, FeatureTask};
use indicators::{IndicatorSpec, TechnicalIndicator, TiData};

fn series(n: usize) -> TimeSeries {
    let close: Vec<f64> = (0..n).map(|i| 50.0 + (i as f64 / 3.0).sin() * 4.0).collect();
    let high = close.iter().map(|c| c + 1.0).collect();
    let low = close.iter().map(|c| c - 1.0).collect();
    let volume = (0..n).map(|i| 1_000.0 + (i % 7) as f64 * 50.0).collect();
    TimeSeries::daily(vec![
        (Column::Close, close),
        (Column::High, high),
        (Column::Low, low),
        (Column::Volume, volume),
    ])
    .unwrap()
}

/// Delegates to a real indicator but sleeps in every signal evaluation.
struct Slow {
    inner: Box<dyn TechnicalIndicator>,
    delay: Duration,
}

impl TechnicalIndicator for Slow {
    fn name(&self) -> &'static str {
        self.inner.name()
    }
    fn input(&self) -> &TimeSeries {
        self.inner.input()
    }
    fn ti_data(&self) -> &TiData {
        self.inner.ti_data()
    }
    fn calculate(&self, input: &TimeSeries) -> Result<TiData> {
        self.inner.calculate(input)
    }
    fn min_history(&self) -> usize {
        self.inner.min_history()
    }
    fn signal_lookback(&self) -> usize {
        self.inner.signal_lookback()
    }
    fn signal_rule(&self, input: &TimeSeries, ti: &TiData) -> Signal {
        thread::sleep(self.delay);
        self.inner.signal_rule(input, ti)
    }
}

/// Panics as soon as a signal is requested.
struct Broken {
    inner: Box<dyn TechnicalIndicator>,
}

impl TechnicalIndicator for Broken {
    fn name(&self) -> &'static str {
        "broken"
    }
    fn input(&self) -> &TimeSeries {
        self.inner.input()
    }
    fn ti_data(&self) -> &TiData {
        self.inner.ti_data()
    }
    fn calculate(&self, input: &TimeSeries) -> Result<TiData> {
        self.inner.calculate(input)
    }
    fn min_history(&self) -> usize {
        1
    }
    fn signal_lookback(&self) -> usize {
        1
    }
    fn signal_rule(&self, _input: &TimeSeries, _ti: &TiData) -> Signal {
        panic!("signal rule exploded")
    }
}

fn build(spec: &IndicatorSpec, input: &TimeSeries) -> Box<dyn TechnicalIndicator> {
    spec.build(input.clone()).unwrap()
}

#[test]
fn order_survives_scheduling_skew() {
    let input = series(40);
    let specs = vec![
        IndicatorSpec::new("rsi").with_param("period", 5),
        IndicatorSpec::new("tema").with_param("period", 3),
        IndicatorSpec::new("bollinger_bands").with_param("period", 8),
        IndicatorSpec::new("momentum").with_param("period", 4),
    ];

    let sequential: Vec<Vec<Signal>> = specs
        .iter()
        .map(|spec| walk_forward(build(spec, &input).as_ref()).unwrap())
        .collect();

    // the first task is by far the slowest, so it finishes last
    let tasks: Vec<FeatureTask> = specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let delay = if i == 0 { Duration::from_millis(3) } else { Duration::ZERO };
            let slow = Slow {
                inner: build(spec, &input),
                delay,
            };
            FeatureTask::new(spec.feature_name(), Box::new(slow))
        })
        .collect();

    let columns = FeatureAggregator::new(Some(4)).unwrap().run(tasks).unwrap();

    let labels: Vec<String> = columns.iter().map(|c| c.label.clone()).collect();
    let expected: Vec<String> = specs.iter().map(|s| s.feature_name()).collect();
    assert_eq!(labels, expected);
    for (column, signals) in columns.iter().zip(&sequential) {
        assert_eq!(&column.signals, signals, "{}", column.label);
    }
}

#[test]
fn pool_size_does_not_change_output() {
    let input = series(60);
    let run = |pool: usize| {
        let tasks = IndicatorSpec::all_defaults()
            .iter()
            .map(|s| FeatureTask::new(s.feature_name(), build(s, &input)))
            .collect();
        FeatureAggregator::new(Some(pool)).unwrap().run(tasks).unwrap()
    };
    assert_eq!(run(1), run(3));
}

#[test]
fn failing_task_aborts_the_run() {
    let input = series(30);
    let tasks = vec![
        FeatureTask::new("tema", build(&IndicatorSpec::new("tema"), &input)),
        FeatureTask::new(
            "broken",
            Box::new(Broken {
                inner: build(&IndicatorSpec::new("tema"), &input),
            }),
        ),
    ];

    let err = FeatureAggregator::new(Some(2)).unwrap().run(tasks).unwrap_err();
    match err {
        Error::AggregationFailure { indicator, source } => {
            assert_eq!(indicator, "broken");
            assert!(matches!(*source, Error::Worker(ref msg) if msg.contains("exploded")));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn slow_run_times_out() {
    let input = series(20);
    let slow = Slow {
        inner: build(&IndicatorSpec::new("tema"), &input),
        delay: Duration::from_millis(20),
    };
    let tasks = vec![FeatureTask::new("tema", Box::new(slow))];

    let err = FeatureAggregator::new(Some(1))
        .unwrap()
        .run_with_timeout(tasks, Duration::from_millis(10))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AggregationTimeout(_)));
}

#[tokio::test]
async fn fast_run_finishes_within_timeout() {
    let input = series(20);
    let tasks = vec![FeatureTask::new("tema", build(&IndicatorSpec::new("tema"), &input))];

    let columns = FeatureAggregator::new(Some(1))
        .unwrap()
        .run_with_timeout(tasks, Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(columns[0].signals.len(), 20);
}
