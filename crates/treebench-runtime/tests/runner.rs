use anyhow::bail;
use treebench_core::{
    Aggregation, BackendAdapter, BackendFamily, BenchError, DefaultAdapter, FeatureMatrix,
    FeatureSlice, RawOutput,
};
use treebench_runtime::{InferenceRunner, RunState, TimingLedger, INFERENCE};

fn matrix(rows: usize) -> FeatureMatrix {
    let data: Vec<Vec<f32>> = (0..rows).map(|i| vec![i as f32, 0.5]).collect();
    FeatureMatrix::from_rows(&data).unwrap()
}

/// Echoes the first feature and records every call it receives.
#[derive(Default)]
struct Recording {
    calls: Vec<(Vec<f32>, bool)>,
}

impl BackendAdapter for Recording {
    fn name(&self) -> &str {
        "recording"
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::Default
    }

    fn predict_batch(
        &mut self,
        batch: FeatureSlice<'_>,
        is_partial: bool,
    ) -> anyhow::Result<RawOutput> {
        let firsts: Vec<f32> = batch.iter_rows().map(|r| r[0]).collect();
        self.calls.push((firsts.clone(), is_partial));
        Ok(RawOutput::Values(firsts.into_iter().map(f64::from).collect()))
    }

    fn normalize(&self, raw: RawOutput) -> anyhow::Result<Vec<f64>> {
        raw.into_values()
    }
}

struct ShortBy(usize);

impl BackendAdapter for ShortBy {
    fn name(&self) -> &str {
        "short"
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::Default
    }

    fn predict_batch(
        &mut self,
        batch: FeatureSlice<'_>,
        _is_partial: bool,
    ) -> anyhow::Result<RawOutput> {
        Ok(RawOutput::Values(vec![0.0; batch.n_rows().saturating_sub(self.0)]))
    }

    fn normalize(&self, raw: RawOutput) -> anyhow::Result<Vec<f64>> {
        raw.into_values()
    }
}

#[test]
fn ten_rows_in_threes_keep_row_order() {
    let features = matrix(10);
    let mut ledger = TimingLedger::new();
    let mut runner = InferenceRunner::new(Recording::default(), 3);

    let preds = runner.run(&features, &mut ledger).unwrap();

    assert_eq!(preds, (0..10).map(f64::from).collect::<Vec<_>>());
    assert_eq!(runner.state(), RunState::Done);
    assert!(ledger.get(INFERENCE).is_some());

    let calls = &runner.adapter().calls;
    let sizes: Vec<_> = calls.iter().map(|(rows, _)| rows.len()).collect();
    assert_eq!(sizes, vec![3, 3, 3, 1]);
    let partial: Vec<_> = calls.iter().map(|(_, p)| *p).collect();
    assert_eq!(partial, vec![false, false, false, true]);
}

#[test]
fn empty_dataset_yields_empty_sequence() {
    let features = FeatureMatrix::default();
    let mut ledger = TimingLedger::new();
    let mut runner = InferenceRunner::new(Recording::default(), 8);

    let preds = runner.run(&features, &mut ledger).unwrap();
    assert!(preds.is_empty());
    assert!(runner.adapter().calls.is_empty());
    assert_eq!(runner.state(), RunState::Done);
}

#[test]
fn short_output_is_a_contract_violation() {
    let features = matrix(7);
    let mut ledger = TimingLedger::new();
    let mut runner = InferenceRunner::new(ShortBy(1), 4);

    let err = runner.run(&features, &mut ledger).unwrap_err();
    match err {
        BenchError::AdapterOutputMismatch {
            batch,
            expected,
            actual,
            ..
        } => {
            assert_eq!((batch, expected, actual), (0, 4, 3));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(runner.state(), RunState::Failed);
    assert!(ledger.get(INFERENCE).is_none());
}

#[test]
fn backend_failure_mid_run_discards_partial_output() {
    let features = matrix(6);
    let mut ledger = TimingLedger::new();
    let mut seen = 0;
    let adapter = DefaultAdapter::new("flaky", move |b: FeatureSlice<'_>| -> anyhow::Result<Vec<f64>> {
        seen += 1;
        if seen == 2 {
            bail!("device lost");
        }
        Ok(vec![1.0; b.n_rows()])
    });
    let mut runner = InferenceRunner::new(adapter, 2);

    let err = runner.run(&features, &mut ledger).unwrap_err();
    assert!(matches!(err, BenchError::BackendFailure { ref backend, .. } if backend == "flaky"));
    assert!(err.to_string().contains("device lost"));
    assert_eq!(runner.state(), RunState::Failed);
}

#[test]
fn zero_batch_size_fails_before_any_prediction() {
    let features = matrix(3);
    let mut ledger = TimingLedger::new();
    let mut runner = InferenceRunner::new(Recording::default(), 0);

    assert!(matches!(
        runner.run(&features, &mut ledger),
        Err(BenchError::InvalidArgument(_))
    ));
    assert!(runner.adapter().calls.is_empty());
}

struct FixedWidth;

impl BackendAdapter for FixedWidth {
    fn name(&self) -> &str {
        "fixed"
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::ConvertedTensor
    }

    fn predict_batch(
        &mut self,
        batch: FeatureSlice<'_>,
        _is_partial: bool,
    ) -> anyhow::Result<RawOutput> {
        Ok(RawOutput::Values(vec![0.0; batch.n_rows()]))
    }

    fn normalize(&self, raw: RawOutput) -> anyhow::Result<Vec<f64>> {
        raw.into_values()
    }

    fn fixed_batch_width(&self) -> Option<usize> {
        Some(16)
    }
}

#[test]
fn fixed_width_backend_rejects_other_batch_sizes() {
    let features = matrix(3);
    let mut ledger = TimingLedger::new();

    let mut runner = InferenceRunner::new(FixedWidth, 8);
    assert!(matches!(
        runner.run(&features, &mut ledger),
        Err(BenchError::InvalidArgument(_))
    ));

    let mut runner = InferenceRunner::new(FixedWidth, 16);
    assert_eq!(runner.run(&features, &mut ledger).unwrap().len(), 3);
}

#[test]
fn repeated_runs_are_identical() {
    let features = matrix(11);
    let mut first_ledger = TimingLedger::new();
    let mut second_ledger = TimingLedger::new();

    let first = InferenceRunner::new(Recording::default(), 4)
        .run(&features, &mut first_ledger)
        .unwrap();
    let second = InferenceRunner::new(Recording::default(), 4)
        .run(&features, &mut second_ledger)
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn boxed_adapters_run_through_the_same_runner() {
    let features = matrix(5);
    let mut ledger = TimingLedger::new();
    let adapter: Box<dyn BackendAdapter> = Box::new(Recording::default());
    assert_eq!(adapter.aggregation(1), Aggregation::Extend);

    let mut runner = InferenceRunner::new(adapter, 2);
    assert_eq!(runner.run(&features, &mut ledger).unwrap().len(), 5);
}
