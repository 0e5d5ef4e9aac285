use std::time::Instant;

use tracing::{debug, info};
use treebench_core::{Aggregation, BackendAdapter, BenchError, BenchResult, FeatureMatrix};

use crate::{plan, TimingLedger, INFERENCE};

/// Predictions index-aligned with the dataset rows.
pub type PredictionSequence = Vec<f64>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Planning,
    Running(usize),
    Aggregated,
    Done,
    Failed,
}

/// Drives one backend over a batch plan, strictly in slice order.
pub struct InferenceRunner<A> {
    adapter: A,
    query_size: usize,
    state: RunState,
}

impl<A: BackendAdapter> InferenceRunner<A> {
    pub fn new(adapter: A, query_size: usize) -> Self {
        Self {
            adapter,
            query_size,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn into_adapter(self) -> A {
        self.adapter
    }

    /// Predict every row of `features` and record `"inference time"`.
    ///
    /// On error the runner ends in [`RunState::Failed`] and partial output is
    /// dropped.
    pub fn run(
        &mut self,
        features: &FeatureMatrix,
        ledger: &mut TimingLedger,
    ) -> BenchResult<PredictionSequence> {
        let start = Instant::now();
        self.state = RunState::Planning;

        let results = match self.drive(features) {
            Ok(results) => results,
            Err(err) => {
                self.state = RunState::Failed;
                return Err(err);
            }
        };
        self.state = RunState::Aggregated;

        let ms = ledger.record(INFERENCE, start, Instant::now());
        self.state = RunState::Done;

        let framework = self.adapter.name();
        info!(%framework, rows = results.len(), ms, "inference finished");
        println!("Time Taken to predict on {framework} is {ms}");
        Ok(results)
    }

    fn drive(&mut self, features: &FeatureMatrix) -> BenchResult<PredictionSequence> {
        if let Some(width) = self.adapter.fixed_batch_width() {
            if width != self.query_size {
                return Err(BenchError::invalid(format!(
                    "{} is compiled for batch size {width}, got {}",
                    self.adapter.name(),
                    self.query_size
                )));
            }
        }

        let plan = plan(features.n_rows(), self.query_size)?;
        let aggregation = self.adapter.aggregation(self.query_size);
        let name = self.adapter.name().to_string();
        let mut results = Vec::with_capacity(plan.total_rows());

        for slice in &plan {
            self.state = RunState::Running(slice.index);
            debug!(
                backend = %name,
                batch = slice.index,
                rows = slice.len(),
                partial = slice.is_partial,
                "dispatching batch"
            );

            let batch = features.rows(slice.range.clone());
            let output = self
                .adapter
                .predict_batch(batch, slice.is_partial)
                .and_then(|raw| self.adapter.normalize(raw))
                .map_err(|e| BenchError::backend(name.clone(), e))?;

            if output.len() != slice.len() {
                return Err(BenchError::AdapterOutputMismatch {
                    backend: name,
                    batch: slice.index,
                    expected: slice.len(),
                    actual: output.len(),
                });
            }

            match aggregation {
                Aggregation::Append if output.len() == 1 => results.push(output[0]),
                _ => results.extend(output),
            }
        }

        Ok(results)
    }
}
