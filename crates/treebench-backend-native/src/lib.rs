mod forest;
mod matrix;

use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use treebench_core::{
    threshold_labels, Aggregation, Backend, BackendAdapter, BackendFamily, Device, FeatureSlice,
    ModelArtifact, Predictor, RawOutput, TaskType,
};

pub use forest::{Forest, Node, Objective, Tree};
pub use matrix::NativeMatrix;

pub struct NativeBackend;

impl NativeBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_forest(path: &Path) -> Result<Forest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read forest model {}", path.display()))?;
    Forest::from_json_str(&raw).with_context(|| format!("invalid forest model {}", path.display()))
}

impl Backend for NativeBackend {
    type Model = NativeTreeAdapter;

    fn name(&self) -> &'static str {
        "native"
    }

    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model> {
        let ModelArtifact::ForestJson(path) = artifact else {
            bail!("native backend expects a forest JSON artifact");
        };
        if device != Device::Cpu {
            bail!("native backend only runs on cpu, got {device}");
        }
        Ok(NativeTreeAdapter::new(self.name(), load_forest(path)?))
    }
}

/// Scores batches with the native forest and thresholds them into labels.
pub struct NativeTreeAdapter {
    name: String,
    forest: Forest,
}

impl NativeTreeAdapter {
    pub fn new(name: impl Into<String>, forest: Forest) -> Self {
        Self {
            name: name.into(),
            forest,
        }
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }
}

impl BackendAdapter for NativeTreeAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::NativeTree
    }

    fn predict_batch(&mut self, batch: FeatureSlice<'_>, _is_partial: bool) -> Result<RawOutput> {
        let matrix = NativeMatrix::from_slice(batch);
        ensure!(
            matrix.n_features() == self.forest.num_features,
            "model expects {} features, batch has {}",
            self.forest.num_features,
            matrix.n_features()
        );
        Ok(RawOutput::Values(self.forest.predict_rows(matrix.rows())))
    }

    fn normalize(&self, raw: RawOutput) -> Result<Vec<f64>> {
        Ok(threshold_labels(&raw.into_values()?))
    }

    fn aggregation(&self, query_size: usize) -> Aggregation {
        if query_size == 1 {
            Aggregation::Append
        } else {
            Aggregation::Extend
        }
    }
}

/// Forest `predict` returning labels for classification and raw scores for
/// regression, for use behind a `DefaultAdapter`.
pub struct ForestPredictor {
    forest: Forest,
    task: TaskType,
}

impl ForestPredictor {
    pub fn new(forest: Forest, task: TaskType) -> Self {
        Self { forest, task }
    }
}

impl Predictor for ForestPredictor {
    fn predict(&mut self, batch: FeatureSlice<'_>) -> Result<Vec<f64>> {
        ensure!(
            batch.n_features() == self.forest.num_features,
            "model expects {} features, batch has {}",
            self.forest.num_features,
            batch.n_features()
        );
        let scores = self.forest.predict_rows(batch.iter_rows());
        Ok(match self.task {
            TaskType::Classification => threshold_labels(&scores),
            TaskType::Regression => scores,
        })
    }
}
