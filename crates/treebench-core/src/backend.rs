use anyhow::Result;

use crate::{Device, FeatureSlice, ModelArtifact, Tensor};

/// Continuous scores above this value map to the positive label.
pub const LABEL_THRESHOLD: f64 = 0.5;

/// Backend families the runner knows how to drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendFamily {
    /// Tree traversal over the backend's own matrix type; emits scores.
    NativeTree,
    /// Tensor program with a dynamic batch dimension; emits `[n, 1]` scores.
    TensorCompiled,
    /// Tensor program converted for a fixed batch width; emits labels.
    ConvertedTensor,
    /// Anything with a plain `predict(batch) -> values` call.
    Default,
}

impl std::fmt::Display for BackendFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BackendFamily::NativeTree => "native-tree",
            BackendFamily::TensorCompiled => "tensor-compiled",
            BackendFamily::ConvertedTensor => "converted-tensor",
            BackendFamily::Default => "default",
        };
        f.write_str(s)
    }
}

/// How a normalized batch joins the prediction sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aggregation {
    /// Push the single value produced for a one-row batch.
    Append,
    /// Extend with every value of the batch.
    Extend,
}

/// Whatever a backend hands back before normalization.
#[derive(Clone, Debug)]
pub enum RawOutput {
    Tensor(Tensor),
    Values(Vec<f64>),
}

impl RawOutput {
    pub fn into_values(self) -> Result<Vec<f64>> {
        match self {
            RawOutput::Tensor(t) => t.flatten().to_f64_vec(),
            RawOutput::Values(v) => Ok(v),
        }
    }
}

/// Loads a [`BackendAdapter`] from a persisted artifact.
pub trait Backend {
    type Model: BackendAdapter + 'static;

    fn name(&self) -> &'static str;
    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model>;
}

/// A loaded model bound to its prediction call.
///
/// The runner owns the adapter exclusively for one run and calls it strictly
/// in slice order.
pub trait BackendAdapter: Send {
    fn name(&self) -> &str;
    fn family(&self) -> BackendFamily;

    /// `is_partial` is true for a final batch shorter than the nominal query
    /// size. Backends without a fixed batch width ignore it.
    fn predict_batch(&mut self, batch: FeatureSlice<'_>, is_partial: bool) -> Result<RawOutput>;

    /// Flatten raw output into one value per input row.
    fn normalize(&self, raw: RawOutput) -> Result<Vec<f64>>;

    fn aggregation(&self, _query_size: usize) -> Aggregation {
        Aggregation::Extend
    }

    /// Batch width the backend was compiled for, if it only runs one.
    fn fixed_batch_width(&self) -> Option<usize> {
        None
    }
}

impl<T: BackendAdapter + ?Sized> BackendAdapter for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn family(&self) -> BackendFamily {
        (**self).family()
    }
    fn predict_batch(&mut self, batch: FeatureSlice<'_>, is_partial: bool) -> Result<RawOutput> {
        (**self).predict_batch(batch, is_partial)
    }
    fn normalize(&self, raw: RawOutput) -> Result<Vec<f64>> {
        (**self).normalize(raw)
    }
    fn aggregation(&self, query_size: usize) -> Aggregation {
        (**self).aggregation(query_size)
    }
    fn fixed_batch_width(&self) -> Option<usize> {
        (**self).fixed_batch_width()
    }
}

/// Map continuous scores to `{0, 1}` labels.
pub fn threshold_labels(scores: &[f64]) -> Vec<f64> {
    scores
        .iter()
        .map(|s| if *s > LABEL_THRESHOLD { 1.0 } else { 0.0 })
        .collect()
}

/// Plain prediction call used by [`DefaultAdapter`].
pub trait Predictor: Send {
    fn predict(&mut self, batch: FeatureSlice<'_>) -> Result<Vec<f64>>;
}

impl<F> Predictor for F
where
    F: FnMut(FeatureSlice<'_>) -> Result<Vec<f64>> + Send,
{
    fn predict(&mut self, batch: FeatureSlice<'_>) -> Result<Vec<f64>> {
        self(batch)
    }
}

/// Adapter for frameworks whose predict call already returns one value per row.
pub struct DefaultAdapter<P> {
    name: String,
    predictor: P,
}

impl<P: Predictor> DefaultAdapter<P> {
    pub fn new(name: impl Into<String>, predictor: P) -> Self {
        Self {
            name: name.into(),
            predictor,
        }
    }
}

impl<P: Predictor> BackendAdapter for DefaultAdapter<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::Default
    }

    fn predict_batch(&mut self, batch: FeatureSlice<'_>, _is_partial: bool) -> Result<RawOutput> {
        self.predictor.predict(batch).map(RawOutput::Values)
    }

    fn normalize(&self, raw: RawOutput) -> Result<Vec<f64>> {
        raw.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FeatureMatrix, Shape};

    #[test]
    fn threshold_is_strictly_greater() {
        assert_eq!(
            threshold_labels(&[0.1, 0.5, 0.5001, 0.9]),
            vec![0.0, 0.0, 1.0, 1.0]
        );
    }

    #[test]
    fn tensor_output_is_flattened() {
        let t = Tensor::from_f32(Shape::from_slice(&[3, 1]), &[0.25, 0.5, 0.75]);
        let values = RawOutput::Tensor(t).into_values().unwrap();
        assert_eq!(values, vec![0.25, 0.5, 0.75]);
    }

    #[test]
    fn default_adapter_passes_values_through() {
        let m = FeatureMatrix::from_rows(&[vec![1.0], vec![2.0]]).unwrap();
        let mut adapter = DefaultAdapter::new("double", |b: FeatureSlice<'_>| -> Result<Vec<f64>> {
            Ok(b.iter_rows().map(|r| r[0] as f64 * 2.0).collect())
        });
        let raw = adapter.predict_batch(m.as_slice(), false).unwrap();
        assert_eq!(adapter.normalize(raw).unwrap(), vec![2.0, 4.0]);
        assert_eq!(adapter.family(), BackendFamily::Default);
    }
}
