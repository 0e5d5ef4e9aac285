use treebench_core::FeatureSlice;

/// Owned row-major copy of a batch, the native backend's input type.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeMatrix {
    data: Vec<f32>,
    n_rows: usize,
    n_features: usize,
}

impl NativeMatrix {
    pub fn from_slice(batch: FeatureSlice<'_>) -> Self {
        Self {
            data: batch.data().to_vec(),
            n_rows: batch.n_rows(),
            n_features: batch.n_features(),
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        (0..self.n_rows).map(move |i| &self.data[i * self.n_features..][..self.n_features])
    }
}
