use std::ops::Range;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Classification,
    Regression,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Classification => write!(f, "classification"),
            TaskType::Regression => write!(f, "regression"),
        }
    }
}

/// Which query variant of a dataset to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn suffix(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

impl std::str::FromStr for Split {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "train" => Ok(Split::Train),
            "test" => Ok(Split::Test),
            other => Err(format!("unknown split: {other} (expected train or test)")),
        }
    }
}

/// Row-major `f32` features. Missing values are `NaN`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureMatrix {
    data: Vec<f32>,
    n_rows: usize,
    n_features: usize,
}

impl FeatureMatrix {
    pub fn new(data: Vec<f32>, n_rows: usize, n_features: usize) -> Option<Self> {
        if data.len() != n_rows * n_features {
            return None;
        }
        Some(Self {
            data,
            n_rows,
            n_features,
        })
    }

    pub fn from_rows(rows: &[Vec<f32>]) -> Option<Self> {
        let n_features = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != n_features) {
            return None;
        }
        let data = rows.iter().flatten().copied().collect();
        Self::new(data, rows.len(), n_features)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn as_slice(&self) -> FeatureSlice<'_> {
        self.rows(0..self.n_rows)
    }

    /// Borrow a contiguous block of rows. Panics if `range` is out of bounds.
    pub fn rows(&self, range: Range<usize>) -> FeatureSlice<'_> {
        let n_rows = range.len();
        let start = range.start * self.n_features;
        FeatureSlice {
            data: &self.data[start..start + n_rows * self.n_features],
            n_rows,
            n_features: self.n_features,
        }
    }
}

/// Borrowed view of consecutive rows of a [`FeatureMatrix`].
#[derive(Clone, Copy, Debug)]
pub struct FeatureSlice<'a> {
    data: &'a [f32],
    n_rows: usize,
    n_features: usize,
}

impl<'a> FeatureSlice<'a> {
    pub fn data(&self) -> &'a [f32] {
        self.data
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn row(&self, idx: usize) -> &'a [f32] {
        &self.data[idx * self.n_features..][..self.n_features]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &'a [f32]> + 'a {
        let slice = *self;
        (0..slice.n_rows).map(move |i| slice.row(i))
    }
}

/// A fetched dataset. Row order is the order predictions are reported in.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub name: String,
    pub task: TaskType,
    pub feature_names: Vec<String>,
    pub features: FeatureMatrix,
    pub labels: Option<Vec<f64>>,
}

impl Dataset {
    pub fn n_rows(&self) -> usize {
        self.features.n_rows()
    }
}
