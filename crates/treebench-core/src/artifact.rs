use std::path::{Path, PathBuf};

/// Identifies one trained model: `{dataset}_{model}_{num_trees}_{depth}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelKey {
    pub dataset: String,
    pub model: String,
    pub num_trees: usize,
    pub depth: usize,
}

impl ModelKey {
    pub fn stem(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.dataset, self.model, self.num_trees, self.depth
        )
    }

    pub fn path(&self, dir: &Path, suffix: &str, ext: &str) -> PathBuf {
        dir.join(format!("{}{suffix}.{ext}", self.stem()))
    }
}

impl std::fmt::Display for ModelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.stem())
    }
}

#[derive(Clone, Debug)]
pub enum ModelArtifact {
    /// Native forest serialized as JSON.
    ForestJson(PathBuf),
    /// Single tensor program with a dynamic batch dimension.
    OnnxPath(PathBuf),
    /// Tensor program compiled for a fixed batch width, plus an optional
    /// program for the short final batch.
    OnnxBatched {
        batch: PathBuf,
        batch_width: usize,
        remainder: Option<PathBuf>,
    },
}

impl ModelArtifact {
    pub fn primary_path(&self) -> &Path {
        match self {
            ModelArtifact::ForestJson(p) | ModelArtifact::OnnxPath(p) => p,
            ModelArtifact::OnnxBatched { batch, .. } => batch,
        }
    }
}
