//! Benchmark configuration.
//!
//! The JSON document maps dataset names to query settings and carries the
//! database block and the ensemble shape. [`RunConfig`] is the immutable value
//! assembled once per invocation and passed to every phase.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use treebench_core::{BenchError, BenchResult, Device, ModelKey, Split, TaskType};

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct PgSqlConfig {
    pub username: String,
    pub password: String,
    pub host: String,
    #[serde(deserialize_with = "string_or_number")]
    pub port: String,
    pub dbname: String,
}

impl PgSqlConfig {
    pub fn url(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.dbname
        )
    }

    /// Connection target without credentials, for logs.
    pub fn display_target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.dbname)
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Str(String),
        Num(u64),
    }
    Ok(match Port::deserialize(d)? {
        Port::Str(s) => s,
        Port::Num(n) => n.to_string(),
    })
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct DatasetConfig {
    /// Base query name; the split suffix is appended at fetch time.
    pub query: String,
    #[serde(rename = "type")]
    pub task: TaskType,
    pub y_col: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BenchConfig {
    pub pgsqlconfig: Option<PgSqlConfig>,
    pub num_trees: Option<usize>,
    pub depth: Option<usize>,
    #[serde(flatten)]
    pub datasets: BTreeMap<String, DatasetConfig>,
}

impl BenchConfig {
    pub fn from_json_str(raw: &str) -> BenchResult<Self> {
        serde_json::from_str(raw).map_err(|e| BenchError::config(format!("invalid config: {e}")))
    }

    pub fn load(path: &Path) -> BenchResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BenchError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn dataset(&self, name: &str) -> BenchResult<&DatasetConfig> {
        self.datasets
            .get(name)
            .ok_or_else(|| BenchError::config(format!("dataset `{name}` is not configured")))
    }

    pub fn pgsql(&self) -> BenchResult<&PgSqlConfig> {
        self.pgsqlconfig
            .as_ref()
            .ok_or_else(|| BenchError::config("missing `pgsqlconfig` block"))
    }
}

/// Everything one benchmark invocation needs, fixed before any work starts.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub dataset: String,
    pub model: String,
    pub frameworks: Vec<String>,
    pub query_size: usize,
    pub split: Split,
    pub device: Device,
    pub models_dir: PathBuf,
    pub results_dir: PathBuf,
    pub num_trees: usize,
    pub depth: usize,
}

impl RunConfig {
    pub fn model_key(&self) -> ModelKey {
        ModelKey {
            dataset: self.dataset.clone(),
            model: self.model.clone(),
            num_trees: self.num_trees,
            depth: self.depth,
        }
    }
}
