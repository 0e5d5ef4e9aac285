use std::str::FromStr;

use anyhow::Result;
use treebench_backend_native::{load_forest, ForestPredictor, NativeBackend};
use treebench_backend_ort::{ConvertedOrtBackend, OrtBackend};
use treebench_core::{
    Backend, BackendAdapter, BenchError, BenchResult, DefaultAdapter, ModelArtifact, TaskType,
};
use treebench_runtime::RunConfig;

/// Frameworks selectable on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framework {
    Native,
    Onnx,
    OnnxBatched,
    Forest,
}

impl Framework {
    pub fn name(self) -> &'static str {
        match self {
            Framework::Native => "native",
            Framework::Onnx => "onnx",
            Framework::OnnxBatched => "onnx-batched",
            Framework::Forest => "forest",
        }
    }
}

impl FromStr for Framework {
    type Err = BenchError;

    fn from_str(raw: &str) -> BenchResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(Framework::Native),
            "onnx" => Ok(Framework::Onnx),
            "onnx-batched" => Ok(Framework::OnnxBatched),
            "forest" => Ok(Framework::Forest),
            other => Err(BenchError::config(format!(
                "unknown framework `{other}` (expected native, onnx, onnx-batched or forest)"
            ))),
        }
    }
}

/// Where the persisted model for `framework` lives. `run.query_size` is
/// nonzero.
pub fn artifact_for(framework: Framework, run: &RunConfig, total_rows: usize) -> ModelArtifact {
    let key = run.model_key();
    let dir = run.models_dir.as_path();
    match framework {
        Framework::Native | Framework::Forest => {
            ModelArtifact::ForestJson(key.path(dir, "", "json"))
        }
        Framework::Onnx => ModelArtifact::OnnxPath(key.path(dir, "", "onnx")),
        Framework::OnnxBatched => {
            let width = run.query_size;
            let remainder = total_rows % width;
            ModelArtifact::OnnxBatched {
                batch: key.path(dir, &format!("_b{width}"), "onnx"),
                batch_width: width,
                remainder: (remainder > 0)
                    .then(|| key.path(dir, &format!("_r{remainder}"), "onnx")),
            }
        }
    }
}

/// Load the model for `framework` and bind it to its adapter.
pub fn load_adapter(
    framework: Framework,
    run: &RunConfig,
    task: TaskType,
    total_rows: usize,
) -> BenchResult<Box<dyn BackendAdapter>> {
    let artifact = artifact_for(framework, run, total_rows);
    load(framework, &artifact, run, task).map_err(|e| BenchError::backend(framework.name(), e))
}

fn load(
    framework: Framework,
    artifact: &ModelArtifact,
    run: &RunConfig,
    task: TaskType,
) -> Result<Box<dyn BackendAdapter>> {
    let device = run.device.clone();
    let adapter: Box<dyn BackendAdapter> = match framework {
        Framework::Native => Box::new(NativeBackend::new().load(artifact, device)?),
        Framework::Onnx => Box::new(OrtBackend::new().load(artifact, device)?),
        Framework::OnnxBatched => Box::new(ConvertedOrtBackend::new().load(artifact, device)?),
        Framework::Forest => {
            let forest = load_forest(artifact.primary_path())?;
            Box::new(DefaultAdapter::new(
                framework.name(),
                ForestPredictor::new(forest, task),
            ))
        }
    };
    Ok(adapter)
}
