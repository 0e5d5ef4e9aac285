use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use ort::{
    session::{builder::SessionBuilder, Session, SessionInputValue},
    tensor::TensorElementType,
    value::{DynValue, ValueType},
};
use treebench_core::{
    threshold_labels, Backend, BackendAdapter, BackendFamily, DType, Device, FeatureSlice,
    ModelArtifact, RawOutput, Shape, Tensor,
};

/// Tensor programs with a dynamic batch dimension.
pub struct OrtBackend;

impl OrtBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrtBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Tensor programs converted for one fixed batch width plus a remainder width.
pub struct ConvertedOrtBackend;

impl ConvertedOrtBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConvertedOrtBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// One loaded ONNX program and the name of its single input.
pub struct OrtProgram {
    session: Session,
    input_name: String,
}

impl OrtProgram {
    pub fn load(path: &Path, device: &Device) -> Result<Self> {
        let builder = Session::builder()
            .context("failed to create ORT session builder")?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .context("failed to configure ORT session builder")?;

        let builder = configure_session_builder(builder, device)?;

        let session = builder
            .commit_from_file(path)
            .with_context(|| format!("failed to load ONNX model {}", path.display()))?;

        ensure!(
            session.inputs.len() == 1,
            "expected a single feature input, model has {}",
            session.inputs.len()
        );
        let input_name = session.inputs[0].name.clone();
        check_input_type(&session.inputs[0].input_type)?;

        Ok(Self {
            session,
            input_name,
        })
    }

    /// Run one batch and return the first output.
    ///
    /// Any further outputs (class probabilities for most classifier exports)
    /// are ignored.
    pub fn run(&mut self, batch: FeatureSlice<'_>) -> Result<Tensor> {
        let input = tensor_to_ort_value(batch_tensor(batch))?;
        let inputs = vec![(self.input_name.clone(), SessionInputValue::from(input))];

        let outputs = self.session.run(inputs)?;
        let (_, value) = outputs
            .iter()
            .next()
            .context("model produced no outputs")?;
        ort_value_to_tensor(&value)
    }
}

/// Build the `[rows, features]` f32 input for a batch.
pub fn batch_tensor(batch: FeatureSlice<'_>) -> Tensor {
    Tensor::from_f32(
        Shape::from_slice(&[batch.n_rows(), batch.n_features()]),
        batch.data(),
    )
}

/// Scores come back as `[n]` or `[n, 1]`; flatten and threshold.
pub fn normalize_scores(raw: RawOutput) -> Result<Vec<f64>> {
    Ok(threshold_labels(&raw.into_values()?))
}

/// Converted programs already emit one label per row.
pub fn normalize_labels(raw: RawOutput) -> Result<Vec<f64>> {
    raw.into_values()
}

pub struct TensorProgramAdapter {
    name: String,
    program: OrtProgram,
}

impl Backend for OrtBackend {
    type Model = TensorProgramAdapter;

    fn name(&self) -> &'static str {
        "onnx"
    }

    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model> {
        let ModelArtifact::OnnxPath(path) = artifact else {
            bail!("onnx backend expects an ONNX file path");
        };
        Ok(TensorProgramAdapter {
            name: self.name().to_string(),
            program: OrtProgram::load(path, &device)?,
        })
    }
}

impl BackendAdapter for TensorProgramAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::TensorCompiled
    }

    fn predict_batch(&mut self, batch: FeatureSlice<'_>, _is_partial: bool) -> Result<RawOutput> {
        self.program.run(batch).map(RawOutput::Tensor)
    }

    fn normalize(&self, raw: RawOutput) -> Result<Vec<f64>> {
        normalize_scores(raw)
    }
}

pub struct ConvertedProgramAdapter {
    name: String,
    batch: OrtProgram,
    batch_width: usize,
    remainder: Option<OrtProgram>,
}

impl Backend for ConvertedOrtBackend {
    type Model = ConvertedProgramAdapter;

    fn name(&self) -> &'static str {
        "onnx-batched"
    }

    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model> {
        let ModelArtifact::OnnxBatched {
            batch,
            batch_width,
            remainder,
        } = artifact
        else {
            bail!("onnx-batched backend expects a batched ONNX artifact");
        };
        ensure!(*batch_width > 0, "batch width must be positive");

        let remainder = remainder
            .as_deref()
            .map(|path| OrtProgram::load(path, &device))
            .transpose()?;

        Ok(ConvertedProgramAdapter {
            name: self.name().to_string(),
            batch: OrtProgram::load(batch, &device)?,
            batch_width: *batch_width,
            remainder,
        })
    }
}

impl BackendAdapter for ConvertedProgramAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> BackendFamily {
        BackendFamily::ConvertedTensor
    }

    fn predict_batch(&mut self, batch: FeatureSlice<'_>, is_partial: bool) -> Result<RawOutput> {
        let program = if is_partial {
            self.remainder.as_mut().with_context(|| {
                format!(
                    "no remainder program for a partial batch of {} rows",
                    batch.n_rows()
                )
            })?
        } else {
            &mut self.batch
        };
        program.run(batch).map(RawOutput::Tensor)
    }

    fn normalize(&self, raw: RawOutput) -> Result<Vec<f64>> {
        normalize_labels(raw)
    }

    fn fixed_batch_width(&self) -> Option<usize> {
        Some(self.batch_width)
    }
}

fn configure_session_builder(builder: SessionBuilder, device: &Device) -> Result<SessionBuilder> {
    match device {
        Device::Cpu => Ok(builder),
        Device::Cuda { device_id } => configure_cuda(builder, *device_id),
    }
}

fn configure_cuda(builder: SessionBuilder, device_id: u32) -> Result<SessionBuilder> {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::cuda::CUDAExecutionProvider;
        let ep = CUDAExecutionProvider::default()
            .with_device_id(device_id as i32)
            .build();
        builder
            .with_execution_providers([ep])
            .context("failed to enable ORT CUDA execution provider")
    }
    #[cfg(not(feature = "cuda"))]
    {
        let _ = (builder, device_id);
        bail!("CUDA requested but treebench-backend-ort was built without the `cuda` feature")
    }
}

fn check_input_type(value_type: &ValueType) -> Result<()> {
    let ValueType::Tensor { ty, shape, .. } = value_type else {
        bail!("unsupported non-tensor input");
    };
    ensure!(
        *ty == TensorElementType::Float32,
        "feature input must be float32, model declares {ty}"
    );
    ensure!(
        shape.len() == 2,
        "feature input must be rank 2, model declares rank {}",
        shape.len()
    );
    Ok(())
}

fn tensor_to_ort_value(tensor: Tensor) -> Result<DynValue> {
    let shape: Vec<usize> = tensor.shape.0.iter().copied().collect();
    let value = match tensor.dtype {
        DType::F32 => {
            let data = tensor.to_f32_vec()?;
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
        other => bail!("{other:?} inputs are not supported"),
    };
    Ok(value)
}

fn ort_value_to_tensor(value: &ort::value::ValueRef<'_>) -> Result<Tensor> {
    let ValueType::Tensor { ty, shape, .. } = value.dtype() else {
        bail!("non-tensor outputs are not supported");
    };

    let dims: Vec<usize> = shape.iter().map(|d| *d as usize).collect();
    let shape = Shape::from_slice(&dims);

    match *ty {
        TensorElementType::Float32 => {
            let array = value.try_extract_array::<f32>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            Ok(Tensor::from_f32(shape, slice))
        }
        TensorElementType::Int64 => {
            let array = value.try_extract_array::<i64>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            Ok(Tensor::from_i64(shape, slice))
        }
        _ => bail!("unsupported output tensor element type: {ty}"),
    }
}
