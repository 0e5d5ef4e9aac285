use anyhow::{bail, ensure, Result};
use bytes::Bytes;
use smallvec::SmallVec;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda { device_id: u32 },
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda { device_id } => write!(f, "cuda:{device_id}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DType {
    F32,
    F64,
    I64,
    I32,
    U8,
}

impl DType {
    pub fn byte_size(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F64 => 8,
            DType::I64 => 8,
            DType::I32 => 4,
            DType::U8 => 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape(pub SmallVec<[usize; 4]>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }
    pub fn numel(&self) -> usize {
        self.0.iter().product::<usize>()
    }
}

/// Dense CPU tensor in little-endian byte storage.
///
/// This is the currency of the tensor-program backends: inputs are built from
/// feature slices and outputs are converted back to `f64` before normalization.
#[derive(Clone, Debug)]
pub struct Tensor {
    pub dtype: DType,
    pub shape: Shape,
    pub bytes: Bytes,
}

impl Tensor {
    pub fn from_cpu_bytes(dtype: DType, shape: Shape, bytes: Bytes) -> Self {
        Self {
            dtype,
            shape,
            bytes,
        }
    }

    pub fn from_f32(shape: Shape, data: &[f32]) -> Self {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_cpu_bytes(DType::F32, shape, Bytes::from(bytes))
    }

    pub fn from_i64(shape: Shape, data: &[i64]) -> Self {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_cpu_bytes(DType::I64, shape, Bytes::from(bytes))
    }

    /// Collapse every dimension into one.
    pub fn flatten(self) -> Self {
        let numel = self.shape.numel();
        Self {
            shape: Shape::from_slice(&[numel]),
            ..self
        }
    }

    pub fn to_f32_vec(&self) -> Result<Vec<f32>> {
        ensure!(
            self.dtype == DType::F32,
            "expected an f32 tensor, got {:?}",
            self.dtype
        );
        self.check_len()?;
        Ok(self
            .bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    /// Widen any supported element type to `f64`.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        self.check_len()?;
        let b = &self.bytes;
        let values = match self.dtype {
            DType::F32 => b
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect(),
            DType::F64 => b
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
            DType::I64 => b
                .chunks_exact(8)
                .map(|c| {
                    i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f64
                })
                .collect(),
            DType::I32 => b
                .chunks_exact(4)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect(),
            DType::U8 => b.iter().map(|v| *v as f64).collect(),
        };
        Ok(values)
    }

    fn check_len(&self) -> Result<()> {
        let expected = self.shape.numel() * self.dtype.byte_size();
        if self.bytes.len() != expected {
            bail!(
                "tensor byte size mismatch: got {}, expected {} for shape {:?}",
                self.bytes.len(),
                expected,
                self.shape.0
            );
        }
        Ok(())
    }
}
