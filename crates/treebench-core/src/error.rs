use thiserror::Error;

/// Failures surfaced by the benchmark harness. Nothing is retried.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("data backend error: {0}")]
    DataBackend(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{backend} returned {actual} predictions for batch {batch} of {expected} rows")]
    AdapterOutputMismatch {
        backend: String,
        batch: usize,
        expected: usize,
        actual: usize,
    },

    #[error("metric inputs differ in length: {actual} actual vs {predicted} predicted")]
    MetricInputMismatch { actual: usize, predicted: usize },

    #[error("{backend} failed: {source:#}")]
    BackendFailure {
        backend: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        Self::DataBackend(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn backend(backend: impl Into<String>, source: anyhow::Error) -> Self {
        Self::BackendFailure {
            backend: backend.into(),
            source,
        }
    }
}

pub type BenchResult<T> = std::result::Result<T, BenchError>;
