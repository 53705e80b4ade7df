use thiserror::Error;

/// Custom error type for the TripletRust batch pipeline.
///
/// Configuration and data-source variants are raised at construction time.
/// `Decode` is recoverable per sample; `ChannelClosed` is terminal for a
/// prefetching batch source.
#[derive(Error, Debug, PartialEq, Clone)] // PartialEq for easier testing
pub enum TripletRustError {
    #[error("Malformed label at sample {index}: {label:?} ({reason})")]
    MalformedLabel {
        index: usize,
        label: String,
        reason: String,
    },

    #[error("Triplet sampling needs at least 2 label buckets, found {found}")]
    InsufficientClasses { found: usize },

    #[error("Sampling strategy {strategy} requires parameter '{parameter}'")]
    MissingStrategyParameter {
        strategy: String,
        parameter: String,
    },

    #[error("Unknown sampling strategy: {0}")]
    UnknownStrategy(String),

    #[error("Failed to decode sample {sample_id:?}: {message}")]
    Decode {
        sample_id: Option<usize>,
        message: String,
    },

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Batch channel closed: the prefetch worker is no longer running")]
    ChannelClosed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreationError { data_len: usize, shape: Vec<usize> },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("Index out of bounds: index {index} for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Cannot stack an empty list of tensors")]
    EmptyTensorList,

    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(String),

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

impl TripletRustError {
    /// Builds a `Decode` error for the given sample.
    pub fn decode(sample_id: Option<usize>, message: impl Into<String>) -> Self {
        TripletRustError::Decode {
            sample_id,
            message: message.into(),
        }
    }

    /// Wraps a `std::io::Error` together with the path it occurred on.
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        TripletRustError::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// Returns true for per-sample failures that a caller may retry with another sample.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TripletRustError::Decode { .. })
    }
}
