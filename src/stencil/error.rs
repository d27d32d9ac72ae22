use crate::stencil::layer::LayerId;

#[derive(Debug, Clone, PartialEq)]
pub enum StencilError {
    /// Malformed resolution, strength, radius or other parameter.
    InvalidArgument(String),
    /// Paired inputs of inconsistent shape.
    DimensionMismatch(String),
    OutOfRange(String),
    Cancelled,
    UnknownLayer(LayerId),
    Decode(String),
    Snapshot(String),
}

impl StencilError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        StencilError::InvalidArgument(message.into())
    }
}

impl std::fmt::Display for StencilError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StencilError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            StencilError::DimensionMismatch(msg) => write!(f, "dimension mismatch: {msg}"),
            StencilError::OutOfRange(msg) => write!(f, "out of range: {msg}"),
            StencilError::Cancelled => write!(f, "operation cancelled"),
            StencilError::UnknownLayer(id) => write!(f, "unknown stencil layer {id}"),
            StencilError::Decode(msg) => write!(f, "image decode failed: {msg}"),
            StencilError::Snapshot(msg) => write!(f, "invalid mask snapshot: {msg}"),
        }
    }
}

impl std::error::Error for StencilError {}

/// Stage of the import pipeline that rejected an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Decode,
    Resample,
    Unpack,
}

impl std::fmt::Display for ImportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportStage::Decode => write!(f, "decode"),
            ImportStage::Resample => write!(f, "resample"),
            ImportStage::Unpack => write!(f, "unpack"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchImportError {
    /// Position of the failing entry in the batch.
    pub index: usize,
    pub name: String,
    pub stage: ImportStage,
    pub source: StencilError,
}

impl std::fmt::Display for BatchImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "import of layer #{} '{}' failed at {} stage: {}",
            self.index, self.name, self.stage, self.source
        )
    }
}

impl std::error::Error for BatchImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
