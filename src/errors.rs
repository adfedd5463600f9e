use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for the vectorization pipeline
#[derive(Error, Debug)]
pub enum VectorizeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("DXF error: {0}")]
    Dxf(#[from] dxf::DxfError),

    #[error("Annotation file error: {0}")]
    Annotations(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

/// Coarse classification used by callers that only care whether a run was
/// rejected up front or failed while touching the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Io,
    Config,
}

impl VectorizeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VectorizeError::InvalidInput(_) => ErrorKind::InvalidInput,
            VectorizeError::Io(_)
            | VectorizeError::Image(_)
            | VectorizeError::Dxf(_)
            | VectorizeError::InvalidPath(_) => ErrorKind::Io,
            VectorizeError::Annotations(_)
            | VectorizeError::Config(_)
            | VectorizeError::ConfigLoad { .. } => ErrorKind::Config,
        }
    }
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, VectorizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_and_write_failures_classify_as_io() {
        let err = VectorizeError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert_eq!(err.kind(), ErrorKind::Io);

        let err = VectorizeError::InvalidPath(PathBuf::from("missing.png"));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn invalid_input_keeps_its_message() {
        let err = VectorizeError::InvalidInput("image has zero width".to_string());
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.to_string(), "Invalid input: image has zero width");
    }
}
