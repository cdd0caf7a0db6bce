//! Core error types for the Visage engine.

/// A specialized Result type for Visage operations.
pub type VisageResult<T> = Result<T, VisageError>;

/// Top-level error type encompassing all Visage subsystems.
#[derive(Debug, thiserror::Error)]
pub enum VisageError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("image decode error: {0}")]
    Decode(String),

    #[error("asset error: {message} ({key})")]
    Asset { message: String, key: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Other(String),
}

impl VisageError {
    /// Create a malformed payload error.
    pub fn malformed(message: impl Into<String>) -> Self {
        VisageError::MalformedPayload(message.into())
    }

    /// Create an asset error.
    pub fn asset(message: impl Into<String>, key: impl Into<String>) -> Self {
        VisageError::Asset {
            message: message.into(),
            key: key.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_error_display() {
        let err = VisageError::malformed("dataArray is empty");
        assert_eq!(err.to_string(), "malformed payload: dataArray is empty");
    }

    #[test]
    fn test_asset_error_display() {
        let err = VisageError::asset("overlay image missing", "0-1-53-2");
        assert!(err.to_string().contains("overlay image missing"));
        assert!(err.to_string().contains("0-1-53-2"));
    }
}
