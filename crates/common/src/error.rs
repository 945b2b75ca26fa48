//! Error types shared across Montage crates.

use std::path::PathBuf;

/// Top-level error type for Montage operations.
#[derive(Debug, thiserror::Error)]
pub enum MontageError {
    #[error("Playback error: {message}")]
    Playback { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using MontageError.
pub type MontageResult<T> = Result<T, MontageError>;

impl MontageError {
    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback {
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether the failure only affects a single clip and playback may continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::FileNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_errors_are_recoverable() {
        assert!(MontageError::decode("bad stream").is_recoverable());
        assert!(MontageError::FileNotFound {
            path: PathBuf::from("missing.mp4")
        }
        .is_recoverable());
        assert!(!MontageError::config("fps must be positive").is_recoverable());
        assert!(!MontageError::playback("no decoder").is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = MontageError::decode("truncated moov atom");
        assert_eq!(err.to_string(), "Decode error: truncated moov atom");
    }
}
