//! Errors raised by timeline mutations.

use crate::clip::ClipId;
use crate::overlay::OverlayPosition;

/// Result type alias using TimelineError.
pub type TimelineResult<T> = Result<T, TimelineError>;

/// Errors that can occur when editing a timeline.
///
/// Every failing operation leaves the timeline exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("Clip index {index} out of range (timeline has {len} clips)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Unknown clip: {id}")]
    UnknownClip { id: ClipId },

    #[error("Overlay index {index} out of range ({id} has {len} overlays)")]
    OverlayIndexOutOfRange { id: ClipId, index: usize, len: usize },

    #[error("Overlays {first} and {second} overlap at {position:?}")]
    OverlayConflict {
        position: OverlayPosition,
        first: usize,
        second: usize,
    },

    #[error("Invalid overlay: {message}")]
    InvalidOverlay { message: String },

    #[error("Invalid edit: {message}")]
    InvalidEdit { message: String },

    #[error("Manifest parse error: {source}")]
    ParseError { source: serde_json::Error },
}

impl TimelineError {
    /// Whether the error is an overlay validation rejection.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::OverlayConflict { .. } | Self::InvalidOverlay { .. }
        )
    }
}
