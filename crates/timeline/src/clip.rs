//! Clip records and the inputs they are built from.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TimelineError, TimelineResult};
use crate::overlay::TextOverlay;

/// Stable identity of a clip within one timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(pub u64);

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clip-{}", self.0)
    }
}

/// Media kind of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipKind {
    /// Decoded video with its own length.
    Video,
    /// Still image shown for a fixed slot.
    Image,
}

impl ClipKind {
    /// Classify a MIME type such as `video/mp4` or `image/png`.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let major = mime.split('/').next().unwrap_or_default();
        match major.trim().to_ascii_lowercase().as_str() {
            "video" => Some(Self::Video),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Opaque reference to loadable media content (path, URL, object URL).
///
/// The media backend interprets it; the timeline only carries it around.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHandle(String);

impl ContentHandle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A clip as delivered by the ingestion collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipInput {
    /// Display name (usually the file name).
    pub name: String,

    /// Video or image.
    pub kind: ClipKind,

    /// Handle to the media content.
    pub content: ContentHandle,

    /// Decoded length in seconds (video only, if known).
    #[serde(default)]
    pub raw_duration: Option<f64>,

    /// Slot length the user asked for.
    #[serde(default)]
    pub requested_duration: Option<f64>,

    /// In-point into the source, in seconds (video only).
    #[serde(default)]
    pub trim_start: Option<f64>,

    /// Text overlays attached to this clip.
    #[serde(default)]
    pub overlays: Vec<TextOverlay>,
}

impl ClipInput {
    /// A video clip with a known decoded length.
    pub fn video(name: impl Into<String>, content: impl Into<String>, raw_duration: f64) -> Self {
        Self {
            name: name.into(),
            kind: ClipKind::Video,
            content: ContentHandle::new(content),
            raw_duration: Some(raw_duration),
            requested_duration: None,
            trim_start: None,
            overlays: vec![],
        }
    }

    /// An image clip using the default slot length.
    pub fn image(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ClipKind::Image,
            content: ContentHandle::new(content),
            raw_duration: None,
            requested_duration: None,
            trim_start: None,
            overlays: vec![],
        }
    }

    /// Builder: request a slot length.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.requested_duration = Some(secs);
        self
    }

    /// Builder: attach an overlay.
    pub fn with_overlay(mut self, overlay: TextOverlay) -> Self {
        self.overlays.push(overlay);
        self
    }
}

/// One entry of the timeline with its derived timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRecord {
    /// Identity assigned by the timeline.
    pub id: ClipId,

    /// Display name.
    pub name: String,

    /// Video or image.
    pub kind: ClipKind,

    /// Handle to the media content.
    pub content: ContentHandle,

    /// Decoded length of the whole source (video only, if known).
    pub raw_duration: Option<f64>,

    /// Slot length the user asked for, before negotiation.
    pub requested_duration: Option<f64>,

    /// In-point into the source in seconds.
    pub trim_start: f64,

    /// Negotiated playable length used by the sequencer.
    pub effective_duration: f64,

    /// Global time at which this clip starts (derived).
    pub start_time_global: f64,

    /// Global time at which this clip ends (derived).
    pub end_time_global: f64,

    /// Text overlays, in insertion order.
    pub overlays: Vec<TextOverlay>,
}

impl ClipRecord {
    /// Length of source media available after the in-point.
    pub fn available_duration(&self) -> Option<f64> {
        self.raw_duration.map(|raw| (raw - self.trim_start).max(0.0))
    }

    /// Whether a global time falls inside this clip's slot.
    pub fn contains_global(&self, global_secs: f64) -> bool {
        global_secs >= self.start_time_global && global_secs < self.end_time_global
    }

    /// Convert a global time into time local to this clip.
    pub fn to_local(&self, global_secs: f64) -> f64 {
        (global_secs - self.start_time_global).clamp(0.0, self.effective_duration)
    }

    /// Position in the underlying source for a local time.
    pub fn source_offset(&self, local_secs: f64) -> f64 {
        self.trim_start + local_secs.max(0.0)
    }
}

/// Parse a JSON clip manifest (an array of [`ClipInput`]).
pub fn parse_clip_inputs(json: &str) -> TimelineResult<Vec<ClipInput>> {
    serde_json::from_str(json).map_err(|source| TimelineError::ParseError { source })
}
