//! Contracts between the playback engine and its host.
//!
//! The engine never touches a concrete rendering or decoding technology.
//! A host supplies a [`Surface`] to draw on, a [`MediaBackend`] that opens
//! [`MediaSource`]s, a [`FrameScheduler`] for frame callbacks, and a
//! [`Clock`](montage_common::clock::Clock).

use montage_common::clock::Clock;
use montage_common::error::MontageResult;
use montage_timeline::{ClipKind, ClipRecord, ContentHandle};

/// Identifies one load of one clip's content.
///
/// Every media notification carries the token it was issued for so late
/// notifications from replaced content can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadToken(pub u64);

/// Identifies one scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Surface dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }
}

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Horizontal text alignment relative to the anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Vertical text alignment relative to the anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    Top,
    Middle,
    Bottom,
}

/// How a run of text is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size_px: f64,
    pub color: Color,
    pub align: TextAlign,
    pub baseline: TextBaseline,
}

/// What to draw for the current clip.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRef {
    /// Content being shown.
    pub content: ContentHandle,
    /// Video or still image.
    pub kind: ClipKind,
    /// Position in the source (seconds), after the in-point.
    pub source_offset: f64,
    /// Decoded pixel size, once reported.
    pub natural_size: Option<(u32, u32)>,
}

/// A drawing target.
pub trait Surface {
    /// Current dimensions; read every frame.
    fn size(&self) -> Size;

    /// Fill the whole surface.
    fn clear(&mut self, color: Color);

    /// Draw the current frame of some content scaled into `dest`.
    fn draw_frame(&mut self, frame: &FrameRef, dest: Rect);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle);

    /// Enter or leave fullscreen. Hosts without the notion ignore it.
    fn set_fullscreen(&mut self, _fullscreen: bool) {}
}

/// A loaded, playable piece of content.
///
/// Readiness, size, errors and end-of-stream arrive asynchronously as
/// [`MediaEvent`]s tagged with the source's [`LoadToken`].
pub trait MediaSource {
    /// Start or resume decoding at the current position.
    fn play(&mut self) -> MontageResult<()>;

    /// Stop advancing; the position is kept.
    fn pause(&mut self);

    /// Current position in the source (seconds).
    fn position(&self) -> f64;

    /// Jump to a position in the source (seconds).
    fn seek(&mut self, secs: f64);

    /// Decoded length, once known.
    fn duration(&self) -> Option<f64>;

    /// Release decoder state and any transient handle. Called exactly once.
    fn close(&mut self);
}

/// Opens media sources for clips.
pub trait MediaBackend {
    /// Begin loading a clip's content.
    ///
    /// An `Err` is a synchronous load failure; asynchronous failures are
    /// reported later as [`MediaEventKind::Error`].
    fn open(&mut self, clip: &ClipRecord, token: LoadToken) -> MontageResult<Box<dyn MediaSource>>;

    /// Release a clip's content handle for good (the clip left the timeline).
    fn release_content(&mut self, _content: &ContentHandle) {}
}

/// Host's frame-rate-limited callback facility.
pub trait FrameScheduler {
    /// Ask for one callback at the next frame.
    fn request_frame(&mut self) -> FrameHandle;

    /// Withdraw a pending callback.
    fn cancel(&mut self, handle: FrameHandle);
}

/// Everything a sequencer needs from its host, owned for its lifetime.
pub struct Host {
    pub clock: Box<dyn Clock>,
    pub backend: Box<dyn MediaBackend>,
    pub scheduler: Box<dyn FrameScheduler>,
    pub surface: Box<dyn Surface>,
}

/// Notification from a media source.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEvent {
    pub token: LoadToken,
    pub kind: MediaEventKind,
}

impl MediaEvent {
    pub fn new(token: LoadToken, kind: MediaEventKind) -> Self {
        Self { token, kind }
    }
}

/// Kinds of media notification.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEventKind {
    /// Container metadata was read; the decoded length is known.
    MetadataReady { duration_secs: f64 },
    /// Pixel dimensions are known.
    SizeReady { width: u32, height: u32 },
    /// The first frame is decoded and playback can start.
    Ready,
    /// Content failed to load or decode.
    Error { message: String },
    /// The source ran out of media.
    Ended,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_edges() {
        let r = Rect::new(10.0, 10.0, 20.0, 5.0);
        assert!(r.contains(10.0, 10.0));
        assert!(r.contains(30.0, 15.0));
        assert!(!r.contains(30.1, 12.0));
        assert_eq!(r.right(), 30.0);
        assert_eq!(r.bottom(), 15.0);
    }
}
