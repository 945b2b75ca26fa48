//! Frame compositor: draws the current clip, its visible overlays, and
//! the transport controls onto a [`Surface`].
//!
//! The compositor is stateless with respect to playback. It only tracks
//! the pointer, which decides whether the control strip is shown.

use montage_common::config::{FitMode, PlaybackDefaults};
use montage_timeline::{OverlayPosition, TextOverlay};

use crate::host::{Color, FrameRef, Rect, Size, Surface, TextAlign, TextBaseline, TextStyle};

const BACKGROUND: Color = Color::BLACK;
const STRIP: Color = Color::rgba(0, 0, 0, 160);
const TRACK: Color = Color::rgba(255, 255, 255, 64);
const FILL: Color = Color::rgba(230, 57, 70, 255);

const PLAY_GLYPH: &str = "\u{25B6}";
const PAUSE_GLYPH: &str = "\u{275A}\u{275A}";
const FULLSCREEN_GLYPH: &str = "\u{26F6}";
const EXIT_FULLSCREEN_GLYPH: &str = "\u{2715}";

/// Compositor layout and behavior settings.
#[derive(Debug, Clone)]
pub struct CompositorConfig {
    /// Pointer idle time after which controls hide (seconds).
    pub idle_timeout_secs: f64,

    /// Height of the control strip along the bottom edge (pixels).
    pub control_strip_height: f64,

    /// Inner padding of controls (pixels).
    pub control_padding: f64,

    /// Height of the progress bar (pixels).
    pub progress_bar_height: f64,

    /// Distance from the surface edge to corner overlays (pixels).
    pub overlay_margin: f64,

    /// Overlay text size (pixels).
    pub overlay_font_px: f64,

    /// Overlay text color.
    pub overlay_color: Color,

    /// Frame scaling strategy.
    pub fit_mode: FitMode,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 3.0,
            control_strip_height: 40.0,
            control_padding: 6.0,
            progress_bar_height: 6.0,
            overlay_margin: 16.0,
            overlay_font_px: 24.0,
            overlay_color: Color::WHITE,
            fit_mode: FitMode::Stretch,
        }
    }
}

impl CompositorConfig {
    /// Take the configurable parts from application defaults.
    pub fn from_defaults(defaults: &PlaybackDefaults) -> Self {
        Self {
            idle_timeout_secs: defaults.controls_idle_timeout_secs,
            fit_mode: defaults.fit_mode,
            ..Self::default()
        }
    }
}

/// A region of the control strip hit by a pointer press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlHit {
    PlayPause,
    /// Fraction of the current clip, in `[0, 1]`.
    Seek(f64),
    Fullscreen,
}

/// Everything the compositor needs to draw one frame.
#[derive(Debug, Clone)]
pub struct FrameView<'a> {
    /// Current clip's frame, if its content is loaded.
    pub frame: Option<FrameRef>,

    /// Overlays visible at the current local time.
    pub overlays: Vec<&'a TextOverlay>,

    /// Whether playback is running (selects the play/pause glyph).
    pub playing: bool,

    /// `elapsed / effective_duration` of the current clip.
    pub progress: f64,

    /// Whether the host is fullscreen (selects the toggle glyph).
    pub fullscreen: bool,

    /// Current clock time (seconds).
    pub now_secs: f64,
}

/// Control strip geometry for one surface size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlLayout {
    pub strip: Rect,
    pub play_button: Rect,
    pub progress: Rect,
    pub fullscreen_button: Rect,
}

/// Per-frame drawing and pointer tracking.
#[derive(Debug, Clone)]
pub struct Compositor {
    config: CompositorConfig,
    last_pointer_move_secs: f64,
    pointer: Option<(f64, f64)>,
}

impl Compositor {
    /// Create a compositor. Controls start visible and hide after the
    /// idle timeout measured from `now_secs`.
    pub fn new(config: CompositorConfig, now_secs: f64) -> Self {
        Self {
            config,
            last_pointer_move_secs: now_secs,
            pointer: None,
        }
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Record pointer movement over the surface.
    pub fn pointer_moved(&mut self, x: f64, y: f64, now_secs: f64) {
        self.pointer = Some((x, y));
        self.last_pointer_move_secs = now_secs;
    }

    /// Record the pointer leaving the surface.
    pub fn pointer_left(&mut self) {
        self.pointer = None;
    }

    /// Whether the control strip should be drawn.
    pub fn controls_visible(&self, size: Size, now_secs: f64) -> bool {
        let over_strip = self
            .pointer
            .map(|(x, y)| self.layout(size).strip.contains(x, y))
            .unwrap_or(false);
        over_strip || now_secs - self.last_pointer_move_secs <= self.config.idle_timeout_secs
    }

    /// Control strip geometry for a surface size.
    pub fn layout(&self, size: Size) -> ControlLayout {
        let strip_h = self.config.control_strip_height.min(size.height);
        let pad = self.config.control_padding;
        let button = (strip_h - 2.0 * pad).max(0.0);

        let strip = Rect::new(0.0, size.height - strip_h, size.width, strip_h);
        let play_button = Rect::new(pad, strip.y + pad, button, button);
        let fullscreen_button = Rect::new(size.width - pad - button, strip.y + pad, button, button);

        let bar_x = play_button.right() + pad;
        let bar_w = (fullscreen_button.x - pad - bar_x).max(0.0);
        let bar_h = self.config.progress_bar_height;
        let progress = Rect::new(bar_x, strip.y + (strip_h - bar_h) / 2.0, bar_w, bar_h);

        ControlLayout {
            strip,
            play_button,
            progress,
            fullscreen_button,
        }
    }

    /// Map a pointer press to a control.
    pub fn hit_test(&self, x: f64, y: f64, size: Size) -> Option<ControlHit> {
        let layout = self.layout(size);
        if !layout.strip.contains(x, y) {
            return None;
        }
        if layout.play_button.contains(x, y) {
            return Some(ControlHit::PlayPause);
        }
        if layout.fullscreen_button.contains(x, y) {
            return Some(ControlHit::Fullscreen);
        }
        // The whole strip height between the buttons seeks.
        if x >= layout.progress.x && x <= layout.progress.right() && layout.progress.w > 0.0 {
            let fraction = (x - layout.progress.x) / layout.progress.w;
            return Some(ControlHit::Seek(fraction.clamp(0.0, 1.0)));
        }
        None
    }

    /// Draw one frame.
    pub fn render(&self, surface: &mut dyn Surface, view: &FrameView<'_>) {
        let size = surface.size();
        surface.clear(BACKGROUND);

        if let Some(frame) = &view.frame {
            let dest = fit_rect(size, frame.natural_size, self.config.fit_mode);
            surface.draw_frame(frame, dest);
        }

        let controls = self.controls_visible(size, view.now_secs);
        for overlay in &view.overlays {
            let (x, y, style) = self.overlay_anchor(overlay.position, size, controls);
            surface.fill_text(&overlay.text, x, y, &style);
        }

        if controls {
            self.draw_controls(surface, size, view);
        }
    }

    fn overlay_anchor(
        &self,
        position: OverlayPosition,
        size: Size,
        controls: bool,
    ) -> (f64, f64, TextStyle) {
        let m = self.config.overlay_margin;
        // Keep bottom captions clear of the control strip.
        let bottom = if controls {
            size.height - m - self.config.control_strip_height
        } else {
            size.height - m
        };
        let (x, y, align, baseline) = match position {
            OverlayPosition::TopLeft => (m, m, TextAlign::Left, TextBaseline::Top),
            OverlayPosition::TopRight => (size.width - m, m, TextAlign::Right, TextBaseline::Top),
            OverlayPosition::BottomLeft => (m, bottom, TextAlign::Left, TextBaseline::Bottom),
            OverlayPosition::BottomRight => {
                (size.width - m, bottom, TextAlign::Right, TextBaseline::Bottom)
            }
            OverlayPosition::Center => (
                size.width / 2.0,
                size.height / 2.0,
                TextAlign::Center,
                TextBaseline::Middle,
            ),
        };
        let style = TextStyle {
            size_px: self.config.overlay_font_px,
            color: self.config.overlay_color,
            align,
            baseline,
        };
        (x, y, style)
    }

    fn draw_controls(&self, surface: &mut dyn Surface, size: Size, view: &FrameView<'_>) {
        let layout = self.layout(size);
        surface.fill_rect(layout.strip, STRIP);

        let glyph_style = TextStyle {
            size_px: layout.play_button.h * 0.8,
            color: Color::WHITE,
            align: TextAlign::Center,
            baseline: TextBaseline::Middle,
        };

        let play_glyph = if view.playing { PAUSE_GLYPH } else { PLAY_GLYPH };
        let (cx, cy) = center(layout.play_button);
        surface.fill_text(play_glyph, cx, cy, &glyph_style);

        surface.fill_rect(layout.progress, TRACK);
        let filled = Rect {
            w: layout.progress.w * view.progress.clamp(0.0, 1.0),
            ..layout.progress
        };
        if filled.w > 0.0 {
            surface.fill_rect(filled, FILL);
        }

        let fullscreen_glyph = if view.fullscreen {
            EXIT_FULLSCREEN_GLYPH
        } else {
            FULLSCREEN_GLYPH
        };
        let (cx, cy) = center(layout.fullscreen_button);
        surface.fill_text(fullscreen_glyph, cx, cy, &glyph_style);
    }
}

fn center(rect: Rect) -> (f64, f64) {
    (rect.x + rect.w / 2.0, rect.y + rect.h / 2.0)
}

/// Destination rectangle for a frame on a surface.
pub fn fit_rect(size: Size, natural: Option<(u32, u32)>, mode: FitMode) -> Rect {
    let full = Rect::new(0.0, 0.0, size.width, size.height);
    match (mode, natural) {
        (FitMode::Contain, Some((nw, nh))) if nw > 0 && nh > 0 => {
            let scale = (size.width / nw as f64).min(size.height / nh as f64);
            let w = nw as f64 * scale;
            let h = nh as f64 * scale;
            Rect::new((size.width - w) / 2.0, (size.height - h) / 2.0, w, h)
        }
        _ => full,
    }
}
