//! Text overlays and their scheduling rules.
//!
//! An overlay is visible over the closed window
//! `[start_time_local, start_time_local + display_duration]` of its clip.
//! Conflicts are judged on half-open windows, so two overlays that touch
//! end-to-start at the same position are allowed.

use serde::{Deserialize, Serialize};

use crate::clip::{ClipId, ClipRecord};
use crate::error::{TimelineError, TimelineResult};

/// Screen anchor for an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl OverlayPosition {
    /// Every position, in display order.
    pub const ALL: [OverlayPosition; 5] = [
        OverlayPosition::TopLeft,
        OverlayPosition::TopRight,
        OverlayPosition::BottomLeft,
        OverlayPosition::BottomRight,
        OverlayPosition::Center,
    ];
}

/// A time-windowed text annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    /// Text to draw.
    pub text: String,

    /// Anchor on the surface.
    pub position: OverlayPosition,

    /// Offset into the owning clip (seconds).
    #[serde(rename = "start")]
    pub start_time_local: f64,

    /// How long the overlay stays up (seconds).
    #[serde(rename = "duration")]
    pub display_duration: f64,
}

impl TextOverlay {
    pub fn new(
        text: impl Into<String>,
        position: OverlayPosition,
        start_time_local: f64,
        display_duration: f64,
    ) -> Self {
        Self {
            text: text.into(),
            position,
            start_time_local,
            display_duration,
        }
    }

    /// Local time at which the overlay disappears.
    pub fn end_time_local(&self) -> f64 {
        self.start_time_local + self.display_duration
    }

    /// Whether the overlay should be drawn at `elapsed_in_clip`.
    pub fn is_visible(&self, elapsed_in_clip: f64) -> bool {
        elapsed_in_clip >= self.start_time_local && elapsed_in_clip <= self.end_time_local()
    }

    /// Whether two overlays' half-open windows intersect.
    pub fn intersects(&self, other: &TextOverlay) -> bool {
        self.start_time_local < other.end_time_local()
            && other.start_time_local < self.end_time_local()
    }

    fn check_window(&self) -> TimelineResult<()> {
        if !self.start_time_local.is_finite() || self.start_time_local < 0.0 {
            return Err(TimelineError::InvalidOverlay {
                message: format!("start must be >= 0, got {}", self.start_time_local),
            });
        }
        if !self.display_duration.is_finite() || self.display_duration <= 0.0 {
            return Err(TimelineError::InvalidOverlay {
                message: format!("duration must be > 0, got {}", self.display_duration),
            });
        }
        Ok(())
    }
}

/// Check a clip's full overlay set, reporting the first problem found.
pub fn validate_overlays(overlays: &[TextOverlay]) -> TimelineResult<()> {
    for overlay in overlays {
        overlay.check_window()?;
    }

    for (i, a) in overlays.iter().enumerate() {
        for (j, b) in overlays.iter().enumerate().skip(i + 1) {
            if a.position == b.position && a.intersects(b) {
                return Err(TimelineError::OverlayConflict {
                    position: a.position,
                    first: i,
                    second: j,
                });
            }
        }
    }
    Ok(())
}

/// Whether a clip's overlay set is free of same-position overlaps.
pub fn validate(overlays: &[TextOverlay]) -> bool {
    validate_overlays(overlays).is_ok()
}

/// Overlays that should be drawn at `elapsed_in_clip`.
pub fn visible_at(
    overlays: &[TextOverlay],
    elapsed_in_clip: f64,
) -> impl Iterator<Item = &TextOverlay> {
    overlays
        .iter()
        .filter(move |overlay| overlay.is_visible(elapsed_in_clip))
}

/// One row of a by-position review display, in global time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayEntry {
    /// Global start (seconds).
    pub start_global: f64,
    /// Global end (seconds).
    pub end_global: f64,
    /// Text of every overlay merged into this entry.
    pub texts: Vec<String>,
    /// Clips contributing to this entry.
    pub clip_ids: Vec<ClipId>,
    /// Set when two or more overlays were merged.
    pub conflict: bool,
}

/// Project every overlay at `position` into global time, merging overlaps.
///
/// Entries are sorted by global start. Overlapping entries collapse into a
/// single conflict entry spanning their union. This is a read-only review
/// aid; per-clip validation is the authoritative check.
pub fn report_by_position(clips: &[ClipRecord], position: OverlayPosition) -> Vec<DisplayEntry> {
    let mut entries: Vec<DisplayEntry> = clips
        .iter()
        .flat_map(|clip| {
            clip.overlays
                .iter()
                .filter(move |overlay| overlay.position == position)
                .map(move |overlay| {
                    let start_global = clip.start_time_global + overlay.start_time_local;
                    DisplayEntry {
                        start_global,
                        end_global: start_global + overlay.display_duration,
                        texts: vec![overlay.text.clone()],
                        clip_ids: vec![clip.id],
                        conflict: false,
                    }
                })
        })
        .collect();

    entries.sort_by(|a, b| a.start_global.total_cmp(&b.start_global));

    let mut merged: Vec<DisplayEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        match merged.last_mut() {
            Some(last) if entry.start_global < last.end_global => {
                last.end_global = last.end_global.max(entry.end_global);
                last.texts.extend(entry.texts);
                for id in entry.clip_ids {
                    if !last.clip_ids.contains(&id) {
                        last.clip_ids.push(id);
                    }
                }
                last.conflict = true;
            }
            _ => merged.push(entry),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{ClipKind, ContentHandle};

    fn overlay(position: OverlayPosition, start: f64, duration: f64) -> TextOverlay {
        TextOverlay::new("caption", position, start, duration)
    }

    fn clip_at(id: u64, start: f64, duration: f64, overlays: Vec<TextOverlay>) -> ClipRecord {
        ClipRecord {
            id: ClipId(id),
            name: format!("clip {id}"),
            kind: ClipKind::Image,
            content: ContentHandle::new(format!("{id}.png")),
            raw_duration: None,
            requested_duration: Some(duration),
            trim_start: 0.0,
            effective_duration: duration,
            start_time_global: start,
            end_time_global: start + duration,
            overlays,
        }
    }

    #[test]
    fn test_visibility_window_is_closed() {
        let o = overlay(OverlayPosition::Center, 2.0, 3.0);
        assert!(!o.is_visible(1.99));
        assert!(o.is_visible(2.0));
        assert!(o.is_visible(5.0));
        assert!(!o.is_visible(5.01));
    }

    #[test]
    fn test_same_position_overlap_rejected() {
        let set = vec![
            overlay(OverlayPosition::TopLeft, 0.0, 5.0),
            overlay(OverlayPosition::TopLeft, 3.0, 5.0),
        ];
        assert!(!validate(&set));
        assert!(matches!(
            validate_overlays(&set),
            Err(TimelineError::OverlayConflict {
                position: OverlayPosition::TopLeft,
                first: 0,
                second: 1,
            })
        ));
    }

    #[test]
    fn test_touching_and_cross_position_overlays_allowed() {
        let set = vec![
            overlay(OverlayPosition::TopLeft, 0.0, 5.0),
            overlay(OverlayPosition::TopLeft, 5.0, 2.0),
            overlay(OverlayPosition::BottomRight, 1.0, 10.0),
        ];
        assert!(validate(&set));
    }

    #[test]
    fn test_invalid_windows_rejected() {
        assert!(matches!(
            validate_overlays(&[overlay(OverlayPosition::Center, -1.0, 2.0)]),
            Err(TimelineError::InvalidOverlay { .. })
        ));
        assert!(matches!(
            validate_overlays(&[overlay(OverlayPosition::Center, 1.0, 0.0)]),
            Err(TimelineError::InvalidOverlay { .. })
        ));
        assert!(!validate(&[overlay(OverlayPosition::Center, f64::NAN, 1.0)]));
    }

    #[test]
    fn test_visible_at_filters() {
        let set = vec![
            overlay(OverlayPosition::TopLeft, 0.0, 2.0),
            overlay(OverlayPosition::TopRight, 1.0, 2.0),
            overlay(OverlayPosition::Center, 4.0, 1.0),
        ];
        let visible: Vec<_> = visible_at(&set, 1.5).map(|o| o.position).collect();
        assert_eq!(
            visible,
            vec![OverlayPosition::TopLeft, OverlayPosition::TopRight]
        );
    }

    #[test]
    fn test_report_projects_into_global_time() {
        let clips = vec![
            clip_at(0, 0.0, 5.0, vec![overlay(OverlayPosition::TopLeft, 1.0, 2.0)]),
            clip_at(1, 5.0, 10.0, vec![overlay(OverlayPosition::TopLeft, 0.5, 1.0)]),
        ];
        let report = report_by_position(&clips, OverlayPosition::TopLeft);
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].start_global, 1.0);
        assert_eq!(report[0].end_global, 3.0);
        assert_eq!(report[1].start_global, 5.5);
        assert!(report.iter().all(|e| !e.conflict));
        assert!(report_by_position(&clips, OverlayPosition::Center).is_empty());
    }

    #[test]
    fn test_report_merges_overlay_spilling_into_next_clip() {
        // The first overlay outlives its 5s clip and collides with the next one.
        let clips = vec![
            clip_at(0, 0.0, 5.0, vec![overlay(OverlayPosition::Center, 3.0, 4.0)]),
            clip_at(1, 5.0, 5.0, vec![overlay(OverlayPosition::Center, 1.0, 2.0)]),
            clip_at(2, 10.0, 5.0, vec![overlay(OverlayPosition::Center, 0.0, 1.0)]),
        ];
        let report = report_by_position(&clips, OverlayPosition::Center);
        assert_eq!(report.len(), 2);
        assert!(report[0].conflict);
        assert_eq!(report[0].start_global, 3.0);
        assert_eq!(report[0].end_global, 8.0);
        assert_eq!(report[0].clip_ids, vec![ClipId(0), ClipId(1)]);
        assert_eq!(report[0].texts.len(), 2);
        assert!(!report[1].conflict);
        assert_eq!(report[1].start_global, 10.0);
    }
}
