//! Duration negotiation: from raw and requested lengths to a playable slot.
//!
//! Negotiation never fails. Out-of-range requests are clamped, and a video
//! request longer than the available media is capped and reported as a
//! [`TrimNotice`] so the caller can apply an in-source trim.

use serde::{Deserialize, Serialize};

use crate::clip::{ClipId, ClipKind};

/// Policy constants used by negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationPolicy {
    /// Slot given to an image when none was requested.
    pub default_image_duration: f64,
    /// Hard floor for image slots.
    pub min_image_duration: f64,
    /// Shortest video slot (unless the source itself is shorter).
    pub min_video_duration: f64,
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self {
            default_image_duration: 5.0,
            min_image_duration: 5.0,
            min_video_duration: 1.0,
        }
    }
}

/// Outcome of a negotiation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Negotiation {
    /// The playable slot length.
    pub effective_duration: f64,
    /// Whether a video request was cut down to the available media.
    pub capped: bool,
}

/// Explicit trim applied to a video clip's source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimNotice {
    /// The clip that was trimmed.
    pub clip_id: ClipId,
    /// In-point into the source (seconds).
    pub start_offset: f64,
    /// Resulting playable length (seconds).
    pub duration: f64,
}

impl DurationPolicy {
    /// Compute the effective duration of a clip.
    ///
    /// `available` is the decoded length after any in-point (video only).
    /// Non-finite or non-positive values of `requested` and `available`
    /// are treated as absent.
    pub fn negotiate(
        &self,
        kind: ClipKind,
        requested: Option<f64>,
        available: Option<f64>,
    ) -> Negotiation {
        let requested = requested.filter(|v| v.is_finite() && *v > 0.0);
        let available = available.filter(|v| v.is_finite() && *v > 0.0);

        match kind {
            ClipKind::Image => Negotiation {
                effective_duration: requested
                    .unwrap_or(self.default_image_duration)
                    .max(self.min_image_duration),
                capped: false,
            },
            ClipKind::Video => match available {
                Some(raw) => {
                    // Sources shorter than the minimum play in full.
                    let floor = self.min_video_duration.min(raw);
                    let wanted = requested.unwrap_or(raw);
                    Negotiation {
                        effective_duration: wanted.clamp(floor, raw),
                        capped: wanted > raw,
                    }
                }
                None => Negotiation {
                    effective_duration: requested
                        .unwrap_or(self.min_video_duration)
                        .max(self.min_video_duration),
                    capped: false,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_video_defaults_to_raw_duration() {
        let n = DurationPolicy::default().negotiate(ClipKind::Video, None, Some(12.0));
        assert_eq!(n.effective_duration, 12.0);
        assert!(!n.capped);
    }

    #[test]
    fn test_video_request_above_raw_is_capped() {
        let n = DurationPolicy::default().negotiate(ClipKind::Video, Some(20.0), Some(12.0));
        assert_eq!(n.effective_duration, 12.0);
        assert!(n.capped);
    }

    #[test]
    fn test_video_request_below_minimum_is_raised() {
        let n = DurationPolicy::default().negotiate(ClipKind::Video, Some(0.2), Some(12.0));
        assert_eq!(n.effective_duration, 1.0);
        assert!(!n.capped);
    }

    #[test]
    fn test_sub_second_video_plays_in_full() {
        let n = DurationPolicy::default().negotiate(ClipKind::Video, Some(3.0), Some(0.4));
        assert_eq!(n.effective_duration, 0.4);
        assert!(n.capped);
    }

    #[test]
    fn test_video_without_metadata_uses_request() {
        let policy = DurationPolicy::default();
        assert_eq!(
            policy
                .negotiate(ClipKind::Video, Some(7.0), None)
                .effective_duration,
            7.0
        );
        assert_eq!(
            policy.negotiate(ClipKind::Video, None, None).effective_duration,
            1.0
        );
    }

    #[test]
    fn test_image_floor_and_default() {
        let policy = DurationPolicy::default();
        assert_eq!(
            policy.negotiate(ClipKind::Image, None, None).effective_duration,
            5.0
        );
        assert_eq!(
            policy
                .negotiate(ClipKind::Image, Some(2.0), None)
                .effective_duration,
            5.0
        );
        assert_eq!(
            policy
                .negotiate(ClipKind::Image, Some(8.0), None)
                .effective_duration,
            8.0
        );
    }

    #[test]
    fn test_garbage_requests_are_ignored() {
        let policy = DurationPolicy::default();
        for bad in [f64::NAN, f64::INFINITY, -4.0, 0.0] {
            assert_eq!(
                policy
                    .negotiate(ClipKind::Video, Some(bad), Some(9.0))
                    .effective_duration,
                9.0
            );
            assert_eq!(
                policy
                    .negotiate(ClipKind::Image, Some(bad), None)
                    .effective_duration,
                5.0
            );
        }
    }

    proptest! {
        #[test]
        fn prop_video_within_bounds(raw in 1.0f64..3600.0, req in proptest::option::of(-10.0f64..7200.0)) {
            let n = DurationPolicy::default().negotiate(ClipKind::Video, req, Some(raw));
            prop_assert!(n.effective_duration >= 1.0);
            prop_assert!(n.effective_duration <= raw);
        }

        #[test]
        fn prop_image_respects_floor(req in proptest::option::of(-10.0f64..600.0)) {
            let n = DurationPolicy::default().negotiate(ClipKind::Image, req, None);
            prop_assert!(n.effective_duration >= 5.0);
        }
    }
}
