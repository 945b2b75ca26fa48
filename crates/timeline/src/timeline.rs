//! The ordered clip list and its derived global time bounds.
//!
//! The free functions ([`recompute`], [`reorder`], [`remove`]) are pure
//! transforms over a clip vector. [`Timeline`] wraps them with identity
//! assignment, duration negotiation and overlay validation so that every
//! externally visible [`ClipRecord`] satisfies the timing invariants:
//!
//! - `start_time_global[i] == sum(effective_duration[..i])`
//! - `end_time_global[i] == start_time_global[i] + effective_duration[i]`

use crate::clip::{ClipId, ClipInput, ClipKind, ClipRecord};
use crate::duration::{DurationPolicy, TrimNotice};
use crate::error::{TimelineError, TimelineResult};
use crate::overlay::{validate_overlays, TextOverlay};

/// Assign global bounds by prefix sum of effective durations.
pub fn recompute(mut clips: Vec<ClipRecord>) -> Vec<ClipRecord> {
    recompute_in_place(&mut clips);
    clips
}

/// In-place form of [`recompute`].
pub fn recompute_in_place(clips: &mut [ClipRecord]) {
    let mut cursor = 0.0;
    for clip in clips.iter_mut() {
        clip.start_time_global = cursor;
        clip.end_time_global = cursor + clip.effective_duration;
        cursor = clip.end_time_global;
    }
}

/// Move the clip at `from` so it ends up at `to`, then recompute.
pub fn reorder(
    mut clips: Vec<ClipRecord>,
    from: usize,
    to: usize,
) -> TimelineResult<Vec<ClipRecord>> {
    let len = clips.len();
    for index in [from, to] {
        if index >= len {
            return Err(TimelineError::IndexOutOfRange { index, len });
        }
    }
    let moved = clips.remove(from);
    clips.insert(to, moved);
    Ok(recompute(clips))
}

/// Remove the clip at `index`, then recompute.
///
/// The removed record is handed back so the caller can release its content.
pub fn remove(
    mut clips: Vec<ClipRecord>,
    index: usize,
) -> TimelineResult<(Vec<ClipRecord>, ClipRecord)> {
    if index >= clips.len() {
        return Err(TimelineError::IndexOutOfRange {
            index,
            len: clips.len(),
        });
    }
    let removed = clips.remove(index);
    Ok((recompute(clips), removed))
}

/// Sum of effective durations of the clips before `index`.
pub fn prefix_duration(clips: &[ClipRecord], index: usize) -> f64 {
    clips
        .iter()
        .take(index)
        .map(|clip| clip.effective_duration)
        .sum()
}

/// Sum of all effective durations.
pub fn total_duration(clips: &[ClipRecord]) -> f64 {
    prefix_duration(clips, clips.len())
}

/// The editable sequence of clips.
#[derive(Debug, Clone)]
pub struct Timeline {
    clips: Vec<ClipRecord>,
    policy: DurationPolicy,
    next_id: u64,
    /// Bumped on every add, remove or reorder.
    structure_revision: u64,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(DurationPolicy::default())
    }
}

impl Timeline {
    /// Create an empty timeline with the given duration policy.
    pub fn new(policy: DurationPolicy) -> Self {
        Self {
            clips: vec![],
            policy,
            next_id: 0,
            structure_revision: 0,
        }
    }

    /// Build a timeline from ingested clips.
    ///
    /// Fails on the first input whose overlays do not validate; trims that
    /// negotiation applied along the way are returned.
    pub fn from_inputs(
        policy: DurationPolicy,
        inputs: impl IntoIterator<Item = ClipInput>,
    ) -> TimelineResult<(Self, Vec<TrimNotice>)> {
        let mut timeline = Self::new(policy);
        let mut trims = vec![];
        for input in inputs {
            let (_, trim) = timeline.append(input)?;
            trims.extend(trim);
        }
        Ok((timeline, trims))
    }

    pub fn clips(&self) -> &[ClipRecord] {
        &self.clips
    }

    pub fn policy(&self) -> &DurationPolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ClipRecord> {
        self.clips.get(index)
    }

    pub fn clip(&self, id: ClipId) -> Option<&ClipRecord> {
        self.clips.iter().find(|clip| clip.id == id)
    }

    pub fn index_of(&self, id: ClipId) -> Option<usize> {
        self.clips.iter().position(|clip| clip.id == id)
    }

    /// Counter that changes whenever clips are added, removed or reordered.
    pub fn structure_revision(&self) -> u64 {
        self.structure_revision
    }

    pub fn total_duration(&self) -> f64 {
        total_duration(&self.clips)
    }

    pub fn prefix_duration(&self, index: usize) -> f64 {
        prefix_duration(&self.clips, index)
    }

    /// Index of the clip playing at a global time, if any.
    pub fn index_at(&self, global_secs: f64) -> Option<usize> {
        self.clips
            .iter()
            .position(|clip| clip.contains_global(global_secs))
    }

    /// Append an ingested clip, negotiating its duration.
    pub fn append(&mut self, input: ClipInput) -> TimelineResult<(ClipId, Option<TrimNotice>)> {
        validate_overlays(&input.overlays)?;

        let trim_start = match input.kind {
            ClipKind::Video => input
                .trim_start
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(0.0),
            ClipKind::Image => 0.0,
        };
        if let Some(raw) = input.raw_duration {
            if input.kind == ClipKind::Video && trim_start >= raw {
                return Err(TimelineError::InvalidEdit {
                    message: format!("in-point {trim_start}s is past the end of a {raw}s source"),
                });
            }
        }

        let id = ClipId(self.next_id);
        let mut clip = ClipRecord {
            id,
            name: input.name,
            kind: input.kind,
            content: input.content,
            raw_duration: input.raw_duration,
            requested_duration: input.requested_duration,
            trim_start,
            effective_duration: 0.0,
            start_time_global: 0.0,
            end_time_global: 0.0,
            overlays: input.overlays,
        };
        let trim = negotiate_clip(&self.policy, &mut clip);

        self.next_id += 1;
        self.clips.push(clip);
        recompute_in_place(&mut self.clips);
        self.structure_changed();
        Ok((id, trim))
    }

    /// Remove the clip at `index`. The caller releases its content.
    pub fn remove(&mut self, index: usize) -> TimelineResult<ClipRecord> {
        let len = self.clips.len();
        if index >= len {
            return Err(TimelineError::IndexOutOfRange { index, len });
        }
        let (clips, removed) = remove(std::mem::take(&mut self.clips), index)?;
        self.clips = clips;
        self.structure_changed();
        Ok(removed)
    }

    /// Move the clip at `from` to `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> TimelineResult<()> {
        let len = self.clips.len();
        if from >= len || to >= len {
            return Err(TimelineError::IndexOutOfRange {
                index: from.max(to),
                len,
            });
        }
        if from == to {
            return Ok(());
        }
        self.clips = reorder(std::mem::take(&mut self.clips), from, to)?;
        self.structure_changed();
        Ok(())
    }

    /// Change the requested slot length of a clip (`None` resets to default).
    ///
    /// Returns a trim notice when a video request had to be capped.
    pub fn set_duration(
        &mut self,
        id: ClipId,
        requested: Option<f64>,
    ) -> TimelineResult<Option<TrimNotice>> {
        let policy = self.policy;
        let clip = self.clip_mut(id)?;
        clip.requested_duration = requested;
        let trim = negotiate_clip(&policy, clip);
        recompute_in_place(&mut self.clips);
        Ok(trim)
    }

    /// Apply an in-source trim to a video clip.
    ///
    /// Always reports the resulting `(start_offset, duration)`.
    pub fn trim(
        &mut self,
        id: ClipId,
        start_offset: f64,
        duration: f64,
    ) -> TimelineResult<TrimNotice> {
        if !start_offset.is_finite() || start_offset < 0.0 {
            return Err(TimelineError::InvalidEdit {
                message: format!("in-point must be >= 0, got {start_offset}"),
            });
        }
        let policy = self.policy;
        let clip = self.clip_mut(id)?;
        if clip.kind != ClipKind::Video {
            return Err(TimelineError::InvalidEdit {
                message: format!("{} is an image and cannot be trimmed", clip.id),
            });
        }
        if let Some(raw) = clip.raw_duration {
            if start_offset >= raw {
                return Err(TimelineError::InvalidEdit {
                    message: format!("in-point {start_offset}s is past the end of a {raw}s source"),
                });
            }
        }

        clip.trim_start = start_offset;
        clip.requested_duration = Some(duration);
        negotiate_clip(&policy, clip);
        let notice = TrimNotice {
            clip_id: clip.id,
            start_offset: clip.trim_start,
            duration: clip.effective_duration,
        };
        recompute_in_place(&mut self.clips);
        Ok(notice)
    }

    /// Record a video's decoded length once its metadata is known.
    pub fn set_raw_duration(
        &mut self,
        id: ClipId,
        raw_duration: f64,
    ) -> TimelineResult<Option<TrimNotice>> {
        if !raw_duration.is_finite() || raw_duration <= 0.0 {
            return Err(TimelineError::InvalidEdit {
                message: format!("raw duration must be > 0, got {raw_duration}"),
            });
        }
        let policy = self.policy;
        let clip = self.clip_mut(id)?;
        if clip.kind != ClipKind::Video {
            return Ok(None);
        }
        clip.raw_duration = Some(raw_duration);
        if clip.trim_start >= raw_duration {
            clip.trim_start = 0.0;
        }
        let trim = negotiate_clip(&policy, clip);
        recompute_in_place(&mut self.clips);
        Ok(trim)
    }

    /// Swap the duration policy and renegotiate every clip.
    pub fn set_policy(&mut self, policy: DurationPolicy) -> Vec<TrimNotice> {
        self.policy = policy;
        let trims = self
            .clips
            .iter_mut()
            .filter_map(|clip| negotiate_clip(&policy, clip))
            .collect();
        recompute_in_place(&mut self.clips);
        trims
    }

    /// Add an overlay to a clip, rejecting it if the set would not validate.
    pub fn add_overlay(&mut self, id: ClipId, overlay: TextOverlay) -> TimelineResult<()> {
        let clip = self.clip_mut(id)?;
        let mut proposed = clip.overlays.clone();
        proposed.push(overlay);
        validate_overlays(&proposed)?;
        clip.overlays = proposed;
        Ok(())
    }

    /// Replace the overlay at `index`, rejecting the edit if it conflicts.
    pub fn replace_overlay(
        &mut self,
        id: ClipId,
        index: usize,
        overlay: TextOverlay,
    ) -> TimelineResult<TextOverlay> {
        let clip = self.clip_mut(id)?;
        let len = clip.overlays.len();
        if index >= len {
            return Err(TimelineError::OverlayIndexOutOfRange { id, index, len });
        }
        let mut proposed = clip.overlays.clone();
        let previous = std::mem::replace(&mut proposed[index], overlay);
        validate_overlays(&proposed)?;
        clip.overlays = proposed;
        Ok(previous)
    }

    /// Remove the overlay at `index`.
    pub fn remove_overlay(&mut self, id: ClipId, index: usize) -> TimelineResult<TextOverlay> {
        let clip = self.clip_mut(id)?;
        let len = clip.overlays.len();
        if index >= len {
            return Err(TimelineError::OverlayIndexOutOfRange { id, index, len });
        }
        let mut proposed = clip.overlays.clone();
        let removed = proposed.remove(index);
        validate_overlays(&proposed)?;
        clip.overlays = proposed;
        Ok(removed)
    }

    fn clip_mut(&mut self, id: ClipId) -> TimelineResult<&mut ClipRecord> {
        self.clips
            .iter_mut()
            .find(|clip| clip.id == id)
            .ok_or(TimelineError::UnknownClip { id })
    }

    fn structure_changed(&mut self) {
        self.structure_revision += 1;
    }
}

/// Renegotiate one clip in place, returning a notice if a video was capped.
fn negotiate_clip(policy: &DurationPolicy, clip: &mut ClipRecord) -> Option<TrimNotice> {
    let negotiation =
        policy.negotiate(clip.kind, clip.requested_duration, clip.available_duration());
    clip.effective_duration = negotiation.effective_duration;
    negotiation.capped.then_some(TrimNotice {
        clip_id: clip.id,
        start_offset: clip.trim_start,
        duration: clip.effective_duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::OverlayPosition;
    use proptest::prelude::*;

    fn three_clip_timeline() -> Timeline {
        let (timeline, trims) = Timeline::from_inputs(
            DurationPolicy::default(),
            vec![
                ClipInput::image("a.png", "a.png").with_duration(5.0),
                ClipInput::video("b.mp4", "b.mp4", 10.0),
                ClipInput::image("c.png", "c.png"),
            ],
        )
        .unwrap();
        assert!(trims.is_empty());
        timeline
    }

    fn assert_contiguous(clips: &[ClipRecord]) {
        let mut expected_start = 0.0;
        for clip in clips {
            assert!((clip.start_time_global - expected_start).abs() < 1e-9);
            assert!(
                (clip.end_time_global - (clip.start_time_global + clip.effective_duration)).abs()
                    < 1e-9
            );
            expected_start = clip.end_time_global;
        }
    }

    #[test]
    fn test_bounds_after_append() {
        let timeline = three_clip_timeline();
        let starts: Vec<f64> = timeline
            .clips()
            .iter()
            .map(|c| c.start_time_global)
            .collect();
        assert_eq!(starts, vec![0.0, 5.0, 15.0]);
        assert_eq!(timeline.total_duration(), 20.0);
        assert_eq!(timeline.prefix_duration(2), 15.0);
        assert_eq!(timeline.index_at(14.9), Some(1));
        assert_eq!(timeline.index_at(20.0), None);
    }

    #[test]
    fn test_reorder_recomputes_bounds() {
        let mut timeline = three_clip_timeline();
        let before = timeline.structure_revision();
        timeline.reorder(1, 0).unwrap();
        assert_eq!(timeline.clips()[0].name, "b.mp4");
        assert_eq!(timeline.clips()[1].start_time_global, 10.0);
        assert_contiguous(timeline.clips());
        assert_eq!(timeline.structure_revision(), before + 1);
    }

    #[test]
    fn test_reorder_out_of_range_leaves_timeline_untouched() {
        let mut timeline = three_clip_timeline();
        let before = timeline.clips().to_vec();
        assert!(matches!(
            timeline.reorder(0, 3),
            Err(TimelineError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert_eq!(timeline.clips(), before.as_slice());
    }

    #[test]
    fn test_remove_hands_back_record() {
        let mut timeline = three_clip_timeline();
        let removed = timeline.remove(0).unwrap();
        assert_eq!(removed.name, "a.png");
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.clips()[0].start_time_global, 0.0);
        assert_eq!(timeline.total_duration(), 15.0);
        assert!(timeline.remove(5).is_err());
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn test_set_duration_caps_video_and_reports_trim() {
        let mut timeline = three_clip_timeline();
        let id = timeline.clips()[1].id;
        let trim = timeline.set_duration(id, Some(25.0)).unwrap();
        assert_eq!(
            trim,
            Some(TrimNotice {
                clip_id: id,
                start_offset: 0.0,
                duration: 10.0
            })
        );
        assert!(timeline.set_duration(id, Some(4.0)).unwrap().is_none());
        assert_eq!(timeline.clips()[2].start_time_global, 9.0);
    }

    #[test]
    fn test_trim_sets_in_point() {
        let mut timeline = three_clip_timeline();
        let id = timeline.clips()[1].id;
        let notice = timeline.trim(id, 4.0, 8.0).unwrap();
        assert_eq!(notice.start_offset, 4.0);
        assert_eq!(notice.duration, 6.0);
        assert_eq!(timeline.clips()[1].effective_duration, 6.0);
        assert_eq!(timeline.total_duration(), 16.0);

        let image = timeline.clips()[0].id;
        assert!(timeline.trim(image, 1.0, 2.0).is_err());
        assert!(timeline.trim(id, 10.0, 2.0).is_err());
    }

    #[test]
    fn test_late_metadata_renegotiates() {
        let mut timeline = Timeline::default();
        let mut input = ClipInput::video("late.mp4", "late.mp4", 0.0).with_duration(30.0);
        input.raw_duration = None;
        let (id, trim) = timeline.append(input).unwrap();
        assert!(trim.is_none());
        assert_eq!(timeline.clips()[0].effective_duration, 30.0);

        let trim = timeline.set_raw_duration(id, 12.0).unwrap();
        assert_eq!(trim.map(|t| t.duration), Some(12.0));
        assert_eq!(timeline.total_duration(), 12.0);
    }

    #[test]
    fn test_overlay_add_rejected_without_commit() {
        let mut timeline = three_clip_timeline();
        let id = timeline.clips()[0].id;
        timeline
            .add_overlay(id, TextOverlay::new("hi", OverlayPosition::TopLeft, 0.0, 5.0))
            .unwrap();
        let err = timeline
            .add_overlay(id, TextOverlay::new("no", OverlayPosition::TopLeft, 3.0, 5.0))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(timeline.clip(id).unwrap().overlays.len(), 1);
    }

    #[test]
    fn test_overlay_replace_and_remove() {
        let mut timeline = three_clip_timeline();
        let id = timeline.clips()[1].id;
        timeline
            .add_overlay(id, TextOverlay::new("a", OverlayPosition::Center, 0.0, 2.0))
            .unwrap();
        timeline
            .add_overlay(id, TextOverlay::new("b", OverlayPosition::Center, 4.0, 2.0))
            .unwrap();

        let conflict = TextOverlay::new("b2", OverlayPosition::Center, 1.0, 2.0);
        assert!(timeline.replace_overlay(id, 1, conflict).is_err());
        assert_eq!(timeline.clip(id).unwrap().overlays[1].text, "b");

        let moved = TextOverlay::new("b2", OverlayPosition::TopRight, 1.0, 2.0);
        let previous = timeline.replace_overlay(id, 1, moved).unwrap();
        assert_eq!(previous.text, "b");

        let removed = timeline.remove_overlay(id, 0).unwrap();
        assert_eq!(removed.text, "a");
        assert!(matches!(
            timeline.remove_overlay(id, 4),
            Err(TimelineError::OverlayIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_append_rejects_conflicting_input_overlays() {
        let mut timeline = Timeline::default();
        let input = ClipInput::image("x.png", "x.png")
            .with_overlay(TextOverlay::new("1", OverlayPosition::TopLeft, 0.0, 5.0))
            .with_overlay(TextOverlay::new("2", OverlayPosition::TopLeft, 3.0, 5.0));
        assert!(timeline.append(input).is_err());
        assert!(timeline.is_empty());
        assert_eq!(timeline.structure_revision(), 0);
    }

    #[test]
    fn test_reorder_in_place_keeps_structure_revision() {
        let mut timeline = three_clip_timeline();
        let revision = timeline.structure_revision();
        timeline.reorder(1, 1).unwrap();
        assert_eq!(timeline.structure_revision(), revision);
        assert!(timeline.reorder(3, 3).is_err());
    }

    #[test]
    fn test_set_policy_renegotiates_images() {
        let mut timeline = three_clip_timeline();
        timeline.set_policy(DurationPolicy {
            default_image_duration: 2.0,
            min_image_duration: 2.0,
            min_video_duration: 1.0,
        });
        assert_eq!(timeline.clips()[2].effective_duration, 2.0);
        assert_eq!(timeline.clips()[0].effective_duration, 5.0);
        assert_contiguous(timeline.clips());
    }

    fn arb_input() -> impl Strategy<Value = ClipInput> {
        prop_oneof![
            (0.5f64..120.0, proptest::option::of(-5.0f64..200.0)).prop_map(|(raw, req)| {
                let mut input = ClipInput::video("v", "v.mp4", raw);
                input.requested_duration = req;
                input
            }),
            proptest::option::of(-5.0f64..60.0).prop_map(|req| {
                let mut input = ClipInput::image("i", "i.png");
                input.requested_duration = req;
                input
            }),
        ]
    }

    proptest! {
        #[test]
        fn prop_bounds_are_prefix_sums(inputs in proptest::collection::vec(arb_input(), 0..20)) {
            let (timeline, _) = Timeline::from_inputs(DurationPolicy::default(), inputs).unwrap();
            let mut sum = 0.0;
            for clip in timeline.clips() {
                prop_assert!(clip.effective_duration > 0.0);
                prop_assert!((clip.start_time_global - sum).abs() < 1e-6);
                prop_assert!((clip.end_time_global - (clip.start_time_global + clip.effective_duration)).abs() < 1e-6);
                sum += clip.effective_duration;
            }
        }

        #[test]
        fn prop_reorder_preserves_invariants(
            inputs in proptest::collection::vec(arb_input(), 1..12),
            from_seed in any::<usize>(),
            to_seed in any::<usize>(),
        ) {
            let (mut timeline, _) = Timeline::from_inputs(DurationPolicy::default(), inputs).unwrap();
            let total = timeline.total_duration();
            let len = timeline.len();
            timeline.reorder(from_seed % len, to_seed % len).unwrap();
            prop_assert!((timeline.total_duration() - total).abs() < 1e-6);
            let mut sum = 0.0;
            for clip in timeline.clips() {
                prop_assert!((clip.start_time_global - sum).abs() < 1e-6);
                sum += clip.effective_duration;
            }
        }
    }
}
