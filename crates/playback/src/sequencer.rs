//! Playback sequencer: the state machine that owns playback position,
//! clip transitions, and the render loop's lifecycle.
//!
//! Every entry point runs one transition to completion. The sequencer
//! holds at most one open [`MediaSource`] and at most one pending frame
//! callback; both are released through `Option::take`, so each is closed
//! or cancelled exactly once.

use serde::Serialize;

use montage_common::clock::{ns_to_secs, DriftMeasurement, RateController};
use montage_common::config::PlaybackDefaults;
use montage_timeline::{
    visible_at, ClipId, ClipInput, ClipKind, ClipRecord, DurationPolicy, TextOverlay, Timeline,
    TimelineError, TimelineResult, TrimNotice,
};

use crate::compositor::{Compositor, CompositorConfig, ControlHit, FrameView};
use crate::host::{FrameHandle, FrameRef, Host, LoadToken, MediaEvent, MediaEventKind, MediaSource};

/// State of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Not playing; position is at the start of the current clip or
    /// wherever the last seek left it.
    Stopped,
    /// Clock and content are running.
    Playing,
    /// Clock and content are held at the captured position.
    Paused,
}

/// Sequencer settings.
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Upper bound on draws per second while playing.
    pub frame_rate_hz: u32,

    /// Source/clock drift that triggers a re-seek (milliseconds).
    pub resync_threshold_ms: f64,

    /// Compositor layout and behavior.
    pub compositor: CompositorConfig,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self::from_defaults(&PlaybackDefaults::default())
    }
}

impl SequencerConfig {
    pub fn from_defaults(defaults: &PlaybackDefaults) -> Self {
        Self {
            frame_rate_hz: defaults.frame_rate_hz,
            resync_threshold_ms: defaults.resync_threshold_ms,
            compositor: CompositorConfig::from_defaults(defaults),
        }
    }
}

/// Duration policy described by application defaults.
pub fn duration_policy(defaults: &PlaybackDefaults) -> DurationPolicy {
    DurationPolicy {
        default_image_duration: defaults.default_image_duration_secs,
        min_image_duration: defaults.min_image_duration_secs,
        min_video_duration: defaults.min_video_duration_secs,
    }
}

/// A discrete edit delivered by the editing collaborator.
#[derive(Debug, Clone)]
pub enum TimelineEdit {
    Append(ClipInput),
    Remove {
        index: usize,
    },
    Reorder {
        from: usize,
        to: usize,
    },
    SetDuration {
        clip_id: ClipId,
        duration: Option<f64>,
    },
    Trim {
        clip_id: ClipId,
        start_offset: f64,
        duration: f64,
    },
    AddOverlay {
        clip_id: ClipId,
        overlay: TextOverlay,
    },
    ReplaceOverlay {
        clip_id: ClipId,
        index: usize,
        overlay: TextOverlay,
    },
    RemoveOverlay {
        clip_id: ClipId,
        index: usize,
    },
    /// Renegotiate every clip under new duration rules.
    SetPolicy(DurationPolicy),
    SelectClip {
        clip_id: ClipId,
    },
}

/// Notification for the host, drained with [`Sequencer::drain_events`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SequencerEvent {
    /// The clip list after a mutation, with recomputed bounds.
    TimelineChanged { clips: Vec<ClipRecord> },
    /// Negotiation capped a video or an in-source trim was applied.
    Trimmed { notice: TrimNotice },
    StateChanged { state: PlaybackState },
    ClipChanged { index: usize, clip_id: ClipId },
    /// The sequence ran past its last clip and restarted at the first.
    Wrapped,
    /// A clip failed to load or decode and was passed over.
    ClipSkipped { clip_id: ClipId, reason: String },
    FullscreenChanged { fullscreen: bool },
}

/// The loaded content of the current clip.
struct ActiveClip {
    clip_id: ClipId,
    token: LoadToken,
    source: Option<Box<dyn MediaSource>>,
    ready: bool,
    natural_size: Option<(u32, u32)>,
}

impl ActiveClip {
    fn close(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.close();
        }
    }
}

/// Plays a timeline as one continuous sequence.
pub struct Sequencer {
    config: SequencerConfig,
    host: Host,
    timeline: Timeline,
    compositor: Compositor,
    rate: RateController,
    state: PlaybackState,
    current_index: usize,
    /// Position inside the current clip; authoritative unless the clock
    /// is running, in which case it is refreshed every frame.
    elapsed_in_current: f64,
    /// Clock time at which the current clip's local time was zero.
    clock_origin: f64,
    active: Option<ActiveClip>,
    pending_frame: Option<FrameHandle>,
    next_token: u64,
    fullscreen: bool,
    consecutive_failures: usize,
    events: Vec<SequencerEvent>,
    shut_down: bool,
}

impl Sequencer {
    /// Create a sequencer in the `Stopped` state with the first clip
    /// loaded and paused.
    pub fn new(timeline: Timeline, config: SequencerConfig, host: Host) -> Self {
        let now = host.clock.now_secs();
        let mut sequencer = Self {
            compositor: Compositor::new(config.compositor.clone(), now),
            rate: RateController::new(config.frame_rate_hz),
            config,
            host,
            timeline,
            state: PlaybackState::Stopped,
            current_index: 0,
            elapsed_in_current: 0.0,
            clock_origin: now,
            active: None,
            pending_frame: None,
            next_token: 0,
            fullscreen: false,
            consecutive_failures: 0,
            events: vec![],
            shut_down: false,
        };
        sequencer.load_current();
        sequencer.draw();
        sequencer
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_clip(&self) -> Option<&ClipRecord> {
        self.timeline.get(self.current_index)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Whether a frame callback is outstanding.
    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }

    /// Position inside the current clip (seconds).
    pub fn elapsed_in_current(&self) -> f64 {
        if self.state == PlaybackState::Playing && self.clock_running() {
            (self.now() - self.clock_origin).clamp(0.0, self.current_effective())
        } else {
            self.elapsed_in_current
        }
    }

    /// Position in the whole sequence (seconds).
    pub fn cumulative_time(&self) -> f64 {
        let total = self.timeline.total_duration();
        (self.timeline.prefix_duration(self.current_index) + self.elapsed_in_current())
            .clamp(0.0, total)
    }

    /// Take the notifications produced since the last call.
    ///
    /// Events accumulate until drained, so hosts should drain after every
    /// call into the sequencer. Back-to-back timeline changes are collapsed
    /// into the latest one.
    pub fn drain_events(&mut self) -> Vec<SequencerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Start or resume playback from the current position.
    pub fn play(&mut self) {
        if self.shut_down || self.state == PlaybackState::Playing {
            return;
        }
        if self.timeline.is_empty() {
            tracing::debug!("Play requested on an empty timeline");
            return;
        }

        self.clock_origin = self.now() - self.elapsed_in_current;
        self.rate.reset();
        self.set_state(PlaybackState::Playing);
        if self.active.is_none() {
            self.load_current();
        }
        self.start_active();
        self.schedule_frame();
    }

    /// Hold playback at the current position.
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.elapsed_in_current = self.elapsed_in_current();
        if let Some(source) = self.ready_source() {
            source.pause();
        }
        self.cancel_frame();
        self.set_state(PlaybackState::Paused);
        self.draw();
    }

    pub fn toggle(&mut self) {
        if self.state == PlaybackState::Playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Jump to a fraction of the current clip. Values outside `[0, 1]`
    /// are clamped; NaN seeks to the start.
    pub fn seek(&mut self, fraction: f64) {
        if self.shut_down || self.timeline.is_empty() {
            return;
        }
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };

        self.elapsed_in_current = fraction * self.current_effective();
        self.clock_origin = self.now() - self.elapsed_in_current;
        let offset = self.current_source_offset();
        if let Some(source) = self.ready_source() {
            source.seek(offset);
        }
        tracing::debug!(
            index = self.current_index,
            elapsed = self.elapsed_in_current,
            "Seek"
        );

        self.cancel_frame();
        if self.state == PlaybackState::Playing {
            self.rate.reset();
            self.schedule_frame();
        } else {
            self.draw();
        }
    }

    /// Make the clip at `index` current, starting at its first frame.
    /// The playback state is kept.
    pub fn select_clip(&mut self, index: usize) -> TimelineResult<()> {
        let len = self.timeline.len();
        if index >= len {
            return Err(TimelineError::IndexOutOfRange { index, len });
        }
        if self.shut_down {
            return Ok(());
        }

        self.cancel_frame();
        self.release_active();
        self.current_index = index;
        self.elapsed_in_current = 0.0;
        self.clock_origin = self.now();
        self.consecutive_failures = 0;
        self.emit_clip_changed();
        self.load_current();
        self.resume_loop();
        Ok(())
    }

    pub fn select_clip_by_id(&mut self, clip_id: ClipId) -> TimelineResult<()> {
        let index = self
            .timeline
            .index_of(clip_id)
            .ok_or(TimelineError::UnknownClip { id: clip_id })?;
        self.select_clip(index)
    }

    /// Apply an edit to the timeline.
    ///
    /// A rejected edit leaves the timeline and playback untouched. Adding,
    /// removing or reordering clips stops playback and returns to the
    /// first clip; other edits keep the position, clamped to the new
    /// duration.
    pub fn apply(&mut self, edit: TimelineEdit) -> TimelineResult<()> {
        if self.shut_down {
            return Err(TimelineError::InvalidEdit {
                message: "sequencer is shut down".to_string(),
            });
        }
        let revision = self.timeline.structure_revision();
        let mut removed = None;

        match edit {
            TimelineEdit::Append(input) => {
                let (_, trim) = self.timeline.append(input)?;
                self.push_trim(trim);
            }
            TimelineEdit::Remove { index } => {
                removed = Some(self.timeline.remove(index)?);
            }
            TimelineEdit::Reorder { from, to } => self.timeline.reorder(from, to)?,
            TimelineEdit::SetDuration { clip_id, duration } => {
                let trim = self.timeline.set_duration(clip_id, duration)?;
                self.push_trim(trim);
            }
            TimelineEdit::Trim {
                clip_id,
                start_offset,
                duration,
            } => {
                let notice = self.timeline.trim(clip_id, start_offset, duration)?;
                self.push_trim(Some(notice));
            }
            TimelineEdit::AddOverlay { clip_id, overlay } => {
                self.timeline.add_overlay(clip_id, overlay)?;
            }
            TimelineEdit::ReplaceOverlay {
                clip_id,
                index,
                overlay,
            } => {
                self.timeline.replace_overlay(clip_id, index, overlay)?;
            }
            TimelineEdit::RemoveOverlay { clip_id, index } => {
                self.timeline.remove_overlay(clip_id, index)?;
            }
            TimelineEdit::SetPolicy(policy) => {
                for notice in self.timeline.set_policy(policy) {
                    self.push_trim(Some(notice));
                }
            }
            TimelineEdit::SelectClip { clip_id } => return self.select_clip_by_id(clip_id),
        }

        if self.timeline.structure_revision() != revision {
            self.reset_to_start();
            if let Some(clip) = removed {
                self.host.backend.release_content(&clip.content);
            }
        } else {
            self.retime_current();
        }
        self.emit_timeline_changed();
        Ok(())
    }

    /// Deliver a media notification.
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        if self.shut_down {
            return;
        }
        let clip_id = match self.active.as_ref() {
            Some(active) if active.token == event.token => active.clip_id,
            active => {
                tracing::trace!(
                    token = event.token.0,
                    active = ?active.map(|a| a.token.0),
                    "Dropping stale media event"
                );
                return;
            }
        };

        match event.kind {
            MediaEventKind::MetadataReady { duration_secs } => {
                self.apply_metadata(clip_id, duration_secs)
            }
            MediaEventKind::SizeReady { width, height } => {
                if let Some(active) = self.active.as_mut() {
                    active.natural_size = Some((width, height));
                }
                if self.state != PlaybackState::Playing {
                    self.draw();
                }
            }
            MediaEventKind::Ready => self.on_ready(),
            MediaEventKind::Error { message } => self.fail_active(clip_id, message),
            MediaEventKind::Ended => {
                if self.state == PlaybackState::Playing {
                    tracing::debug!(%clip_id, "Source ended before its slot");
                    self.advance();
                }
            }
        }
    }

    /// Frame callback from the host scheduler.
    pub fn on_frame(&mut self, handle: FrameHandle) {
        if self.pending_frame != Some(handle) {
            tracing::trace!(handle = handle.0, "Dropping stale frame callback");
            return;
        }
        self.pending_frame = None;
        if self.shut_down || self.state != PlaybackState::Playing {
            return;
        }

        let now_ns = self.host.clock.now_ns();
        let now = ns_to_secs(now_ns);
        if self.clock_running() {
            self.elapsed_in_current = (now - self.clock_origin).max(0.0);
        } else {
            // Loading time does not count against the slot.
            self.clock_origin = now - self.elapsed_in_current;
        }

        let effective = self.current_effective();
        if self.elapsed_in_current >= effective {
            self.elapsed_in_current = effective;
            self.advance();
            return;
        }

        self.correct_drift();
        if self.rate.should_tick(now_ns) {
            self.draw();
        }
        self.schedule_frame();
    }

    /// Pointer moved over the surface.
    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        let now = self.now();
        self.compositor.pointer_moved(x, y, now);
        if self.state != PlaybackState::Playing {
            self.draw();
        }
    }

    /// Pointer left the surface.
    pub fn pointer_left(&mut self) {
        self.compositor.pointer_left();
        if self.state != PlaybackState::Playing {
            self.draw();
        }
    }

    /// Pointer pressed; dispatches any transport control under it.
    pub fn pointer_pressed(&mut self, x: f64, y: f64) -> Option<ControlHit> {
        let now = self.now();
        self.compositor.pointer_moved(x, y, now);
        let size = self.host.surface.size();
        let hit = self.compositor.hit_test(x, y, size);
        match hit {
            Some(ControlHit::PlayPause) => self.toggle(),
            Some(ControlHit::Seek(fraction)) => self.seek(fraction),
            Some(ControlHit::Fullscreen) => self.toggle_fullscreen(),
            None => {
                if self.state != PlaybackState::Playing {
                    self.draw();
                }
            }
        }
        hit
    }

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
        self.host.surface.set_fullscreen(self.fullscreen);
        self.events.push(SequencerEvent::FullscreenChanged {
            fullscreen: self.fullscreen,
        });
        if self.state != PlaybackState::Playing {
            self.draw();
        }
    }

    /// Draw one frame now, e.g. after the surface was resized.
    pub fn redraw(&mut self) {
        self.draw();
    }

    /// Stop playback and release every host resource. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.cancel_frame();
        self.release_active();
        for clip in self.timeline.clips() {
            self.host.backend.release_content(&clip.content);
        }
        self.state = PlaybackState::Stopped;
        self.shut_down = true;
        tracing::info!(clips = self.timeline.len(), "Sequencer shut down");
    }

    fn now(&self) -> f64 {
        self.host.clock.now_secs()
    }

    fn current_effective(&self) -> f64 {
        self.current_clip()
            .map(|clip| clip.effective_duration)
            .unwrap_or(0.0)
    }

    fn current_source_offset(&self) -> f64 {
        self.current_clip()
            .map(|clip| clip.source_offset(self.elapsed_in_current))
            .unwrap_or(0.0)
    }

    /// The clock is held while the current clip's content is loading.
    fn clock_running(&self) -> bool {
        self.active.as_ref().map_or(true, |active| active.ready)
    }

    fn ready_source(&mut self) -> Option<&mut Box<dyn MediaSource>> {
        self.active
            .as_mut()
            .filter(|active| active.ready)
            .and_then(|active| active.source.as_mut())
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        tracing::debug!(from = ?self.state, to = ?state, "Playback state changed");
        self.state = state;
        self.events.push(SequencerEvent::StateChanged { state });
    }

    fn emit_clip_changed(&mut self) {
        if let Some(clip) = self.timeline.get(self.current_index) {
            tracing::debug!(index = self.current_index, clip = %clip.id, name = %clip.name, "Current clip changed");
            self.events.push(SequencerEvent::ClipChanged {
                index: self.current_index,
                clip_id: clip.id,
            });
        }
    }

    fn emit_timeline_changed(&mut self) {
        if matches!(self.events.last(), Some(SequencerEvent::TimelineChanged { .. })) {
            self.events.pop();
        }
        self.events.push(SequencerEvent::TimelineChanged {
            clips: self.timeline.clips().to_vec(),
        });
    }

    fn push_trim(&mut self, notice: Option<TrimNotice>) {
        if let Some(notice) = notice {
            tracing::info!(
                clip = %notice.clip_id,
                start_offset = notice.start_offset,
                duration = notice.duration,
                "Clip trimmed"
            );
            self.events.push(SequencerEvent::Trimmed { notice });
        }
    }

    fn schedule_frame(&mut self) {
        self.cancel_frame();
        if !self.shut_down {
            self.pending_frame = Some(self.host.scheduler.request_frame());
        }
    }

    fn cancel_frame(&mut self) {
        if let Some(handle) = self.pending_frame.take() {
            self.host.scheduler.cancel(handle);
        }
    }

    fn release_active(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.close();
        }
    }

    /// Open the current clip's content, skipping clips that fail to open.
    fn load_current(&mut self) {
        self.release_active();
        loop {
            if self.shut_down {
                return;
            }
            let Some(clip) = self.timeline.get(self.current_index) else {
                return;
            };
            let clip_id = clip.id;
            let token = LoadToken(self.next_token);
            self.next_token += 1;

            match self.host.backend.open(clip, token) {
                Ok(source) => {
                    tracing::debug!(clip = %clip_id, token = token.0, "Loading clip content");
                    self.active = Some(ActiveClip {
                        clip_id,
                        token,
                        source: Some(source),
                        ready: false,
                        natural_size: None,
                    });
                    return;
                }
                Err(err) if !err.is_recoverable() => {
                    // The backend itself is unusable; other clips would fail too.
                    tracing::error!(clip = %clip_id, error = %err, "Media backend failed; holding an empty slot");
                    self.events.push(SequencerEvent::ClipSkipped {
                        clip_id,
                        reason: err.to_string(),
                    });
                    return;
                }
                Err(err) => {
                    if !self.note_failure(clip_id, err.to_string()) {
                        return;
                    }
                    self.step_index();
                }
            }
        }
    }

    /// Record a load failure. Returns whether to move on to the next clip;
    /// once every clip has failed in a row the slot is held empty instead.
    fn note_failure(&mut self, clip_id: ClipId, reason: String) -> bool {
        tracing::warn!(clip = %clip_id, %reason, "Skipping clip that failed to load");
        self.events
            .push(SequencerEvent::ClipSkipped { clip_id, reason });
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.timeline.len() {
            tracing::error!(
                failures = self.consecutive_failures,
                "No clip could be loaded; holding an empty slot"
            );
            return false;
        }
        true
    }

    fn fail_active(&mut self, clip_id: ClipId, reason: String) {
        if self.note_failure(clip_id, reason) {
            self.advance();
        } else {
            self.release_active();
            self.resume_loop();
        }
    }

    fn on_ready(&mut self) {
        let now = self.now();
        self.consecutive_failures = 0;
        self.clock_origin = now - self.elapsed_in_current;
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.ready = true;
        let clip_id = active.clip_id;
        tracing::debug!(clip = %clip_id, "Clip content ready");

        // Backends that never send metadata still know the decoded length.
        if let Some(duration_secs) = self.ready_source().and_then(|source| source.duration()) {
            self.apply_metadata(clip_id, duration_secs);
        }

        if self.state == PlaybackState::Playing {
            self.start_active();
            if self.pending_frame.is_none() {
                self.schedule_frame();
            }
        } else {
            let offset = self.current_source_offset();
            if let Some(source) = self.ready_source() {
                source.seek(offset);
            }
            self.draw();
        }
    }

    /// Position the ready source and start it.
    fn start_active(&mut self) {
        let offset = self.current_source_offset();
        let Some(active) = self.active.as_mut().filter(|active| active.ready) else {
            return;
        };
        let clip_id = active.clip_id;
        let Some(source) = active.source.as_deref_mut() else {
            return;
        };
        source.seek(offset);
        if let Err(err) = source.play() {
            self.fail_active(clip_id, err.to_string());
        }
    }

    /// Continue after a clip change: start the new clip if playing,
    /// otherwise show it.
    fn resume_loop(&mut self) {
        if self.state == PlaybackState::Playing {
            self.rate.reset();
            self.start_active();
            self.schedule_frame();
        } else {
            self.draw();
        }
    }

    fn step_index(&mut self) {
        self.cancel_frame();
        self.release_active();
        let len = self.timeline.len();
        if len == 0 {
            return;
        }
        let next = (self.current_index + 1) % len;
        if next == 0 {
            tracing::debug!("Sequence wrapped to the first clip");
            self.events.push(SequencerEvent::Wrapped);
        }
        self.current_index = next;
        self.elapsed_in_current = 0.0;
        self.clock_origin = self.now();
        self.emit_clip_changed();
    }

    fn advance(&mut self) {
        self.step_index();
        self.load_current();
        self.resume_loop();
    }

    fn reset_to_start(&mut self) {
        self.cancel_frame();
        self.release_active();
        self.set_state(PlaybackState::Stopped);
        self.current_index = 0;
        self.elapsed_in_current = 0.0;
        self.clock_origin = self.now();
        self.consecutive_failures = 0;
        tracing::debug!(clips = self.timeline.len(), "Timeline structure changed; playback reset");
        if !self.timeline.is_empty() {
            self.emit_clip_changed();
            self.load_current();
        }
        self.draw();
    }

    /// Keep the position valid after the current clip's timing changed.
    fn retime_current(&mut self) {
        let elapsed = self.elapsed_in_current().min(self.current_effective());
        self.elapsed_in_current = elapsed;
        self.clock_origin = self.now() - elapsed;
        self.correct_drift();
        if self.state != PlaybackState::Playing {
            self.draw();
        }
    }

    fn apply_metadata(&mut self, clip_id: ClipId, duration_secs: f64) {
        let Some(clip) = self.timeline.clip(clip_id) else {
            return;
        };
        if clip.kind != ClipKind::Video
            || clip
                .raw_duration
                .is_some_and(|raw| (raw - duration_secs).abs() < 1e-6)
        {
            return;
        }

        match self.timeline.set_raw_duration(clip_id, duration_secs) {
            Ok(trim) => {
                tracing::debug!(clip = %clip_id, duration_secs, "Metadata updated clip length");
                self.push_trim(trim);
                self.retime_current();
                self.emit_timeline_changed();
            }
            Err(err) => {
                tracing::warn!(clip = %clip_id, error = %err, "Ignoring invalid media metadata")
            }
        }
    }

    /// Re-seek a playing video whose position strayed from the clock.
    fn correct_drift(&mut self) {
        let Some(clip) = self.timeline.get(self.current_index) else {
            return;
        };
        if clip.kind != ClipKind::Video {
            return;
        }
        let expected = clip.source_offset(self.elapsed_in_current);
        let threshold_ms = self.config.resync_threshold_ms;
        let Some(source) = self.ready_source() else {
            return;
        };

        let drift = DriftMeasurement::from_secs(expected, source.position());
        if drift.exceeds_threshold_ms(threshold_ms) {
            tracing::debug!(drift_ms = drift.drift_ms(), expected, "Re-syncing media source");
            source.seek(expected);
        }
    }

    fn draw(&mut self) {
        if self.shut_down {
            return;
        }
        let now = self.host.clock.now_secs();
        let elapsed = self.elapsed_in_current;
        let clip = self.timeline.get(self.current_index);

        let frame = match (clip, self.active.as_ref()) {
            (Some(clip), Some(active)) if active.ready && active.clip_id == clip.id => {
                Some(FrameRef {
                    content: clip.content.clone(),
                    kind: clip.kind,
                    source_offset: clip.source_offset(elapsed),
                    natural_size: active.natural_size,
                })
            }
            _ => None,
        };
        let (overlays, progress) = match clip {
            Some(clip) if clip.effective_duration > 0.0 => (
                visible_at(&clip.overlays, elapsed).collect(),
                elapsed / clip.effective_duration,
            ),
            _ => (vec![], 0.0),
        };

        let view = FrameView {
            frame,
            overlays,
            playing: self.state == PlaybackState::Playing,
            progress,
            fullscreen: self.fullscreen,
            now_secs: now,
        };
        self.compositor.render(self.host.surface.as_mut(), &view);
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
