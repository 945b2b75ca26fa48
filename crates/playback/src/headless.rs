//! In-memory host: a recording surface, a manual frame scheduler and a
//! simulated media backend.
//!
//! Used by the test suite and by `montage simulate`. Every type here is a
//! cheap handle over shared state, so a caller keeps one clone for
//! inspection and hands another to the [`Sequencer`].

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use montage_common::clock::{ns_to_secs, Clock, ManualClock};
use montage_common::error::{MontageError, MontageResult};
use montage_timeline::{ClipKind, ClipRecord, ContentHandle};

use crate::host::{
    Color, FrameHandle, FrameRef, FrameScheduler, Host, LoadToken, MediaBackend, MediaEvent,
    MediaEventKind, MediaSource, Rect, Size, Surface, TextAlign, TextStyle,
};
use crate::sequencer::Sequencer;

const DEFAULT_NATURAL_SIZE: (u32, u32) = (1920, 1080);

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Frame {
        content: ContentHandle,
        source_offset: f64,
        dest: Rect,
    },
    Rect {
        rect: Rect,
        color: Color,
    },
    Text {
        text: String,
        x: f64,
        y: f64,
        align: TextAlign,
    },
}

#[derive(Debug)]
struct SurfaceLog {
    size: Size,
    /// Commands since the last clear.
    commands: Vec<DrawCommand>,
    frames_drawn: u64,
    fullscreen: bool,
}

/// A surface that records what was drawn on it.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    inner: Rc<RefCell<SurfaceLog>>,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SurfaceLog {
                size: Size::new(width, height),
                commands: vec![],
                frames_drawn: 0,
                fullscreen: false,
            })),
        }
    }

    /// Commands of the most recent frame.
    pub fn commands(&self) -> Vec<DrawCommand> {
        self.inner.borrow().commands.clone()
    }

    /// Text drawn in the most recent frame.
    pub fn texts(&self) -> Vec<String> {
        self.inner
            .borrow()
            .commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Content drawn in the most recent frame, if any.
    pub fn last_frame(&self) -> Option<(ContentHandle, f64)> {
        self.inner
            .borrow()
            .commands
            .iter()
            .find_map(|command| match command {
                DrawCommand::Frame {
                    content,
                    source_offset,
                    ..
                } => Some((content.clone(), *source_offset)),
                _ => None,
            })
    }

    pub fn frames_drawn(&self) -> u64 {
        self.inner.borrow().frames_drawn
    }

    pub fn is_fullscreen(&self) -> bool {
        self.inner.borrow().fullscreen
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.inner.borrow_mut().size = Size::new(width, height);
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> Size {
        self.inner.borrow().size
    }

    fn clear(&mut self, color: Color) {
        let mut log = self.inner.borrow_mut();
        log.commands.clear();
        log.commands.push(DrawCommand::Clear(color));
        log.frames_drawn += 1;
    }

    fn draw_frame(&mut self, frame: &FrameRef, dest: Rect) {
        self.inner.borrow_mut().commands.push(DrawCommand::Frame {
            content: frame.content.clone(),
            source_offset: frame.source_offset,
            dest,
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.inner
            .borrow_mut()
            .commands
            .push(DrawCommand::Rect { rect, color });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) {
        self.inner.borrow_mut().commands.push(DrawCommand::Text {
            text: text.to_string(),
            x,
            y,
            align: style.align,
        });
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.inner.borrow_mut().fullscreen = fullscreen;
    }
}

#[derive(Debug, Default)]
struct SchedulerLog {
    next_handle: u64,
    pending: VecDeque<FrameHandle>,
    requested: u64,
    cancelled: u64,
}

/// A frame scheduler whose callbacks fire only when the caller says so.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    inner: Rc<RefCell<SchedulerLog>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the oldest pending callback so it can be delivered.
    pub fn take_pending(&self) -> Option<FrameHandle> {
        self.inner.borrow_mut().pending.pop_front()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    pub fn requested(&self) -> u64 {
        self.inner.borrow().requested
    }

    pub fn cancelled(&self) -> u64 {
        self.inner.borrow().cancelled
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        let mut log = self.inner.borrow_mut();
        let handle = FrameHandle(log.next_handle);
        log.next_handle += 1;
        log.requested += 1;
        log.pending.push_back(handle);
        handle
    }

    fn cancel(&mut self, handle: FrameHandle) {
        let mut log = self.inner.borrow_mut();
        log.pending.retain(|pending| *pending != handle);
        log.cancelled += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    OnOpen,
    AfterOpen,
}

/// How the simulated backend treats one piece of content.
#[derive(Debug, Clone, Default)]
struct MediaProfile {
    /// Length reported by metadata; defaults to the clip's raw duration.
    metadata_secs: Option<f64>,
    /// Length that actually decodes; defaults to the metadata length.
    decodable_secs: Option<f64>,
    natural_size: Option<(u32, u32)>,
    failure: Option<Failure>,
    /// Only expose the length through `MediaSource::duration`.
    withhold_metadata: bool,
}

#[derive(Debug)]
struct SourceState {
    token: LoadToken,
    anchor_position: f64,
    anchor_ns: u64,
    playing: bool,
    speed: f64,
    duration: Option<f64>,
    decodable: Option<f64>,
    ended_reported: bool,
    closed: bool,
}

impl SourceState {
    fn position_at(&self, now_ns: u64) -> f64 {
        let position = if self.playing {
            let elapsed = ns_to_secs(now_ns.saturating_sub(self.anchor_ns));
            self.anchor_position + elapsed * self.speed
        } else {
            self.anchor_position
        };
        match self.decodable {
            Some(end) => position.min(end),
            None => position,
        }
    }

    fn reanchor(&mut self, now_ns: u64) {
        self.anchor_position = self.position_at(now_ns);
        self.anchor_ns = now_ns;
    }
}

#[derive(Debug, Default)]
struct BackendState {
    profiles: HashMap<ContentHandle, MediaProfile>,
    events: VecDeque<MediaEvent>,
    speed: f64,
    sources: Vec<Rc<RefCell<SourceState>>>,
    opened: Vec<(ContentHandle, LoadToken)>,
    closed: Vec<LoadToken>,
    released: Vec<ContentHandle>,
    seeks: u64,
    unavailable: bool,
}

/// A media backend that decodes nothing and reports on a timeline
/// driven by the shared clock.
#[derive(Clone)]
pub struct SimulatedBackend {
    inner: Rc<RefCell<BackendState>>,
    clock: Rc<dyn Clock>,
}

impl SimulatedBackend {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BackendState {
                speed: 1.0,
                ..BackendState::default()
            })),
            clock,
        }
    }

    fn with_profile(&self, content: &str, update: impl FnOnce(&mut MediaProfile)) {
        let mut state = self.inner.borrow_mut();
        update(state.profiles.entry(ContentHandle::new(content)).or_default());
    }

    /// Make `open` fail synchronously for this content.
    pub fn fail_on_open(&self, content: &str) {
        self.with_profile(content, |p| p.failure = Some(Failure::OnOpen));
    }

    /// Report a decode error after opening this content.
    pub fn fail_after_open(&self, content: &str) {
        self.with_profile(content, |p| p.failure = Some(Failure::AfterOpen));
    }

    /// Never send a metadata event for this content; the opened source
    /// still reports its length.
    pub fn withhold_metadata(&self, content: &str) {
        self.with_profile(content, |p| p.withhold_metadata = true);
    }

    /// Make every `open` fail as if the decoder stack were missing.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.borrow_mut().unavailable = unavailable;
    }

    /// Report this length in metadata.
    pub fn set_metadata(&self, content: &str, secs: f64) {
        self.with_profile(content, |p| p.metadata_secs = Some(secs));
    }

    /// Stop decoding this content after `secs`, regardless of metadata.
    pub fn truncate(&self, content: &str, secs: f64) {
        self.with_profile(content, |p| p.decodable_secs = Some(secs));
    }

    pub fn set_natural_size(&self, content: &str, width: u32, height: u32) {
        self.with_profile(content, |p| p.natural_size = Some((width, height)));
    }

    /// Rate at which sources advance relative to the clock. Sources opened
    /// earlier keep their speed.
    pub fn set_playback_speed(&self, speed: f64) {
        self.inner.borrow_mut().speed = speed;
    }

    /// Queue end-of-stream for playing sources that ran out of media.
    pub fn poll(&self) {
        let now_ns = self.clock.now_ns();
        let mut state = self.inner.borrow_mut();
        state.sources.retain(|source| !source.borrow().closed);

        let mut ended = vec![];
        for source in &state.sources {
            let mut source = source.borrow_mut();
            let Some(end) = source.decodable else {
                continue;
            };
            if source.playing && !source.ended_reported && source.position_at(now_ns) >= end {
                source.ended_reported = true;
                ended.push(source.token);
            }
        }
        for token in ended {
            state
                .events
                .push_back(MediaEvent::new(token, MediaEventKind::Ended));
        }
    }

    /// Poll, then take every queued notification.
    pub fn take_events(&self) -> Vec<MediaEvent> {
        self.poll();
        self.inner.borrow_mut().events.drain(..).collect()
    }

    pub fn opened(&self) -> Vec<(ContentHandle, LoadToken)> {
        self.inner.borrow().opened.clone()
    }

    pub fn closed_tokens(&self) -> Vec<LoadToken> {
        self.inner.borrow().closed.clone()
    }

    pub fn released(&self) -> Vec<ContentHandle> {
        self.inner.borrow().released.clone()
    }

    pub fn seek_count(&self) -> u64 {
        self.inner.borrow().seeks
    }

    /// Current position of an open source.
    pub fn position_of(&self, token: LoadToken) -> Option<f64> {
        let now_ns = self.clock.now_ns();
        self.inner
            .borrow()
            .sources
            .iter()
            .map(|source| source.borrow())
            .find(|source| source.token == token && !source.closed)
            .map(|source| source.position_at(now_ns))
    }
}

impl MediaBackend for SimulatedBackend {
    fn open(&mut self, clip: &ClipRecord, token: LoadToken) -> MontageResult<Box<dyn MediaSource>> {
        let mut state = self.inner.borrow_mut();
        let profile = state
            .profiles
            .get(&clip.content)
            .cloned()
            .unwrap_or_default();
        state.opened.push((clip.content.clone(), token));

        if state.unavailable {
            return Err(MontageError::playback("no media decoder available"));
        }
        if profile.failure == Some(Failure::OnOpen) {
            return Err(MontageError::decode(format!(
                "cannot open {}",
                clip.content
            )));
        }

        let metadata = match clip.kind {
            ClipKind::Video => profile.metadata_secs.or(clip.raw_duration),
            ClipKind::Image => None,
        };
        if let Some(duration_secs) = metadata.filter(|_| !profile.withhold_metadata) {
            state.events.push_back(MediaEvent::new(
                token,
                MediaEventKind::MetadataReady { duration_secs },
            ));
        }
        if profile.failure == Some(Failure::AfterOpen) {
            state.events.push_back(MediaEvent::new(
                token,
                MediaEventKind::Error {
                    message: format!("{}: stream is corrupt", clip.content),
                },
            ));
        } else {
            let (width, height) = profile.natural_size.unwrap_or(DEFAULT_NATURAL_SIZE);
            state.events.push_back(MediaEvent::new(
                token,
                MediaEventKind::SizeReady { width, height },
            ));
            state
                .events
                .push_back(MediaEvent::new(token, MediaEventKind::Ready));
        }

        let source = Rc::new(RefCell::new(SourceState {
            token,
            anchor_position: 0.0,
            anchor_ns: self.clock.now_ns(),
            playing: false,
            speed: state.speed,
            duration: metadata,
            decodable: profile.decodable_secs.or(metadata),
            ended_reported: false,
            closed: false,
        }));
        state.sources.push(source.clone());

        Ok(Box::new(SimulatedSource {
            state: source,
            backend: self.inner.clone(),
            clock: self.clock.clone(),
        }))
    }

    fn release_content(&mut self, content: &ContentHandle) {
        self.inner.borrow_mut().released.push(content.clone());
    }
}

/// A source opened by [`SimulatedBackend`].
pub struct SimulatedSource {
    state: Rc<RefCell<SourceState>>,
    backend: Rc<RefCell<BackendState>>,
    clock: Rc<dyn Clock>,
}

impl MediaSource for SimulatedSource {
    fn play(&mut self) -> MontageResult<()> {
        let now_ns = self.clock.now_ns();
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Err(MontageError::playback("source is closed"));
        }
        state.reanchor(now_ns);
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        let now_ns = self.clock.now_ns();
        let mut state = self.state.borrow_mut();
        state.reanchor(now_ns);
        state.playing = false;
    }

    fn position(&self) -> f64 {
        self.state.borrow().position_at(self.clock.now_ns())
    }

    fn seek(&mut self, secs: f64) {
        let now_ns = self.clock.now_ns();
        let mut state = self.state.borrow_mut();
        state.anchor_position = match state.decodable {
            Some(end) => secs.clamp(0.0, end),
            None => secs.max(0.0),
        };
        state.anchor_ns = now_ns;
        state.ended_reported = false;
        self.backend.borrow_mut().seeks += 1;
    }

    fn duration(&self) -> Option<f64> {
        self.state.borrow().duration
    }

    fn close(&mut self) {
        let mut state = self.state.borrow_mut();
        state.playing = false;
        state.closed = true;
        self.backend.borrow_mut().closed.push(state.token);
    }
}

/// A complete in-memory host driven by a [`ManualClock`].
#[derive(Clone)]
pub struct HeadlessRig {
    pub clock: ManualClock,
    pub surface: RecordingSurface,
    pub scheduler: ManualScheduler,
    pub backend: SimulatedBackend,
}

impl HeadlessRig {
    pub fn new(width: f64, height: f64) -> Self {
        let clock = ManualClock::new();
        Self {
            backend: SimulatedBackend::new(Rc::new(clock.clone())),
            clock,
            surface: RecordingSurface::new(width, height),
            scheduler: ManualScheduler::new(),
        }
    }

    /// Host handles sharing this rig's state.
    pub fn host(&self) -> Host {
        Host {
            clock: Box::new(self.clock.clone()),
            backend: Box::new(self.backend.clone()),
            scheduler: Box::new(self.scheduler.clone()),
            surface: Box::new(self.surface.clone()),
        }
    }

    /// Deliver media notifications until none are left. Returns how many
    /// were delivered.
    pub fn deliver_media(&self, sequencer: &mut Sequencer) -> usize {
        let mut delivered = 0;
        loop {
            let events = self.backend.take_events();
            if events.is_empty() {
                return delivered;
            }
            for event in events {
                sequencer.handle_media_event(event);
                delivered += 1;
            }
        }
    }

    /// Fire the oldest pending frame callback, if any.
    pub fn fire_frame(&self, sequencer: &mut Sequencer) -> bool {
        match self.scheduler.take_pending() {
            Some(handle) => {
                sequencer.on_frame(handle);
                true
            }
            None => false,
        }
    }

    /// Advance the clock by one frame interval and run the host callbacks
    /// that fall into it.
    pub fn step(&self, sequencer: &mut Sequencer, frame_secs: f64) {
        self.clock.advance_secs(frame_secs);
        self.deliver_media(sequencer);
        self.fire_frame(sequencer);
        self.deliver_media(sequencer);
    }

    /// Step repeatedly until `secs` of clock time have passed.
    pub fn run_for(&self, sequencer: &mut Sequencer, secs: f64, frame_secs: f64) {
        let steps = (secs / frame_secs).round() as u64;
        for _ in 0..steps {
            self.step(sequencer, frame_secs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use montage_timeline::{ClipId, ClipInput, DurationPolicy, Timeline};

    fn record(kind: ClipKind, content: &str, raw: Option<f64>) -> ClipRecord {
        let input = match kind {
            ClipKind::Video => ClipInput::video(content, content, raw.unwrap_or(10.0)),
            ClipKind::Image => ClipInput::image(content, content),
        };
        let (timeline, _) = Timeline::from_inputs(DurationPolicy::default(), vec![input]).unwrap();
        let mut clip = timeline.clips()[0].clone();
        clip.id = ClipId(7);
        clip.raw_duration = raw;
        clip
    }

    #[test]
    fn test_open_queues_metadata_size_and_ready() {
        let clock = ManualClock::new();
        let mut backend = SimulatedBackend::new(Rc::new(clock));
        let clip = record(ClipKind::Video, "v.mp4", Some(8.0));

        backend.open(&clip, LoadToken(3)).unwrap();
        let kinds: Vec<MediaEventKind> = backend.take_events().into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MediaEventKind::MetadataReady { duration_secs: 8.0 },
                MediaEventKind::SizeReady {
                    width: 1920,
                    height: 1080
                },
                MediaEventKind::Ready,
            ]
        );
    }

    #[test]
    fn test_failures() {
        let clock = ManualClock::new();
        let mut backend = SimulatedBackend::new(Rc::new(clock));
        let clip = record(ClipKind::Image, "bad.png", None);

        backend.fail_on_open("bad.png");
        assert!(backend.open(&clip, LoadToken(0)).is_err());

        backend.fail_after_open("bad.png");
        backend.open(&clip, LoadToken(1)).unwrap();
        let events = backend.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].kind, MediaEventKind::Error { .. }));
    }

    #[test]
    fn test_source_tracks_clock_and_reports_end() {
        let clock = ManualClock::new();
        let mut backend = SimulatedBackend::new(Rc::new(clock.clone()));
        backend.truncate("v.mp4", 2.0);
        let clip = record(ClipKind::Video, "v.mp4", Some(8.0));

        let mut source = backend.open(&clip, LoadToken(0)).unwrap();
        backend.take_events();
        source.play().unwrap();
        clock.advance_secs(1.5);
        assert!((source.position() - 1.5).abs() < 1e-9);
        backend.poll();
        assert!(backend.take_events().is_empty());

        clock.advance_secs(1.0);
        assert_eq!(source.position(), 2.0);
        let events = backend.take_events();
        assert_eq!(events, vec![MediaEvent::new(LoadToken(0), MediaEventKind::Ended)]);

        source.close();
        assert_eq!(backend.closed_tokens(), vec![LoadToken(0)]);
        assert!(source.play().is_err());
    }

    #[test]
    fn test_scheduler_cancel_removes_pending() {
        let mut scheduler = ManualScheduler::new();
        let first = scheduler.request_frame();
        let second = scheduler.request_frame();
        scheduler.cancel(first);
        assert_eq!(scheduler.take_pending(), Some(second));
        assert_eq!(scheduler.take_pending(), None);
        assert_eq!(scheduler.requested(), 2);
        assert_eq!(scheduler.cancelled(), 1);
    }

    #[test]
    fn test_surface_keeps_last_frame_only() {
        let mut surface = RecordingSurface::new(10.0, 10.0);
        surface.clear(Color::BLACK);
        surface.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);
        surface.clear(Color::BLACK);
        assert_eq!(surface.commands(), vec![DrawCommand::Clear(Color::BLACK)]);
        assert_eq!(surface.frames_drawn(), 2);
    }
}
