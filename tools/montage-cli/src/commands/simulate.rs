//! Play a manifest on the headless host.
//!
//! The host clock is a manual clock stepped one frame interval at a time,
//! so a run is deterministic. With `--realtime` each step waits for a
//! tokio interval tick and advances by the wall time that really passed.

use std::path::PathBuf;
use std::time::Duration;

use montage_common::clock::{ns_to_secs, Clock, MonotonicClock};
use montage_common::config::AppConfig;
use montage_playback::headless::HeadlessRig;
use montage_playback::{Sequencer, SequencerConfig, SequencerEvent};

use super::{format_secs, load_timeline};

const SURFACE_WIDTH: f64 = 1280.0;
const SURFACE_HEIGHT: f64 = 720.0;

pub struct SimulateOptions {
    pub seconds: f64,
    pub select: Option<usize>,
    pub seek: Option<f64>,
    pub realtime: bool,
    pub json: bool,
}

pub async fn run(
    manifest: PathBuf,
    options: SimulateOptions,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let (timeline, trims) = load_timeline(&manifest, &config.playback)?;
    if timeline.is_empty() {
        anyhow::bail!("Manifest {} contains no clips", manifest.display());
    }
    if !options.seconds.is_finite() || options.seconds < 0.0 {
        anyhow::bail!("--seconds must be a non-negative number");
    }

    for notice in &trims {
        tracing::info!(
            clip = %notice.clip_id,
            duration = notice.duration,
            "Requested duration capped at ingest"
        );
    }

    let rig = HeadlessRig::new(SURFACE_WIDTH, SURFACE_HEIGHT);
    let mut sequencer = Sequencer::new(
        timeline,
        SequencerConfig::from_defaults(&config.playback),
        rig.host(),
    );
    rig.deliver_media(&mut sequencer);

    if let Some(index) = options.select {
        sequencer
            .select_clip(index)
            .map_err(|e| anyhow::anyhow!("Cannot select clip: {e}"))?;
        rig.deliver_media(&mut sequencer);
    }
    if let Some(fraction) = options.seek {
        sequencer.seek(fraction);
    }

    tracing::info!(
        clips = sequencer.timeline().len(),
        total = sequencer.timeline().total_duration(),
        seconds = options.seconds,
        realtime = options.realtime,
        "Starting simulation"
    );
    sequencer.play();
    report(&rig, &mut sequencer, options.json)?;

    let frame_secs = 1.0 / config.playback.frame_rate_hz.max(1) as f64;
    if options.realtime {
        // Step the host by however much wall time actually passed per tick.
        let wall = MonotonicClock::start();
        let mut interval = tokio::time::interval(Duration::from_secs_f64(frame_secs));
        let mut last_ns = 0;
        tracing::info!(started_at = wall.epoch_wall(), "Pacing at wall-clock speed");
        while wall.now_secs() < options.seconds {
            interval.tick().await;
            let now_ns = wall.now_ns();
            rig.step(&mut sequencer, ns_to_secs(now_ns.saturating_sub(last_ns)));
            last_ns = now_ns;
            report(&rig, &mut sequencer, options.json)?;
        }
    } else {
        let steps = (options.seconds / frame_secs).ceil() as u64;
        for _ in 0..steps {
            rig.step(&mut sequencer, frame_secs);
            report(&rig, &mut sequencer, options.json)?;
        }
    }

    let index = sequencer.current_index();
    let cumulative = sequencer.cumulative_time();
    sequencer.shutdown();

    if !options.json {
        println!();
        println!("Finished at clip {index}, {}", format_secs(cumulative));
        println!("  Frames drawn: {}", rig.surface.frames_drawn());
        println!(
            "  Sources opened/closed: {}/{}",
            rig.backend.opened().len(),
            rig.backend.closed_tokens().len()
        );
        println!("  Frame callbacks: {}", rig.scheduler.requested());
    }
    Ok(())
}

fn report(rig: &HeadlessRig, sequencer: &mut Sequencer, json: bool) -> anyhow::Result<()> {
    let now = rig.clock.now_secs();
    for event in sequencer.drain_events() {
        if json {
            let mut value = serde_json::to_value(&event)?;
            if let Some(object) = value.as_object_mut() {
                object.insert("t".to_string(), serde_json::json!(now));
            }
            println!("{value}");
            continue;
        }

        let line = match &event {
            SequencerEvent::StateChanged { state } => format!("state -> {state:?}"),
            SequencerEvent::ClipChanged { index, clip_id } => {
                let name = sequencer
                    .timeline()
                    .clip(*clip_id)
                    .map(|clip| clip.name.as_str())
                    .unwrap_or("?");
                format!("clip -> [{index}] {clip_id} {name}")
            }
            SequencerEvent::Wrapped => "wrapped to first clip".to_string(),
            SequencerEvent::ClipSkipped { clip_id, reason } => {
                format!("skipped {clip_id}: {reason}")
            }
            SequencerEvent::Trimmed { notice } => format!(
                "trimmed {}: start {:.3}s, duration {:.3}s",
                notice.clip_id, notice.start_offset, notice.duration
            ),
            SequencerEvent::TimelineChanged { clips } => {
                let total: f64 = clips.iter().map(|clip| clip.effective_duration).sum();
                format!("timeline changed: {} clips, {}", clips.len(), format_secs(total))
            }
            SequencerEvent::FullscreenChanged { fullscreen } => {
                format!("fullscreen -> {fullscreen}")
            }
        };
        println!("[{}] {line}", format_secs(now));
    }
    Ok(())
}
