//! Show clip timing for a manifest.

use std::path::PathBuf;

use montage_common::config::AppConfig;
use montage_timeline::ClipKind;

use super::{format_secs, load_timeline};

pub fn run(manifest: PathBuf, at: Option<f64>, config: &AppConfig) -> anyhow::Result<()> {
    let (timeline, trims) = load_timeline(&manifest, &config.playback)?;

    if let Some(secs) = at {
        let index = timeline
            .index_at(secs)
            .ok_or_else(|| anyhow::anyhow!("{secs}s is outside the sequence"))?;
        let clip = &timeline.clips()[index];
        println!(
            "{} is in clip [{index}] {} {:?} at {}",
            format_secs(secs),
            clip.id,
            clip.name,
            format_secs(clip.to_local(secs))
        );
        return Ok(());
    }

    println!("Manifest: {}", manifest.display());
    println!("  Clips: {}", timeline.len());
    println!("  Total: {}", format_secs(timeline.total_duration()));
    println!();

    println!("Clips:");
    for (index, clip) in timeline.clips().iter().enumerate() {
        let kind = match clip.kind {
            ClipKind::Video => "video",
            ClipKind::Image => "image",
        };
        println!(
            "  [{index}] {} {kind} {:?}  {} -> {}  ({:.3}s)",
            clip.id,
            clip.name,
            format_secs(clip.start_time_global),
            format_secs(clip.end_time_global),
            clip.effective_duration
        );
        if let Some(raw) = clip.raw_duration {
            println!("      source: {raw:.3}s, in-point {:.3}s", clip.trim_start);
        }
        if let Some(requested) = clip.requested_duration {
            println!("      requested: {requested:.3}s");
        }
        if !clip.overlays.is_empty() {
            println!("      overlays: {}", clip.overlays.len());
        }
    }

    if !trims.is_empty() {
        println!();
        println!("Trims applied:");
        for trim in &trims {
            println!(
                "  {}: start {:.3}s, duration {:.3}s",
                trim.clip_id, trim.start_offset, trim.duration
            );
        }
    }

    Ok(())
}
