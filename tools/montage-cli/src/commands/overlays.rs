//! Review overlays in global time.

use std::path::PathBuf;

use montage_common::config::AppConfig;
use montage_timeline::{report_by_position, OverlayPosition};

use super::{format_secs, load_timeline};

pub fn run(
    manifest: PathBuf,
    position: Option<OverlayPosition>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let (timeline, _) = load_timeline(&manifest, &config.playback)?;

    let positions: Vec<OverlayPosition> = match position {
        Some(position) => vec![position],
        None => OverlayPosition::ALL.to_vec(),
    };

    let mut conflicts = 0;
    for position in positions {
        let entries = report_by_position(timeline.clips(), position);
        println!("{position:?}:");
        if entries.is_empty() {
            println!("  (none)");
        }
        for entry in &entries {
            let marker = if entry.conflict {
                conflicts += 1;
                "  CONFLICT"
            } else {
                ""
            };
            println!(
                "  {} -> {}  {}{marker}",
                format_secs(entry.start_global),
                format_secs(entry.end_global),
                entry.texts.join(" | ")
            );
        }
    }

    if conflicts > 0 {
        println!();
        println!("{conflicts} overlapping group(s) found across clip boundaries.");
    }
    Ok(())
}
