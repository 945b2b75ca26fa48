pub mod config;
pub mod inspect;
pub mod overlays;
pub mod simulate;

use std::path::Path;

use montage_common::config::PlaybackDefaults;
use montage_common::error::MontageError;
use montage_playback::duration_policy;
use montage_timeline::{parse_clip_inputs, Timeline, TrimNotice};

/// Load a manifest and build a timeline under the configured policy.
pub fn load_timeline(
    path: &Path,
    defaults: &PlaybackDefaults,
) -> anyhow::Result<(Timeline, Vec<TrimNotice>)> {
    defaults
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    if !path.exists() {
        return Err(MontageError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let json = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read manifest {}: {e}", path.display()))?;
    let inputs =
        parse_clip_inputs(&json).map_err(|e| anyhow::anyhow!("Failed to load manifest: {e}"))?;

    tracing::debug!(clips = inputs.len(), path = %path.display(), "Loaded manifest");
    Timeline::from_inputs(duration_policy(defaults), inputs)
        .map_err(|e| anyhow::anyhow!("Failed to build timeline: {e}"))
}

/// Format seconds as `m:ss.mmm`.
pub fn format_secs(secs: f64) -> String {
    let millis = (secs.max(0.0) * 1000.0).round() as u64;
    format!(
        "{}:{:02}.{:03}",
        millis / 60_000,
        (millis / 1000) % 60,
        millis % 1000
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(0.0), "0:00.000");
        assert_eq!(format_secs(75.25), "1:15.250");
        assert_eq!(format_secs(-3.0), "0:00.000");
    }

    #[test]
    fn test_load_timeline_missing_file() {
        let path = std::env::temp_dir().join("montage-cli-no-such-manifest.json");
        let err = load_timeline(&path, &PlaybackDefaults::default()).unwrap_err();
        assert!(err.to_string().starts_with("File not found"));
    }

    #[test]
    fn test_load_timeline_from_file() {
        let path = std::env::temp_dir().join(format!(
            "montage-cli-manifest-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"[{"name": "a.mp4", "kind": "video", "content": "a.mp4", "raw_duration": 4.0, "requested_duration": 9.0}]"#,
        )
        .unwrap();

        let (timeline, trims) = load_timeline(&path, &PlaybackDefaults::default()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(timeline.total_duration(), 4.0);
        assert_eq!(trims.len(), 1);
        assert!(load_timeline(Path::new("/nonexistent/manifest.json"), &PlaybackDefaults::default()).is_err());
    }
}
