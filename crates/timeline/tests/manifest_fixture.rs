use std::path::PathBuf;

use montage_timeline::{
    parse_clip_inputs, report_by_position, ClipId, ClipInput, DurationPolicy, OverlayPosition,
    Timeline, TrimNotice,
};

fn load_fixture_inputs() -> Vec<ClipInput> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("demo-manifest.json");

    let content = std::fs::read_to_string(path).expect("fixture manifest should be readable");
    parse_clip_inputs(&content).expect("fixture manifest should parse")
}

#[test]
fn demo_manifest_bounds_are_stable() {
    let (timeline, trims) =
        Timeline::from_inputs(DurationPolicy::default(), load_fixture_inputs()).unwrap();

    let durations: Vec<f64> = timeline
        .clips()
        .iter()
        .map(|clip| clip.effective_duration)
        .collect();
    // Credits ask for 2s but images never go below 5s.
    assert_eq!(durations, vec![5.0, 10.0, 8.0, 5.0, 6.0]);

    let starts: Vec<f64> = timeline
        .clips()
        .iter()
        .map(|clip| clip.start_time_global)
        .collect();
    assert_eq!(starts, vec![0.0, 5.0, 15.0, 23.0, 28.0]);
    assert_eq!(timeline.total_duration(), 34.0);

    assert_eq!(timeline.clips()[2].trim_start, 12.0);
    assert_eq!(
        trims,
        vec![TrimNotice {
            clip_id: ClipId(4),
            start_offset: 0.0,
            duration: 6.0
        }]
    );
}

#[test]
fn demo_manifest_overlays_touch_without_conflict() {
    let (timeline, _) =
        Timeline::from_inputs(DurationPolicy::default(), load_fixture_inputs()).unwrap();

    let bottom_left = report_by_position(timeline.clips(), OverlayPosition::BottomLeft);
    assert_eq!(bottom_left.len(), 2);
    assert!(bottom_left.iter().all(|entry| !entry.conflict));
    assert_eq!(bottom_left[1].start_global, 9.0);

    let center = report_by_position(timeline.clips(), OverlayPosition::Center);
    assert_eq!(center.len(), 2);
    assert_eq!(center[1].start_global, 23.0);
}

#[test]
fn demo_manifest_reorder_keeps_total() {
    let (mut timeline, _) =
        Timeline::from_inputs(DurationPolicy::default(), load_fixture_inputs()).unwrap();

    timeline.reorder(4, 0).unwrap();
    assert_eq!(timeline.clips()[0].name, "bonus.mp4");
    assert_eq!(timeline.clips()[1].start_time_global, 6.0);
    assert_eq!(timeline.total_duration(), 34.0);
}
