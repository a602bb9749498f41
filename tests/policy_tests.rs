//! Full pipeline runs exercising the non-default policy choices.

mod helpers;

use helpers::{run_pipeline, SilenceTranscoder};
use seqtrim::config::{
    LoopingSoundsPolicy, OutsideSequencesPolicy, SegmentsReusePolicy, TrimConfig,
};
use seqtrim::model::project::Project;
use seqtrim::model::{AssetStore, TickRange, TimelineModel};

#[test]
fn clipping_to_playback_range_shifts_the_window() {
    let mut project = Project::new();
    let wind = project.add_asset("SW_Wind", Some(40_000), None).unwrap();
    let seq = project.add_sequence("SEQ_Main", 1000, TickRange::new(1000, 9000));
    let section = project.add_section(seq, Some(wind), TickRange::new(500, 9500), 0, false);

    let mut transcoder = SilenceTranscoder::new();
    run_pipeline(&mut project, &mut transcoder, TrimConfig::default());

    // Section clipped to [1000, 9000); the window slides to [500, 8500).
    assert_eq!(project.section_range(section), TickRange::new(1000, 9000));
    assert_eq!(project.duration_ms(wind), 8000);
    assert_eq!(project.asset_start_offset(section), 0);
}

#[test]
fn oversized_offset_is_folded_before_trimming() {
    let mut project = Project::new();
    let hum = project.add_asset("SW_Hum", Some(5000), None).unwrap();
    let seq = project.add_sequence("SEQ_Main", 1000, TickRange::new(0, 60_000));
    let section = project.add_section(seq, Some(hum), TickRange::new(0, 2000), 12_000, false);

    let mut transcoder = SilenceTranscoder::new();
    run_pipeline(&mut project, &mut transcoder, TrimConfig::default());

    // 12000 mod 5000 = 2000, so the window is [2000, 4000).
    assert_eq!(project.duration_ms(hum), 2000);
    assert_eq!(project.asset_start_offset(section), 0);
}

#[test]
fn looping_skip_all_touches_nothing() {
    let mut project = Project::new();
    let hum = project.add_asset("SW_Hum", Some(10_000), None).unwrap();
    let seq = project.add_sequence("SEQ_Main", 1000, TickRange::new(0, 60_000));
    let looped = project.add_section(seq, Some(hum), TickRange::new(0, 25_000), 0, true);
    let plain = project.add_section(seq, Some(hum), TickRange::new(30_000, 35_000), 2000, false);

    let config = TrimConfig {
        policy_looping_sounds: LoopingSoundsPolicy::SkipAll,
        ..TrimConfig::default()
    };
    let mut transcoder = SilenceTranscoder::new();
    let report = run_pipeline(&mut project, &mut transcoder, config);

    assert_eq!(report.groups_trimmed, 0);
    assert_eq!(transcoder.exports, 0);
    assert_eq!(project.duration_ms(hum), 10_000);
    assert_eq!(project.asset_count(), 1);
    assert_eq!(project.asset_start_offset(plain), 2000);
    assert!(project.section_looping(looped));
}

#[test]
fn looping_split_sections_trims_the_tail() {
    let mut project = Project::new();
    let hum = project.add_asset("SW_Hum", Some(10_000), None).unwrap();
    let seq = project.add_sequence("SEQ_Main", 1000, TickRange::new(0, 60_000));
    // Two and a half passes through the asset.
    project.add_section(seq, Some(hum), TickRange::new(0, 25_000), 0, true);

    let config = TrimConfig {
        policy_looping_sounds: LoopingSoundsPolicy::SplitSections,
        ..TrimConfig::default()
    };
    let mut transcoder = SilenceTranscoder::new();
    let report = run_pipeline(&mut project, &mut transcoder, config);

    // Three pieces; the two full passes keep the untouched original, the
    // 5-second tail plays a trimmed duplicate.
    let sections = project.live_sections(seq);
    assert_eq!(sections.len(), 3);
    for &section in &sections {
        assert!(!project.section_looping(section));
    }

    assert_eq!(project.duration_ms(hum), 10_000);
    let dup = project.asset_by_name("SW_Hum1").expect("tail duplicate");
    assert_eq!(project.duration_ms(dup), 5000);

    let tail = sections
        .iter()
        .find(|&&s| project.section_asset(s) == Some(dup))
        .expect("one piece plays the duplicate");
    assert_eq!(project.section_range(*tail), TickRange::new(20_000, 25_000));
    assert_eq!(project.asset_start_offset(*tail), 0);

    assert_eq!(report.groups_trimmed, 1);
    assert_eq!(report.groups_skipped, 1, "full passes need no trim");
    assert_eq!(report.duplicates_created, 1);
}

#[test]
fn outside_skip_all_touches_nothing() {
    let mut project = Project::new();
    let bird = project.add_asset("SW_Bird", Some(20_000), None).unwrap();
    project.add_external_reference(bird, "BP_Forest");
    let seq = project.add_sequence("SEQ_Main", 1000, TickRange::new(0, 60_000));
    project.add_section(seq, Some(bird), TickRange::new(0, 8000), 4000, false);

    let config = TrimConfig {
        policy_sounds_outside_sequences: OutsideSequencesPolicy::SkipAll,
        ..TrimConfig::default()
    };
    let mut transcoder = SilenceTranscoder::new();
    let report = run_pipeline(&mut project, &mut transcoder, config);

    assert_eq!(report.groups_trimmed, 0);
    assert_eq!(project.duration_ms(bird), 20_000);
    assert_eq!(project.asset_count(), 1);
}

#[test]
fn split_to_smaller_dedupes_overlapping_windows() {
    let mut project = Project::new();
    let voice = project.add_asset("SW_Voice", Some(60_000), None).unwrap();
    let seq = project.add_sequence("SEQ_Main", 1000, TickRange::new(0, 60_000));
    // Windows [0,5000), [0,1000), [4000,5000): the wide one fully
    // overlaps the two narrow ones.
    project.add_section(seq, Some(voice), TickRange::new(10_000, 15_000), 0, false);
    project.add_section(seq, Some(voice), TickRange::new(0, 1000), 0, false);
    project.add_section(seq, Some(voice), TickRange::new(20_000, 21_000), 4000, false);

    let config = TrimConfig {
        policy_segments_reuse: SegmentsReusePolicy::SplitToSmaller,
        ..TrimConfig::default()
    };
    let mut transcoder = SilenceTranscoder::new();
    let report = run_pipeline(&mut project, &mut transcoder, config);

    // The wide section became three pieces sharing segments with the
    // narrow sections: every stored byte is played by someone.
    assert_eq!(project.live_sections(seq).len(), 5);
    assert_eq!(report.groups_trimmed, 3);
    assert_eq!(report.duplicates_created, 2);

    let seg_a = project.asset_by_name("SW_Voice1").unwrap();
    let seg_b = project.asset_by_name("SW_Voice2").unwrap();
    assert_eq!(project.duration_ms(seg_a), 1000);
    assert_eq!(project.duration_ms(seg_b), 3000);
    // Original keeps the last segment.
    assert_eq!(project.duration_ms(voice), 1000);
    assert_eq!(transcoder.exports, 3, "one transcode per segment");
}

#[test]
fn keep_original_trims_overlapping_windows_independently() {
    let mut project = Project::new();
    let voice = project.add_asset("SW_Voice", Some(60_000), None).unwrap();
    let seq = project.add_sequence("SEQ_Main", 1000, TickRange::new(0, 60_000));
    project.add_section(seq, Some(voice), TickRange::new(10_000, 15_000), 0, false);
    project.add_section(seq, Some(voice), TickRange::new(0, 1000), 0, false);

    let mut transcoder = SilenceTranscoder::new();
    let report = run_pipeline(&mut project, &mut transcoder, TrimConfig::default());

    // Two distinct windows, no fragmentation: the overlap is stored twice.
    assert_eq!(project.live_sections(seq).len(), 2);
    assert_eq!(report.groups_trimmed, 2);
    assert_eq!(report.duplicates_created, 1);
    assert_eq!(project.duration_ms(voice), 5000);
    assert_eq!(
        project.duration_ms(project.asset_by_name("SW_Voice1").unwrap()),
        1000
    );
}
