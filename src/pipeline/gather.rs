//! Gather phase: build the trim-times multimap from section usage
//!
//! Walks the requested sequences, computes one trim window per audio
//! section, and merges windows per asset. Afterwards each gathered asset's
//! referencers are chased once: other sequences contribute their usage
//! windows too (so trimming for one sequence cannot corrupt another), and
//! any non-sequence referencer flags the asset for the external-usage
//! policy.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::config::TrimConfig;
use crate::model::{AssetId, AssetStore, Referencer, SectionId, SequenceId, TimelineModel};
use crate::timing::ticks_to_ms;
use crate::trim::{SectionsContainer, TrimTimes, TrimTimesMap, TrimTimesMultiMap};

/// Result of the gather phase.
#[derive(Debug, Default)]
pub struct GatherOutcome {
    /// Asset → trim windows → sections.
    pub multimap: TrimTimesMultiMap,
    /// Assets with at least one non-sequence referencer.
    pub external: BTreeSet<AssetId>,
}

/// Build the multimap for the requested sequences.
pub fn gather<P>(project: &P, sequences: &[SequenceId], config: &TrimConfig) -> GatherOutcome
where
    P: TimelineModel + AssetStore,
{
    let mut outcome = GatherOutcome::default();
    let requested: BTreeSet<SequenceId> = sequences.iter().copied().collect();

    for &sequence in sequences {
        gather_sequence(project, sequence, None, config, &mut outcome.multimap);
    }

    // Chase referencers of every gathered asset: merge usage from
    // sequences outside the requested set, flag external consumers.
    for asset in outcome.multimap.assets() {
        for referencer in project.referencing_objects(asset) {
            match referencer {
                Referencer::Sequence(other) if !requested.contains(&other) => {
                    debug!(
                        "Asset '{}' is also used in sequence '{}'; gathering its sections too",
                        project.asset_name(asset),
                        project.sequence_name(other)
                    );
                    gather_sequence(project, other, Some(asset), config, &mut outcome.multimap);
                }
                Referencer::Sequence(_) => {}
                Referencer::External(name) => {
                    warn!(
                        "Asset '{}' is referenced outside of sequences by '{}'; \
                         the outside-sequences policy will be applied",
                        project.asset_name(asset),
                        name
                    );
                    outcome.external.insert(asset);
                }
            }
        }
    }

    // Deterministic group order for everything downstream.
    for (_, map) in outcome.multimap.iter_mut() {
        map.sort_keys();
    }

    outcome
}

/// Scan one sequence's audio sections into the multimap. When
/// `only_asset` is set, sections playing other assets are ignored
/// (used for the cross-sequence merge).
fn gather_sequence<P>(
    project: &P,
    sequence: SequenceId,
    only_asset: Option<AssetId>,
    config: &TrimConfig,
    multimap: &mut TrimTimesMultiMap,
) where
    P: TimelineModel + AssetStore,
{
    for (asset, section) in project.list_audio_sections(sequence) {
        let Some(asset) = asset else {
            warn!(
                "Section #{} in sequence '{}' has no resolved asset; skipping",
                section.0,
                project.sequence_name(sequence)
            );
            continue;
        };
        if only_asset.is_some_and(|wanted| wanted != asset) {
            continue;
        }

        if let Some(trim_times) = compute_trim_times(project, section) {
            debug!(
                "Gathered {}",
                trim_times.describe(project.tick_rate(sequence), config.min_difference_ms)
            );
            multimap
                .find_or_add(asset)
                .insert(trim_times, section, config.min_difference_ms);
        }
    }
}

/// Compute the trim window one section actually plays: asset start offset
/// through offset + section duration, both in milliseconds.
pub fn compute_trim_times<P>(project: &P, section: SectionId) -> Option<TrimTimes>
where
    P: TimelineModel + AssetStore,
{
    let sequence = project.section_sequence(section);
    let tick_rate = project.tick_rate(sequence);
    if tick_rate <= 0 {
        warn!(
            "Sequence '{}' has an unresolved tick rate; skipping section #{}",
            project.sequence_name(sequence),
            section.0
        );
        return None;
    }

    let asset = project.section_asset(section)?;
    let total_ms = project.duration_ms(asset);
    if total_ms <= 0 {
        warn!(
            "Asset '{}' has a non-positive duration; skipping section #{}",
            project.asset_name(asset),
            section.0
        );
        return None;
    }

    let offset_ms = ticks_to_ms(project.asset_start_offset(section), tick_rate);
    let range = project.section_range(section);
    let section_duration_ms = ticks_to_ms(range.len(), tick_rate);

    Some(TrimTimes::new(
        offset_ms,
        offset_ms + section_duration_ms,
        asset,
        total_ms,
    ))
}

/// Recompute windows for sections returned by a rebuild pass and merge
/// them back into the map, restoring sorted key order.
pub fn reinsert_sections<P>(
    map: &mut TrimTimesMap,
    project: &P,
    sections: &SectionsContainer,
    config: &TrimConfig,
) where
    P: TimelineModel + AssetStore,
{
    if sections.is_empty() {
        return;
    }
    for &section in sections {
        if let Some(trim_times) = compute_trim_times(project, section) {
            map.insert(trim_times, section, config.min_difference_ms);
        }
    }
    map.sort_keys();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::project::Project;
    use crate::model::TickRange;

    fn config() -> TrimConfig {
        TrimConfig::default()
    }

    #[test]
    fn gathers_and_merges_equal_windows() {
        let mut project = Project::new();
        let wind = project.add_asset("SW_Wind", Some(40_000), None).unwrap();
        let seq = project.add_sequence("SEQ_A", 1000, TickRange::new(0, 60_000));
        // Two sections playing the same [15000, 30000) window.
        project.add_section(seq, Some(wind), TickRange::new(0, 15_000), 15_000, false);
        project.add_section(seq, Some(wind), TickRange::new(20_000, 35_000), 15_000, false);

        let outcome = gather(&project, &[seq], &config());
        assert_eq!(outcome.multimap.len(), 1);
        let map = outcome.multimap.get(wind).unwrap();
        assert_eq!(map.len(), 1);

        let (times, sections) = map.iter().next().unwrap();
        assert_eq!((times.start_ms, times.end_ms), (15_000, 30_000));
        assert_eq!(sections.len(), 2);
        assert!(outcome.external.is_empty());
    }

    #[test]
    fn gathers_distinct_windows_separately() {
        let mut project = Project::new();
        let step = project.add_asset("SW_Step", Some(30_000), None).unwrap();
        let seq = project.add_sequence("SEQ_A", 1000, TickRange::new(0, 60_000));
        project.add_section(seq, Some(step), TickRange::new(0, 3000), 7000, false);
        project.add_section(seq, Some(step), TickRange::new(10_000, 17_000), 18_000, false);

        let outcome = gather(&project, &[seq], &config());
        let map = outcome.multimap.get(step).unwrap();
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn merges_usage_from_other_sequences() {
        let mut project = Project::new();
        let wind = project.add_asset("SW_Wind", Some(40_000), None).unwrap();
        let seq_a = project.add_sequence("SEQ_A", 1000, TickRange::new(0, 60_000));
        let seq_b = project.add_sequence("SEQ_B", 1000, TickRange::new(0, 60_000));
        project.add_section(seq_a, Some(wind), TickRange::new(0, 10_000), 0, false);
        // A different window of the same asset in another sequence.
        project.add_section(seq_b, Some(wind), TickRange::new(0, 5000), 20_000, false);

        let outcome = gather(&project, &[seq_a], &config());
        let map = outcome.multimap.get(wind).unwrap();
        assert_eq!(map.len(), 2, "other sequence's window must be captured");
    }

    #[test]
    fn flags_externally_used_assets() {
        let mut project = Project::new();
        let wind = project.add_asset("SW_Wind", Some(40_000), None).unwrap();
        let seq = project.add_sequence("SEQ_A", 1000, TickRange::new(0, 60_000));
        project.add_section(seq, Some(wind), TickRange::new(0, 10_000), 0, false);
        project.add_external_reference(wind, "BP_Environment");

        let outcome = gather(&project, &[seq], &config());
        assert!(outcome.external.contains(&wind));
    }

    #[test]
    fn full_length_usage_is_still_recorded() {
        let mut project = Project::new();
        let tone = project.add_asset("SW_Tone", Some(10_000), None).unwrap();
        let seq = project.add_sequence("SEQ_A", 1000, TickRange::new(0, 60_000));
        project.add_section(seq, Some(tone), TickRange::new(0, 10_000), 0, false);

        // Whether trimming is worthwhile is decided later, not here.
        let outcome = gather(&project, &[seq], &config());
        assert_eq!(outcome.multimap.len(), 1);
    }
}
