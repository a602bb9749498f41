//! Policy phase: reconcile gathered windows with configured policies
//!
//! Five passes run in a fixed order over the multimap, each narrowing or
//! reshaping what the executor will be allowed to trim:
//!
//! 1. clip sections to their sequence's playback range
//! 2. normalize start offsets that exceed the asset duration
//! 3. looping sounds policy
//! 4. outside-sequences (external usage) policy
//! 5. segments reuse policy
//!
//! Passes that move sections between windows use the rebuild protocol on
//! [`TrimTimesMap`] and re-insert the recomputed windows afterwards.

use tracing::{debug, error, info, warn};

use crate::config::{LoopingSoundsPolicy, OutsideSequencesPolicy, SegmentsReusePolicy, TrimConfig};
use crate::model::{AssetId, AssetStore, SectionId, TickRange, TimelineModel};
use crate::pipeline::gather::{reinsert_sections, GatherOutcome};
use crate::timing::{ms_to_ticks, ticks_to_ms};
use crate::trim::{TrimTimesMap, TrimTimesMultiMap};
use crate::Result;

/// Run all policy passes in order.
pub fn resolve<P>(project: &mut P, outcome: &mut GatherOutcome, config: &TrimConfig)
where
    P: TimelineModel + AssetStore,
{
    clip_to_playback_range(project, &mut outcome.multimap, config);
    normalize_large_offsets(project, &mut outcome.multimap, config);
    apply_looping_policy(project, &mut outcome.multimap, config);
    apply_outside_policy(project, outcome, config);
    apply_segments_policy(project, &mut outcome.multimap, config);
}

/// Pass 1: shrink sections that poke outside their sequence's playback
/// range. A start-side clip advances the asset start offset by the same
/// amount so the audible content is unchanged.
fn clip_to_playback_range<P>(project: &mut P, multimap: &mut TrimTimesMultiMap, config: &TrimConfig)
where
    P: TimelineModel + AssetStore,
{
    for (_, map) in multimap.iter_mut() {
        let moved = map.rebuild_with(|section, _, out| {
            let sequence = project.section_sequence(section);
            let playback = project.playback_range(sequence);
            let range = project.section_range(section);

            let new_start = range.start.max(playback.start);
            let new_end = range.end.min(playback.end);
            if new_start == range.start && new_end == range.end {
                return;
            }
            if new_end <= new_start {
                warn!(
                    "Section #{} lies entirely outside the playback range of '{}'; leaving it alone",
                    section.0,
                    project.sequence_name(sequence)
                );
                return;
            }

            if new_start > range.start {
                let advance = new_start - range.start;
                let offset = project.asset_start_offset(section) + advance;
                project.set_asset_start_offset(section, offset);
            }
            project.set_section_range(section, TickRange::new(new_start, new_end));
            debug!(
                "Clipped section #{} to playback range [{new_start}, {new_end})",
                section.0
            );
            out.add(section);
        });
        reinsert_sections(map, project, &moved, config);
    }
}

/// Pass 2: fold start offsets at or past the end of the asset back into
/// `[0, duration)`. Such offsets only occur on sounds that were looping
/// at author time; the audible position is offset modulo duration.
fn normalize_large_offsets<P>(project: &mut P, multimap: &mut TrimTimesMultiMap, config: &TrimConfig)
where
    P: TimelineModel + AssetStore,
{
    for (_, map) in multimap.iter_mut() {
        let moved = map.rebuild_with(|section, times, out| {
            let total_ms = times.total_ms;
            if total_ms <= 0 {
                return;
            }
            let sequence = project.section_sequence(section);
            let tick_rate = project.tick_rate(sequence);
            let offset_ms = ticks_to_ms(project.asset_start_offset(section), tick_rate);
            if offset_ms < total_ms {
                return;
            }

            let normalized_ms = offset_ms % total_ms;
            project.set_asset_start_offset(section, ms_to_ticks(normalized_ms, tick_rate));
            debug!(
                "Normalized start offset of section #{}: {offset_ms} ms -> {normalized_ms} ms",
                section.0
            );
            out.add(section);
        });
        reinsert_sections(map, project, &moved, config);
    }
}

/// Pass 3: looping sounds policy. A window is looping when it runs past
/// the asset's end by at least the tolerance.
fn apply_looping_policy<P>(project: &mut P, multimap: &mut TrimTimesMultiMap, config: &TrimConfig)
where
    P: TimelineModel + AssetStore,
{
    let tolerance = config.min_difference_ms;
    let looping = multimap.assets_matching(|times, _| times.is_looping(tolerance));
    if looping.is_empty() {
        return;
    }

    match config.policy_looping_sounds {
        LoopingSoundsPolicy::SkipAll => {
            info!(
                "Looping sounds policy is skip_all: leaving {} asset(s) untouched",
                looping.len()
            );
            multimap.remove_many(&looping);
        }
        LoopingSoundsPolicy::SkipAndDuplicate => {
            for asset in looping {
                let Some(map) = multimap.remove(asset) else {
                    continue;
                };
                rehome_non_looping_groups(project, multimap, asset, map, config);
            }
        }
        LoopingSoundsPolicy::SplitSections => {
            for asset in looping {
                let Some(map) = multimap.get_mut(asset) else {
                    continue;
                };
                let moved = map.rebuild_with(|section, times, out| {
                    if !times.is_looping(tolerance) {
                        return;
                    }
                    match split_looping_section(project, section, times.total_ms) {
                        Ok(pieces) => {
                            out.add(section);
                            for piece in pieces {
                                out.add(piece);
                            }
                        }
                        Err(e) => {
                            error!("Could not split looping section #{}: {e}", section.0);
                        }
                    }
                });
                reinsert_sections(map, project, &moved, config);
            }
        }
    }
}

/// Move every non-looping group of `map` onto a duplicate of `asset`.
/// The physical original stays untouched, so its looping playback keeps
/// working; the original key is dropped from the multimap either way.
fn rehome_non_looping_groups<P>(
    project: &mut P,
    multimap: &mut TrimTimesMultiMap,
    asset: AssetId,
    mut map: TrimTimesMap,
    config: &TrimConfig,
) where
    P: TimelineModel + AssetStore,
{
    let tolerance = config.min_difference_ms;
    let mut duplicate: Option<AssetId> = None;

    for (mut times, sections) in map.drain() {
        if times.is_looping(tolerance) {
            debug!(
                "Asset '{}': looping window {times} stays on the original",
                project.asset_name(asset)
            );
            continue;
        }

        let target = *duplicate.get_or_insert_with(|| {
            let dup = project.duplicate(asset, 1);
            info!(
                "Asset '{}' loops elsewhere; non-looping usage moved to duplicate '{}'",
                project.asset_name(asset),
                project.asset_name(dup)
            );
            dup
        });

        for &section in &sections {
            project.set_asset(section, target);
        }
        times.asset = Some(target);
        multimap
            .find_or_add(target)
            .insert_group(times, sections, tolerance);
    }
}

/// Split one looping section at every point where playback wraps back to
/// the asset's start. Returns the newly created right-hand pieces; the
/// original section becomes the first piece. All pieces end up
/// non-looping, later pieces play from offset zero.
fn split_looping_section<P>(
    project: &mut P,
    section: SectionId,
    total_ms: i64,
) -> Result<Vec<SectionId>>
where
    P: TimelineModel + AssetStore,
{
    let sequence = project.section_sequence(section);
    let tick_rate = project.tick_rate(sequence);
    let range = project.section_range(section);
    let offset_ms = ticks_to_ms(project.asset_start_offset(section), tick_rate);
    let section_ms = ticks_to_ms(range.len(), tick_rate);

    // Wrap points in ms relative to the section start: the first after
    // the remainder of the asset plays out, then one per full pass.
    let mut cuts_ms = Vec::new();
    let mut cut = total_ms - offset_ms;
    while cut < section_ms {
        cuts_ms.push(cut);
        cut += total_ms;
    }

    let mut pieces = Vec::with_capacity(cuts_ms.len());
    let mut current = section;
    for cut_ms in cuts_ms {
        let at = range.start + ms_to_ticks(cut_ms, tick_rate);
        let right = project.split_section(current, at)?;
        project.set_looping(current, false);
        project.set_asset_start_offset(right, 0);
        pieces.push(right);
        current = right;
    }
    project.set_looping(current, false);

    debug!(
        "Split looping section #{} into {} piece(s)",
        section.0,
        pieces.len() + 1
    );
    Ok(pieces)
}

/// Pass 4: outside-sequences policy for assets flagged during gather.
fn apply_outside_policy<P>(project: &mut P, outcome: &mut GatherOutcome, config: &TrimConfig)
where
    P: TimelineModel + AssetStore,
{
    let flagged: Vec<AssetId> = outcome
        .external
        .iter()
        .copied()
        .filter(|asset| outcome.multimap.get(*asset).is_some())
        .collect();
    if flagged.is_empty() {
        return;
    }

    match config.policy_sounds_outside_sequences {
        OutsideSequencesPolicy::SkipAll => {
            info!(
                "Outside-sequences policy is skip_all: leaving {} asset(s) untouched",
                flagged.len()
            );
            outcome.multimap.remove_many(&flagged);
        }
        OutsideSequencesPolicy::SkipAndDuplicate => {
            for asset in flagged {
                let Some(mut map) = outcome.multimap.remove(asset) else {
                    continue;
                };
                let dup = project.duplicate(asset, 1);
                info!(
                    "Asset '{}' is used outside sequences; sequence usage moved to duplicate '{}'",
                    project.asset_name(asset),
                    project.asset_name(dup)
                );
                for (times, sections) in map.iter_mut() {
                    times.asset = Some(dup);
                    for &section in &*sections {
                        project.set_asset(section, dup);
                    }
                }
                outcome.multimap.insert_map(dup, map);
            }
        }
    }
}

/// Pass 5: segments reuse policy. Under `split_to_smaller`, overlapping
/// windows of an asset are fragmented into the minimal set of
/// non-overlapping segments so every byte of trimmed audio is used by at
/// least one section.
fn apply_segments_policy<P>(project: &mut P, multimap: &mut TrimTimesMultiMap, config: &TrimConfig)
where
    P: TimelineModel + AssetStore,
{
    if config.policy_segments_reuse == SegmentsReusePolicy::KeepOriginal {
        return;
    }
    let tolerance = config.min_difference_ms;

    for (asset, map) in multimap.iter_mut() {
        if map.len() < 2 {
            continue;
        }

        let segments = minimal_segments(map, tolerance);
        let moved = map.rebuild_with(|section, times, out| {
            let covering: Vec<(i64, i64)> = segments
                .iter()
                .copied()
                .filter(|&(seg_start, seg_end)| {
                    seg_start < times.end_ms && seg_end > times.start_ms
                })
                .collect();
            if covering.len() <= 1 {
                return;
            }

            let sequence = project.section_sequence(section);
            let tick_rate = project.tick_rate(sequence);
            let range = project.section_range(section);
            let offset_ms = ticks_to_ms(project.asset_start_offset(section), tick_rate);

            debug!(
                "Fragmenting section #{} of '{}' into {} segment(s)",
                section.0,
                project.asset_name(*asset),
                covering.len()
            );
            for (seg_start, seg_end) in covering {
                let piece = project.duplicate_section(section);
                let piece_range = TickRange::new(
                    range.start + ms_to_ticks(seg_start - offset_ms, tick_rate),
                    range.start + ms_to_ticks(seg_end - offset_ms, tick_rate),
                );
                project.set_section_range(piece, piece_range);
                project.set_asset_start_offset(piece, ms_to_ticks(seg_start, tick_rate));
                out.add(piece);
            }
            project.remove_section(section);
        });
        reinsert_sections(map, project, &moved, config);
    }
}

/// Minimal non-overlapping segments covering the map's windows: cut at
/// every distinct endpoint, drop slivers shorter than the tolerance.
fn minimal_segments(map: &TrimTimesMap, tolerance_ms: i64) -> Vec<(i64, i64)> {
    let mut points: Vec<i64> = map
        .iter()
        .flat_map(|(times, _)| [times.start_ms, times.end_ms])
        .collect();
    points.sort_unstable();
    points.dedup();

    points
        .windows(2)
        .filter(|pair| pair[1] - pair[0] >= tolerance_ms)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}
