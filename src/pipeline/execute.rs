//! Execute phase: physical trimming and timeline rewiring
//!
//! Walks the resolved multimap asset by asset, group by group. Each group
//! is exported, trimmed, and reimported exactly once no matter how many
//! sections share it; every section of the group is then reset to play
//! the trimmed asset from offset zero. Scratch files are removed on every
//! exit path, including failures.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::{DifferentTrimTimesPolicy, TrimConfig};
use crate::model::{AssetId, AssetStore, AudioTranscoder, SectionId, TimelineModel};
use crate::trim::{SectionsContainer, TrimTimes, TrimTimesMultiMap};
use crate::Result;

/// Counters summarizing one pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub sequences: usize,
    pub assets_considered: usize,
    pub groups_trimmed: usize,
    pub duplicates_created: usize,
    pub groups_skipped: usize,
    pub groups_failed: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sequence(s), {} asset(s) considered, {} group(s) trimmed, \
             {} duplicate(s) created, {} group(s) skipped, {} group(s) failed",
            self.sequences,
            self.assets_considered,
            self.groups_trimmed,
            self.duplicates_created,
            self.groups_skipped,
            self.groups_failed
        )
    }
}

/// Trim every group in the multimap and rewire its sections.
pub fn execute<P, X>(
    project: &mut P,
    transcoder: &mut X,
    multimap: &TrimTimesMultiMap,
    config: &TrimConfig,
    report: &mut RunReport,
) where
    P: TimelineModel + AssetStore,
    X: AudioTranscoder,
{
    let tolerance = config.min_difference_ms;

    for (asset, map) in multimap.iter() {
        report.assets_considered += 1;
        let group_count = map.len();

        if group_count > 1
            && config.policy_different_trim_times == DifferentTrimTimesPolicy::SkipAll
        {
            warn!(
                "Asset '{}' is used with {} different trim windows; skipped by policy",
                project.asset_name(*asset),
                group_count
            );
            report.groups_skipped += group_count;
            continue;
        }

        let mut skipped_any = false;
        let mut duplicates = 0u32;
        for (index, (times, sections)) in map.iter().enumerate() {
            if !times.is_valid_length(tolerance) {
                warn!(
                    "Skipping {times} of '{}': usage shorter than the minimal difference",
                    project.asset_name(*asset)
                );
                report.groups_skipped += 1;
                skipped_any = true;
                continue;
            }
            if times.is_trimmed(tolerance) {
                debug!(
                    "Skipping {times} of '{}': already covers the whole asset",
                    project.asset_name(*asset)
                );
                report.groups_skipped += 1;
                skipped_any = true;
                continue;
            }

            // Trimming the original in place is only safe for the last
            // group, and only when no skipped group's sections still play
            // the untouched original; every other group is rehomed onto a
            // fresh duplicate.
            let target = if index + 1 == group_count && !skipped_any {
                *asset
            } else {
                duplicates += 1;
                let duplicate = project.duplicate(*asset, duplicates);
                report.duplicates_created += 1;
                duplicate
            };

            match trim_group(project, transcoder, target, times, sections) {
                Ok(()) => report.groups_trimmed += 1,
                Err(e) => {
                    warn!(
                        "Trimming {times} of '{}' failed: {e}; group left untouched",
                        project.asset_name(target)
                    );
                    report.groups_failed += 1;
                }
            }
        }
    }
}

/// Export, trim, and reimport `target` once, then reset every section of
/// the group to play it plainly. Scratch files are removed by the
/// [`TempFiles`] guard even when an early `?` bails out.
fn trim_group<P, X>(
    project: &mut P,
    transcoder: &mut X,
    target: AssetId,
    times: &TrimTimes,
    sections: &SectionsContainer,
) -> Result<()>
where
    P: TimelineModel + AssetStore,
    X: AudioTranscoder,
{
    let mut temp_files = TempFiles::default();
    let mut trimmed = false;

    for &section in sections {
        if trimmed {
            reset_section(project, section, target);
            continue;
        }

        let desc = project.describe(target);
        let exported = temp_files.track(transcoder.export(&desc)?);
        let output = temp_files.track(trimmed_output_path(&exported));
        transcoder.trim(&exported, &output, times.start_ms, times.end_ms)?;
        project.reimport(target, &output)?;

        reset_section(project, section, target);
        trimmed = true;
        debug!(
            "Trimmed '{}' to {times} ({} section(s) share it)",
            project.asset_name(target),
            sections.len()
        );
    }

    Ok(())
}

/// Point the section at the trimmed asset: offset zero, looping off.
fn reset_section<P>(project: &mut P, section: SectionId, target: AssetId)
where
    P: TimelineModel + AssetStore,
{
    project.set_asset(section, target);
    project.set_asset_start_offset(section, 0);
    project.set_looping(section, false);
}

fn trimmed_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trimmed".to_string());
    input.with_file_name(format!("{stem}_trimmed.wav"))
}

/// Tracks scratch files and deletes them when dropped.
#[derive(Default)]
struct TempFiles {
    paths: Vec<PathBuf>,
}

impl TempFiles {
    fn track(&mut self, path: PathBuf) -> PathBuf {
        self.paths.push(path.clone());
        path
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            if !path.exists() {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed scratch file {}", path.display()),
                Err(e) => warn!("Could not remove scratch file {}: {e}", path.display()),
            }
        }
    }
}
