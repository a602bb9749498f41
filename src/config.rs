//! Trimming configuration and conflict-resolution policies
//!
//! `TrimConfig` is constructed once at the entry point and passed by
//! reference through every phase of the pipeline; there is no global
//! settings state. The config can be loaded from a TOML file or built
//! from defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Policy for audio sections that loop, i.e. a sound repeats playing from
/// its start because the section outlives the asset duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopingSoundsPolicy {
    /// Abandon the asset entirely: no usage of it is trimmed, looping or not.
    SkipAll,

    /// Keep the looping usage on the untouched original; duplicate the asset
    /// once and move every non-looping usage onto the duplicate so it can be
    /// trimmed safely.
    SkipAndDuplicate,

    /// Split a looping section into consecutive non-looping sub-sections,
    /// each covering at most one full play-through of the asset.
    SplitSections,
}

impl Default for LoopingSoundsPolicy {
    fn default() -> Self {
        Self::SkipAndDuplicate
    }
}

/// Policy for assets that are also referenced outside of any sequence
/// (for example by gameplay scripts or ambient world objects).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutsideSequencesPolicy {
    /// Abandon the asset entirely; the external consumer keeps it as-is.
    SkipAll,

    /// Duplicate the asset and trim the duplicate; the original stays
    /// untouched for its external consumers.
    SkipAndDuplicate,
}

impl Default for OutsideSequencesPolicy {
    fn default() -> Self {
        Self::SkipAndDuplicate
    }
}

/// Policy for assets that still have more than one distinct trim window
/// after all other passes have run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferentTrimTimesPolicy {
    /// Abandon the whole asset rather than pick a window.
    SkipAll,

    /// Trim the original in place for the last window; every earlier window
    /// gets its own index-suffixed duplicate.
    ReimportOneAndDuplicateOthers,
}

impl Default for DifferentTrimTimesPolicy {
    fn default() -> Self {
        Self::ReimportOneAndDuplicateOthers
    }
}

/// Policy for partially-overlapping trim windows on the same asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentsReusePolicy {
    /// Leave windows as gathered.
    KeepOriginal,

    /// Fragment overlapping windows into minimal non-overlapping segments so
    /// physically identical sub-ranges are stored once.
    SplitToSmaller,
}

impl Default for SegmentsReusePolicy {
    fn default() -> Self {
        Self::KeepOriginal
    }
}

/// Immutable configuration for a trimming run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// Tolerance in milliseconds: windows whose endpoints differ by at most
    /// this value are considered equal, and trims that would save less than
    /// this are skipped.
    pub min_difference_ms: i64,

    /// Policy for looping sections.
    pub policy_looping_sounds: LoopingSoundsPolicy,

    /// Policy for assets referenced outside of sequences.
    pub policy_sounds_outside_sequences: OutsideSequencesPolicy,

    /// Policy for assets with several distinct trim windows.
    pub policy_different_trim_times: DifferentTrimTimesPolicy,

    /// Policy for partially-overlapping windows.
    pub policy_segments_reuse: SegmentsReusePolicy,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            min_difference_ms: 200,
            policy_looping_sounds: LoopingSoundsPolicy::default(),
            policy_sounds_outside_sequences: OutsideSequencesPolicy::default(),
            policy_different_trim_times: DifferentTrimTimesPolicy::default(),
            policy_segments_reuse: SegmentsReusePolicy::default(),
        }
    }
}

impl TrimConfig {
    /// Load configuration from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TrimConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configured values.
    pub fn validate(&self) -> Result<()> {
        if self.min_difference_ms <= 0 {
            return Err(Error::Config(format!(
                "min_difference_ms must be positive, got {}",
                self.min_difference_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TrimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_difference_ms, 200);
    }

    #[test]
    fn zero_tolerance_rejected() {
        let config = TrimConfig {
            min_difference_ms: 0,
            ..TrimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_policy_names_from_toml() {
        let config: TrimConfig = toml::from_str(
            r#"
            min_difference_ms = 150
            policy_looping_sounds = "split_sections"
            policy_sounds_outside_sequences = "skip_all"
            policy_different_trim_times = "reimport_one_and_duplicate_others"
            policy_segments_reuse = "split_to_smaller"
            "#,
        )
        .unwrap();

        assert_eq!(config.min_difference_ms, 150);
        assert_eq!(
            config.policy_looping_sounds,
            LoopingSoundsPolicy::SplitSections
        );
        assert_eq!(
            config.policy_sounds_outside_sequences,
            OutsideSequencesPolicy::SkipAll
        );
        assert_eq!(
            config.policy_different_trim_times,
            DifferentTrimTimesPolicy::ReimportOneAndDuplicateOthers
        );
        assert_eq!(
            config.policy_segments_reuse,
            SegmentsReusePolicy::SplitToSmaller
        );
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: TrimConfig = toml::from_str("min_difference_ms = 300").unwrap();
        assert_eq!(config.min_difference_ms, 300);
        assert_eq!(
            config.policy_looping_sounds,
            LoopingSoundsPolicy::SkipAndDuplicate
        );
        assert_eq!(
            config.policy_segments_reuse,
            SegmentsReusePolicy::KeepOriginal
        );
    }
}
