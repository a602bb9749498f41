//! Collaborator interfaces for the trimming pipeline
//!
//! The core algorithm only reads and writes timelines, assets, and
//! waveform files through the three traits defined here:
//!
//! - [`TimelineModel`]: the sequence/track/section data model
//! - [`AssetStore`]: asset registry (durations, duplication, references)
//! - [`AudioTranscoder`]: physical waveform export and trimming
//!
//! [`project::Project`] implements the first two over an in-memory,
//! TOML-described content project; [`ffmpeg::FfmpegTranscoder`] implements
//! the third by shelling out to ffmpeg.

pub mod ffmpeg;
pub mod project;

use std::path::{Path, PathBuf};

use crate::Result;

/// Identifies an audio asset within the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(pub u32);

/// Identifies a sequence within the timeline model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceId(pub u32);

/// Identifies an audio section placed on a sequence track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectionId(pub u32);

/// Half-open tick range `[start, end)` on a sequence timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickRange {
    pub start: i64,
    pub end: i64,
}

impl TickRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True if `tick` lies strictly inside the range (not on either bound).
    pub fn contains_strictly(&self, tick: i64) -> bool {
        tick > self.start && tick < self.end
    }
}

/// An object referencing an audio asset, as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Referencer {
    /// A sequence places the asset on one of its audio tracks.
    Sequence(SequenceId),
    /// Anything that is not a sequence (scripts, world objects, ...),
    /// identified by name for logging.
    External(String),
}

/// Snapshot of an asset handed to the transcoder.
#[derive(Debug, Clone)]
pub struct AssetDesc {
    pub id: AssetId,
    pub name: String,
    pub duration_ms: i64,
    /// Physical waveform source, if the asset is file-backed.
    pub source: Option<PathBuf>,
}

/// Read/write surface of the sequence data model.
pub trait TimelineModel {
    /// All audio sections of the sequence, with their resolved assets.
    /// Sections whose asset cannot be resolved are reported with `None`.
    fn list_audio_sections(&self, sequence: SequenceId) -> Vec<(Option<AssetId>, SectionId)>;

    /// The asset the section currently plays, if resolved.
    fn section_asset(&self, section: SectionId) -> Option<AssetId>;

    /// The sequence that owns the section.
    fn section_sequence(&self, section: SectionId) -> SequenceId;

    /// The section's placement on the timeline, in ticks.
    fn section_range(&self, section: SectionId) -> TickRange;

    fn set_section_range(&mut self, section: SectionId, range: TickRange);

    /// Asset-relative start offset of the section, in ticks.
    fn asset_start_offset(&self, section: SectionId) -> i64;

    fn set_asset_start_offset(&mut self, section: SectionId, ticks: i64);

    fn set_looping(&mut self, section: SectionId, looping: bool);

    fn set_asset(&mut self, section: SectionId, asset: AssetId);

    /// Split the section at the given timeline tick. The left part keeps the
    /// section's identity; the right part is returned as a new section with
    /// a continuation offset. Fails if `at_tick` is not strictly inside the
    /// section range.
    fn split_section(&mut self, section: SectionId, at_tick: i64) -> Result<SectionId>;

    /// Clone the section in place (same range, offset, asset, track).
    fn duplicate_section(&mut self, section: SectionId) -> SectionId;

    /// Remove the section from its track.
    fn remove_section(&mut self, section: SectionId);

    /// The sequence's playback range in ticks.
    fn playback_range(&self, sequence: SequenceId) -> TickRange;

    /// Ticks per second for the sequence.
    fn tick_rate(&self, sequence: SequenceId) -> i64;

    fn sequence_name(&self, sequence: SequenceId) -> &str;
}

/// Read/write surface of the asset registry.
pub trait AssetStore {
    /// Total duration of the asset in milliseconds.
    fn duration_ms(&self, asset: AssetId) -> i64;

    fn asset_name(&self, asset: AssetId) -> &str;

    /// Snapshot for handing to the transcoder.
    fn describe(&self, asset: AssetId) -> AssetDesc;

    /// Duplicate the asset under a derived name (see
    /// [`derive_duplicate_name`]), same namespace, new identity.
    ///
    /// # Panics
    /// Panics if the derived name collides with the original's — the naming
    /// scheme makes that unreachable, so a collision signals a broken
    /// invariant rather than a runtime condition.
    fn duplicate(&mut self, asset: AssetId, suffix_index: u32) -> AssetId;

    /// Every object referencing the asset, classified as sequence or not.
    fn referencing_objects(&self, asset: AssetId) -> Vec<Referencer>;

    /// Replace the asset's physical source with the trimmed waveform and
    /// re-derive its duration, keeping the same identity.
    fn reimport(&mut self, asset: AssetId, trimmed_wav: &Path) -> Result<()>;
}

/// Physical waveform operations, file-in/file-out.
pub trait AudioTranscoder {
    /// Export the asset to a scratch WAV file and return its path.
    fn export(&mut self, asset: &AssetDesc) -> Result<PathBuf>;

    /// Write `[start_ms, end_ms)` of `input` into `output`.
    fn trim(&mut self, input: &Path, output: &Path, start_ms: i64, end_ms: i64) -> Result<()>;
}

/// Derive the name for an asset duplicate by incrementing the trailing digit
/// run of the original name, or suffixing the index if there is none.
///
/// ```
/// use seqtrim::model::derive_duplicate_name;
///
/// assert_eq!(derive_duplicate_name("SW_Step", 1), "SW_Step1");
/// assert_eq!(derive_duplicate_name("SW_Step1", 1), "SW_Step2");
/// assert_eq!(derive_duplicate_name("SW_Step7", 2), "SW_Step9");
/// ```
pub fn derive_duplicate_name(original: &str, suffix_index: u32) -> String {
    let digits = original
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .count();
    let (stem, tail) = original.split_at(original.len() - digits);

    let number = match tail.parse::<u64>() {
        Ok(n) => n + u64::from(suffix_index),
        Err(_) => u64::from(suffix_index),
    };

    format!("{stem}{number}")
}
