//! In-memory content project backing the collaborator traits
//!
//! A project is described by a TOML file listing audio assets (with
//! optional WAV sources), sequences with their audio sections, and any
//! known non-sequence consumers of an asset. The loaded form implements
//! both [`TimelineModel`] and [`AssetStore`], which is all the pipeline
//! needs; reference finding is a scan over the loaded data rather than a
//! live registry query.
//!
//! Sections are tombstoned on removal so ids handed out earlier stay
//! stable for the rest of the run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::model::{
    derive_duplicate_name, AssetDesc, AssetId, AssetStore, Referencer, SectionId, SequenceId,
    TickRange, TimelineModel,
};
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct AssetRecord {
    name: String,
    duration_ms: i64,
    source: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct SequenceRecord {
    name: String,
    tick_rate: i64,
    playback: TickRange,
}

#[derive(Debug, Clone)]
struct SectionRecord {
    sequence: SequenceId,
    asset: Option<AssetId>,
    range: TickRange,
    offset_ticks: i64,
    looping: bool,
    removed: bool,
}

/// Loaded content project: assets, sequences, sections, external references.
#[derive(Debug, Default)]
pub struct Project {
    assets: Vec<AssetRecord>,
    sequences: Vec<SequenceRecord>,
    sections: Vec<SectionRecord>,
    external_refs: Vec<(AssetId, String)>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a project description from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: ProjectFile = toml::from_str(&content)?;
        Self::from_file(file, path.parent().unwrap_or_else(|| Path::new(".")))
    }

    /// Write the (possibly mutated) project back to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = self.to_file();
        let content = toml::to_string_pretty(&file)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Register an asset. `duration_ms` may be omitted for file-backed
    /// assets, in which case it is probed from the WAV source.
    pub fn add_asset(
        &mut self,
        name: &str,
        duration_ms: Option<i64>,
        source: Option<PathBuf>,
    ) -> Result<AssetId> {
        let duration_ms = match (duration_ms, &source) {
            (Some(ms), _) => ms,
            (None, Some(path)) => probe_wav_duration_ms(path)?,
            (None, None) => {
                return Err(Error::Project(format!(
                    "asset '{name}' needs either a duration or a WAV source"
                )))
            }
        };

        if duration_ms <= 0 {
            return Err(Error::Project(format!(
                "asset '{name}' has a non-positive duration ({duration_ms} ms)"
            )));
        }

        self.assets.push(AssetRecord {
            name: name.to_string(),
            duration_ms,
            source,
        });
        Ok(AssetId(self.assets.len() as u32 - 1))
    }

    pub fn add_sequence(&mut self, name: &str, tick_rate: i64, playback: TickRange) -> SequenceId {
        self.sequences.push(SequenceRecord {
            name: name.to_string(),
            tick_rate,
            playback,
        });
        SequenceId(self.sequences.len() as u32 - 1)
    }

    pub fn add_section(
        &mut self,
        sequence: SequenceId,
        asset: Option<AssetId>,
        range: TickRange,
        offset_ticks: i64,
        looping: bool,
    ) -> SectionId {
        self.sections.push(SectionRecord {
            sequence,
            asset,
            range,
            offset_ticks,
            looping,
            removed: false,
        });
        SectionId(self.sections.len() as u32 - 1)
    }

    pub fn add_external_reference(&mut self, asset: AssetId, referencer: &str) {
        self.external_refs.push((asset, referencer.to_string()));
    }

    pub fn asset_by_name(&self, name: &str) -> Option<AssetId> {
        self.assets
            .iter()
            .position(|a| a.name == name)
            .map(|i| AssetId(i as u32))
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn sequence_ids(&self) -> Vec<SequenceId> {
        (0..self.sequences.len() as u32).map(SequenceId).collect()
    }

    /// Live (non-removed) sections of a sequence.
    pub fn live_sections(&self, sequence: SequenceId) -> Vec<SectionId> {
        self.sections
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.removed && s.sequence == sequence)
            .map(|(i, _)| SectionId(i as u32))
            .collect()
    }

    pub fn section_looping(&self, section: SectionId) -> bool {
        self.section_record(section).looping
    }

    pub fn is_section_removed(&self, section: SectionId) -> bool {
        self.section_record(section).removed
    }

    fn asset_record(&self, asset: AssetId) -> &AssetRecord {
        &self.assets[asset.0 as usize]
    }

    fn section_record(&self, section: SectionId) -> &SectionRecord {
        &self.sections[section.0 as usize]
    }

    fn section_record_mut(&mut self, section: SectionId) -> &mut SectionRecord {
        &mut self.sections[section.0 as usize]
    }

    fn from_file(file: ProjectFile, base_dir: &Path) -> Result<Self> {
        let mut project = Project::new();

        for asset in &file.assets {
            let source = asset.source.as_ref().map(|p| base_dir.join(p));
            project.add_asset(&asset.name, asset.duration_ms, source)?;
        }

        for sequence in &file.sequences {
            if sequence.tick_rate <= 0 {
                return Err(Error::Project(format!(
                    "sequence '{}' has a non-positive tick rate",
                    sequence.name
                )));
            }
            let sequence_id = project.add_sequence(
                &sequence.name,
                sequence.tick_rate,
                TickRange::new(sequence.playback_start_ticks, sequence.playback_end_ticks),
            );

            for section in &sequence.sections {
                let asset = project.asset_by_name(&section.asset);
                if asset.is_none() {
                    warn!(
                        "Section in sequence '{}' references unknown asset '{}'",
                        sequence.name, section.asset
                    );
                }
                project.add_section(
                    sequence_id,
                    asset,
                    TickRange::new(section.start_ticks, section.end_ticks),
                    section.offset_ticks,
                    section.looping,
                );
            }
        }

        for reference in &file.external_references {
            let asset = project.asset_by_name(&reference.asset).ok_or_else(|| {
                Error::AssetNotFound(format!(
                    "external reference '{}' targets unknown asset '{}'",
                    reference.referencer, reference.asset
                ))
            })?;
            project.add_external_reference(asset, &reference.referencer);
        }

        info!(
            "Loaded project: {} assets, {} sequences, {} sections",
            project.assets.len(),
            project.sequences.len(),
            project.sections.len()
        );
        Ok(project)
    }

    fn to_file(&self) -> ProjectFile {
        let assets = self
            .assets
            .iter()
            .map(|a| AssetEntry {
                name: a.name.clone(),
                duration_ms: Some(a.duration_ms),
                source: a.source.clone(),
            })
            .collect();

        let sequences = self
            .sequences
            .iter()
            .enumerate()
            .map(|(index, s)| {
                let sequence_id = SequenceId(index as u32);
                let sections = self
                    .sections
                    .iter()
                    .filter(|sec| !sec.removed && sec.sequence == sequence_id)
                    .map(|sec| SectionEntry {
                        asset: sec
                            .asset
                            .map(|a| self.asset_record(a).name.clone())
                            .unwrap_or_default(),
                        start_ticks: sec.range.start,
                        end_ticks: sec.range.end,
                        offset_ticks: sec.offset_ticks,
                        looping: sec.looping,
                    })
                    .collect();
                SequenceEntry {
                    name: s.name.clone(),
                    tick_rate: s.tick_rate,
                    playback_start_ticks: s.playback.start,
                    playback_end_ticks: s.playback.end,
                    sections,
                }
            })
            .collect();

        let external_references = self
            .external_refs
            .iter()
            .map(|(asset, referencer)| ExternalReferenceEntry {
                asset: self.asset_record(*asset).name.clone(),
                referencer: referencer.clone(),
            })
            .collect();

        ProjectFile {
            assets,
            sequences,
            external_references,
        }
    }
}

impl TimelineModel for Project {
    fn list_audio_sections(&self, sequence: SequenceId) -> Vec<(Option<AssetId>, SectionId)> {
        self.sections
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.removed && s.sequence == sequence)
            .map(|(i, s)| (s.asset, SectionId(i as u32)))
            .collect()
    }

    fn section_asset(&self, section: SectionId) -> Option<AssetId> {
        self.section_record(section).asset
    }

    fn section_sequence(&self, section: SectionId) -> SequenceId {
        self.section_record(section).sequence
    }

    fn section_range(&self, section: SectionId) -> TickRange {
        self.section_record(section).range
    }

    fn set_section_range(&mut self, section: SectionId, range: TickRange) {
        self.section_record_mut(section).range = range;
    }

    fn asset_start_offset(&self, section: SectionId) -> i64 {
        self.section_record(section).offset_ticks
    }

    fn set_asset_start_offset(&mut self, section: SectionId, ticks: i64) {
        self.section_record_mut(section).offset_ticks = ticks;
    }

    fn set_looping(&mut self, section: SectionId, looping: bool) {
        self.section_record_mut(section).looping = looping;
    }

    fn set_asset(&mut self, section: SectionId, asset: AssetId) {
        self.section_record_mut(section).asset = Some(asset);
    }

    fn split_section(&mut self, section: SectionId, at_tick: i64) -> Result<SectionId> {
        let record = self.section_record(section).clone();
        if !record.range.contains_strictly(at_tick) {
            return Err(Error::Geometry(format!(
                "split point {at_tick} outside section range [{}, {})",
                record.range.start, record.range.end
            )));
        }

        // Left part keeps the identity; right part continues playback.
        self.section_record_mut(section).range = TickRange::new(record.range.start, at_tick);

        let right = SectionRecord {
            sequence: record.sequence,
            asset: record.asset,
            range: TickRange::new(at_tick, record.range.end),
            offset_ticks: record.offset_ticks + (at_tick - record.range.start),
            looping: record.looping,
            removed: false,
        };
        self.sections.push(right);
        Ok(SectionId(self.sections.len() as u32 - 1))
    }

    fn duplicate_section(&mut self, section: SectionId) -> SectionId {
        let mut record = self.section_record(section).clone();
        record.removed = false;
        self.sections.push(record);
        SectionId(self.sections.len() as u32 - 1)
    }

    fn remove_section(&mut self, section: SectionId) {
        self.section_record_mut(section).removed = true;
    }

    fn playback_range(&self, sequence: SequenceId) -> TickRange {
        self.sequences[sequence.0 as usize].playback
    }

    fn tick_rate(&self, sequence: SequenceId) -> i64 {
        self.sequences[sequence.0 as usize].tick_rate
    }

    fn sequence_name(&self, sequence: SequenceId) -> &str {
        &self.sequences[sequence.0 as usize].name
    }
}

impl AssetStore for Project {
    fn duration_ms(&self, asset: AssetId) -> i64 {
        self.asset_record(asset).duration_ms
    }

    fn asset_name(&self, asset: AssetId) -> &str {
        &self.asset_record(asset).name
    }

    fn describe(&self, asset: AssetId) -> AssetDesc {
        let record = self.asset_record(asset);
        AssetDesc {
            id: asset,
            name: record.name.clone(),
            duration_ms: record.duration_ms,
            source: record.source.clone(),
        }
    }

    fn duplicate(&mut self, asset: AssetId, suffix_index: u32) -> AssetId {
        let original = self.asset_record(asset).clone();
        let new_name = derive_duplicate_name(&original.name, suffix_index);
        assert_ne!(
            new_name, original.name,
            "duplicate name derivation produced the original name"
        );

        // The duplicate shares the waveform until a reimport replaces it.
        let source = original.source.as_ref().and_then(|src| {
            let dst = src.with_file_name(format!("{new_name}.wav"));
            match std::fs::copy(src, &dst) {
                Ok(_) => Some(dst),
                Err(e) => {
                    warn!(
                        "Could not copy waveform for duplicate '{}': {e}; duplicate has no source",
                        new_name
                    );
                    None
                }
            }
        });

        self.assets.push(AssetRecord {
            name: new_name.clone(),
            duration_ms: original.duration_ms,
            source,
        });
        info!("Duplicated asset '{}' to '{}'", original.name, new_name);
        AssetId(self.assets.len() as u32 - 1)
    }

    fn referencing_objects(&self, asset: AssetId) -> Vec<Referencer> {
        let mut referencers = Vec::new();

        for (index, _) in self.sequences.iter().enumerate() {
            let sequence_id = SequenceId(index as u32);
            let uses_asset = self
                .sections
                .iter()
                .any(|s| !s.removed && s.sequence == sequence_id && s.asset == Some(asset));
            if uses_asset {
                referencers.push(Referencer::Sequence(sequence_id));
            }
        }

        for (referenced, name) in &self.external_refs {
            if *referenced == asset {
                referencers.push(Referencer::External(name.clone()));
            }
        }

        referencers
    }

    fn reimport(&mut self, asset: AssetId, trimmed_wav: &Path) -> Result<()> {
        if !trimmed_wav.exists() {
            return Err(Error::Reimport(format!(
                "trimmed waveform does not exist: {}",
                trimmed_wav.display()
            )));
        }

        let new_duration_ms = probe_wav_duration_ms(trimmed_wav)?;
        let record = &mut self.assets[asset.0 as usize];

        match &record.source {
            Some(source) => {
                std::fs::copy(trimmed_wav, source).map_err(|e| {
                    Error::Reimport(format!(
                        "could not replace source '{}': {e}",
                        source.display()
                    ))
                })?;
            }
            None => {
                debug!(
                    "Asset '{}' has no waveform source; updating duration only",
                    record.name
                );
            }
        }

        info!(
            "Reimported asset '{}': duration {} ms -> {} ms",
            record.name, record.duration_ms, new_duration_ms
        );
        record.duration_ms = new_duration_ms;
        Ok(())
    }
}

/// Read a WAV file's duration in milliseconds.
pub fn probe_wav_duration_ms(path: &Path) -> Result<i64> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let samples_per_channel = i64::from(reader.duration());
    Ok(samples_per_channel * 1000 / i64::from(spec.sample_rate))
}

// Serde representation of the project file.

#[derive(Debug, Serialize, Deserialize, Default)]
struct ProjectFile {
    #[serde(default)]
    assets: Vec<AssetEntry>,
    #[serde(default)]
    sequences: Vec<SequenceEntry>,
    #[serde(default)]
    external_references: Vec<ExternalReferenceEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AssetEntry {
    name: String,
    #[serde(default)]
    duration_ms: Option<i64>,
    #[serde(default)]
    source: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SequenceEntry {
    name: String,
    tick_rate: i64,
    #[serde(default)]
    playback_start_ticks: i64,
    playback_end_ticks: i64,
    #[serde(default)]
    sections: Vec<SectionEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SectionEntry {
    asset: String,
    start_ticks: i64,
    end_ticks: i64,
    #[serde(default)]
    offset_ticks: i64,
    #[serde(default)]
    looping: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExternalReferenceEntry {
    asset: String,
    referencer: String,
}
