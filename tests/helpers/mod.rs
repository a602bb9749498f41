//! Shared fixtures for the integration tests: a transcoder that
//! fabricates silence instead of shelling out to ffmpeg, and WAV file
//! helpers.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::TempDir;

use seqtrim::model::project::Project;
use seqtrim::model::{AssetDesc, AudioTranscoder, SequenceId};
use seqtrim::{Result, RunReport, TrimConfig, Trimmer};

/// Write a mono 16-bit WAV of silence at 1 kHz, so one sample equals one
/// millisecond and durations assert cleanly.
pub fn write_silence_wav(path: &Path, duration_ms: i64) {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 1000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for _ in 0..duration_ms {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Transcoder double: exports by synthesizing silence of the asset's
/// duration, trims by writing silence of the window length. Counts calls
/// so tests can assert how much physical work a run did.
pub struct SilenceTranscoder {
    pub scratch: TempDir,
    pub exports: usize,
    pub trims: usize,
}

impl SilenceTranscoder {
    pub fn new() -> Self {
        Self {
            scratch: tempfile::tempdir().unwrap(),
            exports: 0,
            trims: 0,
        }
    }
}

impl AudioTranscoder for SilenceTranscoder {
    fn export(&mut self, asset: &AssetDesc) -> Result<PathBuf> {
        self.exports += 1;
        let path = self.scratch.path().join(format!("{}.wav", asset.name));
        match &asset.source {
            Some(source) => {
                std::fs::copy(source, &path)?;
            }
            None => write_silence_wav(&path, asset.duration_ms),
        }
        Ok(path)
    }

    fn trim(&mut self, _input: &Path, output: &Path, start_ms: i64, end_ms: i64) -> Result<()> {
        self.trims += 1;
        write_silence_wav(output, end_ms - start_ms);
        Ok(())
    }
}

/// Run the whole pipeline over every sequence in the project.
pub fn run_pipeline(
    project: &mut Project,
    transcoder: &mut SilenceTranscoder,
    config: TrimConfig,
) -> RunReport {
    let sequences: Vec<SequenceId> = project.sequence_ids();
    Trimmer::new(project, transcoder, config)
        .unwrap()
        .run(&sequences)
}
