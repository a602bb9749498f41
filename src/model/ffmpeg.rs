//! Waveform trimming through the external ffmpeg binary
//!
//! Export copies the asset's WAV source into an owned scratch directory;
//! trimming runs `ffmpeg -i IN -ss START -to END -c copy OUT -y` as an
//! out-of-process call that blocks until done. The scratch directory is
//! removed when the transcoder is dropped.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::model::{AssetDesc, AudioTranscoder};
use crate::{Error, Result};

/// [`AudioTranscoder`] implementation backed by ffmpeg.
pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
    scratch: TempDir,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            ffmpeg_path: ffmpeg_path.into(),
            scratch: tempfile::tempdir()?,
        })
    }

    /// Check that the configured ffmpeg binary runs, returning the first
    /// line of its version output.
    pub fn probe_version(&self) -> Result<String> {
        let output = Command::new(&self.ffmpeg_path)
            .arg("-version")
            .output()
            .map_err(|e| Error::Trim(format!("could not run ffmpeg: {e}")))?;

        if !output.status.success() {
            return Err(Error::Trim(format!(
                "ffmpeg -version exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or("").to_string())
    }
}

impl AudioTranscoder for FfmpegTranscoder {
    fn export(&mut self, asset: &AssetDesc) -> Result<PathBuf> {
        let source = asset.source.as_ref().ok_or_else(|| {
            Error::Export(format!("asset '{}' has no waveform source", asset.name))
        })?;

        let export_path = self.scratch.path().join(format!("{}.wav", asset.name));
        std::fs::copy(source, &export_path).map_err(|e| {
            Error::Export(format!(
                "could not export '{}' from {}: {e}",
                asset.name,
                source.display()
            ))
        })?;

        debug!("Exported '{}' to {}", asset.name, export_path.display());
        Ok(export_path)
    }

    fn trim(&mut self, input: &Path, output: &Path, start_ms: i64, end_ms: i64) -> Result<()> {
        let start_sec = start_ms as f64 / 1000.0;
        let end_sec = end_ms as f64 / 1000.0;

        let status = Command::new(&self.ffmpeg_path)
            .arg("-i")
            .arg(input)
            .arg("-ss")
            .arg(format!("{start_sec:.2}"))
            .arg("-to")
            .arg(format!("{end_sec:.2}"))
            .arg("-c")
            .arg("copy")
            .arg(output)
            .arg("-y")
            .status()
            .map_err(|e| Error::Trim(format!("could not run ffmpeg: {e}")))?;

        if !status.success() {
            return Err(Error::Trim(format!("ffmpeg exited with {status}")));
        }

        match (file_size_mb(input), file_size_mb(output)) {
            (Some(before), Some(after)) => {
                info!("Trimmed audio stats: previous size {before:.2} MB, new size {after:.2} MB")
            }
            _ => warn!("Could not stat trim input/output for size reporting"),
        }

        Ok(())
    }
}

fn file_size_mb(path: &Path) -> Option<f64> {
    std::fs::metadata(path)
        .ok()
        .map(|m| m.len() as f64 / (1024.0 * 1024.0))
}
