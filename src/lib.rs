//! seqtrim - trim and deduplicate audio assets used by timeline sequences
//!
//! Audio placed on a sequence timeline usually plays only a window of its
//! asset: the section starts partway into the waveform and ends before it
//! runs out. The rest of the asset is dead weight shipped with the
//! project. seqtrim finds the window each section actually plays, merges
//! tolerance-equal windows across sections and sequences, applies the
//! configured safety policies (looping sounds, assets used outside
//! sequences, overlapping windows), and then physically trims each asset
//! to its used window exactly once, rewiring every section to play the
//! trimmed result from offset zero.
//!
//! The pipeline runs in three phases over three collaborator traits
//! ([`model::TimelineModel`], [`model::AssetStore`],
//! [`model::AudioTranscoder`]):
//!
//! 1. **gather** - one trim window per audio section, merged per asset
//! 2. **resolve** - policy passes reshape the windows (see [`config`])
//! 3. **execute** - export, ffmpeg trim, reimport, section rewiring
//!
//! [`model::project::Project`] supplies the timeline and asset store from
//! a TOML project description; [`model::ffmpeg::FfmpegTranscoder`] does
//! the physical trimming.

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod timing;
pub mod trim;

pub use config::TrimConfig;
pub use error::{Error, Result};
pub use pipeline::{RunReport, Trimmer};
