//! seqtrim command-line entry point
//!
//! Loads a project description, runs the trimming pipeline over the
//! requested sequences, and writes the rewired project back unless
//! `--dry-run` is given.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use seqtrim::model::ffmpeg::FfmpegTranscoder;
use seqtrim::model::project::Project;
use seqtrim::model::TimelineModel;
use seqtrim::{TrimConfig, Trimmer};

#[derive(Parser, Debug)]
#[command(name = "seqtrim", version, about = "Trim audio assets to what their sequences actually play")]
struct Args {
    /// Project description (TOML)
    project: PathBuf,

    /// Trimming configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sequences to process by name; all sequences when omitted
    #[arg(short, long)]
    sequence: Vec<String>,

    /// ffmpeg binary to shell out to
    #[arg(long, env = "SEQTRIM_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Run the pipeline without writing the project back
    #[arg(long)]
    dry_run: bool,

    /// Where to write the rewired project; the input path when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("seqtrim=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TrimConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => TrimConfig::default(),
    };

    let mut project = Project::load(&args.project)
        .with_context(|| format!("loading project from {}", args.project.display()))?;

    let sequences = if args.sequence.is_empty() {
        project.sequence_ids()
    } else {
        let mut selected = Vec::with_capacity(args.sequence.len());
        for name in &args.sequence {
            let id = project
                .sequence_ids()
                .into_iter()
                .find(|&id| project.sequence_name(id) == name);
            match id {
                Some(id) => selected.push(id),
                None => bail!("no sequence named '{name}' in the project"),
            }
        }
        selected
    };
    if sequences.is_empty() {
        bail!("project contains no sequences");
    }

    let mut transcoder = FfmpegTranscoder::new(&args.ffmpeg)?;
    match transcoder.probe_version() {
        Ok(version) => info!("Using {version}"),
        Err(e) => {
            warn!("Could not probe ffmpeg at {}: {e}", args.ffmpeg.display());
            bail!("ffmpeg is required; point --ffmpeg or SEQTRIM_FFMPEG at a working binary");
        }
    }

    let report = Trimmer::new(&mut project, &mut transcoder, config)?.run(&sequences);
    println!("{report}");

    if args.dry_run {
        info!("Dry run: project not written back");
        return Ok(());
    }

    let output = args.output.as_ref().unwrap_or(&args.project);
    project
        .save(output)
        .with_context(|| format!("writing project to {}", output.display()))?;
    info!("Wrote rewired project to {}", output.display());

    Ok(())
}
