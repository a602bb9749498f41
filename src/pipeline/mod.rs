//! The trimming pipeline: gather → resolve policies → execute
//!
//! [`Trimmer`] wires the three phases over the collaborator traits. Each
//! phase is independently testable; the pipeline itself only sequences
//! them and reports what happened.

pub mod execute;
pub mod gather;
pub mod policy;

use tracing::{info, warn};

use crate::config::TrimConfig;
use crate::model::{AssetStore, AudioTranscoder, SequenceId, TimelineModel};
use crate::Result;

pub use execute::RunReport;
pub use gather::GatherOutcome;

/// One trimming run over a set of sequences.
pub struct Trimmer<'a, P, X> {
    project: &'a mut P,
    transcoder: &'a mut X,
    config: TrimConfig,
}

impl<'a, P, X> Trimmer<'a, P, X>
where
    P: TimelineModel + AssetStore,
    X: AudioTranscoder,
{
    pub fn new(project: &'a mut P, transcoder: &'a mut X, config: TrimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            project,
            transcoder,
            config,
        })
    }

    /// Run the full pipeline over the given sequences.
    pub fn run(&mut self, sequences: &[SequenceId]) -> RunReport {
        let mut report = RunReport {
            sequences: sequences.len(),
            ..RunReport::default()
        };

        info!("Gathering trim windows from {} sequence(s)", sequences.len());
        let mut outcome = gather::gather(&*self.project, sequences, &self.config);
        if outcome.multimap.is_empty() {
            warn!("No valid trim windows found; nothing to do");
            return report;
        }
        info!(
            "Gathered {} asset(s) with trim windows",
            outcome.multimap.len()
        );

        info!("Resolving policies");
        policy::resolve(self.project, &mut outcome, &self.config);

        info!("Executing trims for {} asset(s)", outcome.multimap.len());
        execute::execute(
            self.project,
            self.transcoder,
            &outcome.multimap,
            &self.config,
            &mut report,
        );

        info!("Run complete: {report}");
        report
    }
}
