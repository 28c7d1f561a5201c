use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::PipelineConfig;
use crate::data::combine::{AtomCombiner, Combine};
use crate::data::model::{SourceKind, SourceSet, SourceTable};
use crate::elements::ElementRange;
use crate::fetch;
use crate::readers::chianti::ChiantiReader;
use crate::readers::gfall::GfallReader;
use crate::readers::ionization::IonizationReader;
use crate::readers::weights::WeightsReader;
use crate::readers::zeta::ZetaReader;
use crate::readers::DEFAULT_PRIORITY;

// ---------------------------------------------------------------------------
// Acquisition tasks
// ---------------------------------------------------------------------------

/// Descriptor of one acquisition step: which source to pull and with what
/// parameters. The run is driven by an ordered list of these rather than a
/// hard-coded call sequence.
#[derive(Debug, Clone)]
pub enum AcquisitionTask {
    Weights {
        range: ElementRange,
        source: String,
    },
    Ionization {
        range: ElementRange,
        source: String,
    },
    LineList {
        range: ElementRange,
        source: String,
        staging_path: PathBuf,
    },
    Levels {
        range: ElementRange,
        database_dir: PathBuf,
        include_collisions: bool,
        priority: i64,
    },
    Zeta {
        source: String,
    },
}

impl AcquisitionTask {
    /// The source kind this task acquires.
    pub fn kind(&self) -> SourceKind {
        match self {
            AcquisitionTask::Weights { .. } => SourceKind::AtomicWeights,
            AcquisitionTask::Ionization { .. } => SourceKind::IonizationEnergies,
            AcquisitionTask::LineList { .. } => SourceKind::LineList,
            AcquisitionTask::Levels { .. } => SourceKind::LevelsLines,
            AcquisitionTask::Zeta { .. } => SourceKind::Zeta,
        }
    }
}

// ---------------------------------------------------------------------------
// Acquire trait and the reader-backed implementation
// ---------------------------------------------------------------------------

/// Execute one acquisition task. The pipeline is generic over this trait
/// so its contract can be checked against a recording double.
pub trait Acquire {
    fn acquire(&mut self, task: &AcquisitionTask) -> Result<SourceTable>;
}

/// The production acquirer: dispatches each task to its reader. Remote
/// line lists are staged to the configured path first; a local line-list
/// path is parsed in place.
pub struct ReaderAcquirer;

impl Acquire for ReaderAcquirer {
    fn acquire(&mut self, task: &AcquisitionTask) -> Result<SourceTable> {
        match task {
            AcquisitionTask::Weights { range, source } => {
                WeightsReader::new(*range, source).read()
            }
            AcquisitionTask::Ionization { range, source } => {
                IonizationReader::new(*range, source).read()
            }
            AcquisitionTask::LineList {
                range,
                source,
                staging_path,
            } => {
                let staged = if fetch::is_url(source) {
                    fetch::download(source, staging_path)?;
                    staging_path.clone()
                } else {
                    PathBuf::from(source)
                };
                GfallReader::new(*range, DEFAULT_PRIORITY).read(&staged)
            }
            AcquisitionTask::Levels {
                range,
                database_dir,
                include_collisions,
                priority,
            } => ChiantiReader::new(*range, database_dir.clone(), *include_collisions, *priority)
                .read(),
            AcquisitionTask::Zeta { source } => ZetaReader::new(source).read(),
        }
    }
}

// ---------------------------------------------------------------------------
// The pipeline run
// ---------------------------------------------------------------------------

/// Run the pipeline: acquire every source in order, merge once, write
/// once. Returns the path of the written artifact.
///
/// Strictly sequential. The first failing step aborts the run — the
/// combiner is never invoked and the output path is never touched. The
/// staged line-list download is deliberately left behind.
pub fn run<A, C>(config: &PipelineConfig, acquirer: &mut A, combiner: &C) -> Result<PathBuf>
where
    A: Acquire,
    C: Combine,
{
    let tasks = config.tasks()?;

    let mut acquired = Vec::with_capacity(tasks.len());
    for task in &tasks {
        let source = acquirer
            .acquire(task)
            .with_context(|| format!("acquiring {} data", task.kind()))?;
        log::info!("acquired {}: {} rows", source.kind, source.row_count());
        acquired.push(source);
    }

    let sources = SourceSet::from_acquired(acquired)?;
    let combined = combiner.combine(&sources).context("combining sources")?;

    combined
        .write_parquet(&config.output_path)
        .with_context(|| format!("writing {}", config.output_path.display()))?;
    log::info!("wrote {}", config.output_path.display());

    Ok(config.output_path.clone())
}

/// [`run`] with the production readers and combiner.
pub fn run_with_defaults(config: &PipelineConfig) -> Result<PathBuf> {
    run(config, &mut ReaderAcquirer, &AtomCombiner)
}
