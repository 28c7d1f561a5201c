//! Pipeline-contract tests: the orchestrator is driven with recording
//! doubles, plus one end-to-end run over generated sample sources.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Result, bail};
use arrow::array::{Array, StringArray};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use atomweave::config::PipelineConfig;
use atomweave::data::combine::Combine;
use atomweave::data::model::{
    CombinedDataset, Provenance, SourceKind, SourceSet, SourceTable,
};
use atomweave::pipeline::{self, Acquire, AcquisitionTask};

// ---------------------------------------------------------------------------
// Doubles
// ---------------------------------------------------------------------------

/// Records acquisition order; optionally fails on one kind.
struct StubAcquirer {
    calls: Vec<SourceKind>,
    fail_on: Option<SourceKind>,
}

impl StubAcquirer {
    fn new(fail_on: Option<SourceKind>) -> Self {
        StubAcquirer {
            calls: Vec::new(),
            fail_on,
        }
    }
}

impl Acquire for StubAcquirer {
    fn acquire(&mut self, task: &AcquisitionTask) -> Result<SourceTable> {
        let kind = task.kind();
        self.calls.push(kind);
        if self.fail_on == Some(kind) {
            bail!("stubbed {kind} failure");
        }
        Ok(SourceTable::new(
            kind,
            Provenance {
                location: format!("stub:{kind}"),
                checksum: None,
                priority: 10,
            },
        ))
    }
}

/// Counts combine calls and records the kinds it was handed.
#[derive(Default)]
struct RecordingCombiner {
    calls: Cell<usize>,
    seen: RefCell<Vec<SourceKind>>,
}

impl Combine for RecordingCombiner {
    fn combine(&self, sources: &SourceSet) -> Result<CombinedDataset> {
        self.calls.set(self.calls.get() + 1);
        self.seen
            .borrow_mut()
            .extend(sources.iter().map(|s| s.kind));
        Ok(CombinedDataset::default())
    }
}

fn test_config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        staging_path: dir.join("staged_gfall.dat"),
        output_path: dir.join("out.parquet"),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Contract tests
// ---------------------------------------------------------------------------

#[test]
fn combiner_is_called_once_with_five_sources_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let mut acquirer = StubAcquirer::new(None);
    let combiner = RecordingCombiner::default();

    let artifact = pipeline::run(&config, &mut acquirer, &combiner).unwrap();

    assert_eq!(acquirer.calls, SourceSet::ORDER.to_vec());
    assert_eq!(combiner.calls.get(), 1);
    assert_eq!(*combiner.seen.borrow(), SourceSet::ORDER.to_vec());
    assert_eq!(artifact, config.output_path);
    assert!(config.output_path.exists());
}

#[test]
fn failing_acquisition_skips_combiner_and_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let mut acquirer = StubAcquirer::new(Some(SourceKind::LineList));
    let combiner = RecordingCombiner::default();

    let result = pipeline::run(&config, &mut acquirer, &combiner);

    assert!(result.is_err());
    assert_eq!(combiner.calls.get(), 0);
    assert!(!config.output_path.exists());
    // The pipeline stopped at the failing step.
    assert_eq!(
        acquirer.calls,
        vec![
            SourceKind::AtomicWeights,
            SourceKind::IonizationEnergies,
            SourceKind::LineList,
        ]
    );
}

#[test]
fn failing_first_acquisition_stops_everything() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let mut acquirer = StubAcquirer::new(Some(SourceKind::AtomicWeights));
    let combiner = RecordingCombiner::default();

    assert!(pipeline::run(&config, &mut acquirer, &combiner).is_err());
    assert_eq!(acquirer.calls, vec![SourceKind::AtomicWeights]);
    assert_eq!(combiner.calls.get(), 0);
    assert!(!config.output_path.exists());
}

// ---------------------------------------------------------------------------
// End-to-end over sample sources
// ---------------------------------------------------------------------------

const WEIGHTS: &str = "\
Atomic Number = 1
Atomic Symbol = H
Mass Number = 1
Relative Atomic Mass = 1.00782503224(9)
Isotopic Composition = 0.999885(70)
Standard Atomic Weight = [1.00784,1.00811]

Atomic Number = 2
Atomic Symbol = He
Mass Number = 4
Relative Atomic Mass = 4.00260325413(6)
Isotopic Composition = 0.99999866(3)
Standard Atomic Weight = 4.002602(2)
";

const IONIZATION: &str = "\
At. Num | Sp. Name | Ion Charge | Ionization Energy (eV) |
--------|----------|------------|------------------------|
      1 | H I      |          0 | 13.598434599702        |
      2 | He I     |          0 | 24.587389011           |
      2 | He II    |          1 | 54.4177655282          |
";

const GFALL: &str = "\
# wavelength  log_gf  code  e_lower  j_lo  e_upper      j_up
   121.5670   -0.351  1.00  0.000    0.5   82259.158    1.5
    58.4334   -0.757  2.00  0.000    0.0   171134.897   1.0
";

const H_1_LEVELS: &str = "\
0  0.000      0.5  1s 2S1/2
1  82258.919  0.5  2p 2P1/2
";

const H_1_LINES: &str = "0 1 121.5674 0.2774\n";

const H_1_COLLISIONS: &str = "0 1 10000.0 0.29\n";

const ZETA: &str = "\
# T[K]: 2000 4000
1 1 0.339 0.254
2 1 0.581 0.413
";

fn write_sample_sources(dir: &Path) -> PipelineConfig {
    let chianti = dir.join("chianti_db");
    fs::create_dir_all(&chianti).unwrap();

    fs::write(dir.join("weights.txt"), WEIGHTS).unwrap();
    fs::write(dir.join("ionization.txt"), IONIZATION).unwrap();
    fs::write(dir.join("gfall.dat"), GFALL).unwrap();
    fs::write(dir.join("zeta.dat"), ZETA).unwrap();
    fs::write(chianti.join("h_1.levels"), H_1_LEVELS).unwrap();
    fs::write(chianti.join("h_1.lines"), H_1_LINES).unwrap();
    fs::write(chianti.join("h_1.collisions"), H_1_COLLISIONS).unwrap();

    PipelineConfig {
        weights_source: dir.join("weights.txt").display().to_string(),
        ionization_source: dir.join("ionization.txt").display().to_string(),
        lines_source: dir.join("gfall.dat").display().to_string(),
        levels_dir: chianti,
        zeta_source: dir.join("zeta.dat").display().to_string(),
        weights_range: "H-He".to_string(),
        ionization_range: "H-He".to_string(),
        lines_range: "H-He".to_string(),
        levels_range: "H-He".to_string(),
        include_collisions: true,
        levels_priority: 20,
        staging_path: dir.join("staged_gfall.dat"),
        output_path: dir.join("atom_data.parquet"),
    }
}

/// Distinct values of the `table` column in the written artifact.
fn table_names(path: &Path) -> BTreeSet<String> {
    let file = fs::File::open(path).unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap();

    let mut names = BTreeSet::new();
    for batch in reader {
        let batch = batch.unwrap();
        let tables = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("table column");
        for i in 0..tables.len() {
            names.insert(tables.value(i).to_string());
        }
    }
    names
}

#[test]
fn end_to_end_run_produces_all_tables() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_sample_sources(dir.path());

    let artifact = pipeline::run_with_defaults(&config).unwrap();

    let expected: BTreeSet<String> = [
        "atom_data",
        "ionization_data",
        "levels",
        "lines",
        "collisions",
        "zeta_data",
        "meta",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(table_names(&artifact), expected);

    // Local line lists are parsed in place; nothing is staged.
    assert!(!config.staging_path.exists());
}

#[test]
fn rerunning_the_pipeline_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_sample_sources(dir.path());

    let artifact = pipeline::run_with_defaults(&config).unwrap();
    let first = fs::read(&artifact).unwrap();

    let artifact = pipeline::run_with_defaults(&config).unwrap();
    let second = fs::read(&artifact).unwrap();

    assert_eq!(first, second);
}

#[test]
fn collisions_flag_off_drops_the_collisions_table() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_sample_sources(dir.path());
    config.include_collisions = false;

    let artifact = pipeline::run_with_defaults(&config).unwrap();
    assert!(!table_names(&artifact).contains("collisions"));
}
