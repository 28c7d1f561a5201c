use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::elements::ElementRange;
use crate::pipeline::AcquisitionTask;

// ---------------------------------------------------------------------------
// Pipeline configuration
// ---------------------------------------------------------------------------

/// Everything one pipeline run needs: where each source lives, which
/// element span to keep from it, the levels/lines options, and the staging
/// and output paths. Defaults reproduce the canonical Kurucz + CHIANTI
/// H–Zn dataset build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// NIST linearized atomic-weights listing (URL or local path).
    pub weights_source: String,
    /// NIST ionization-energies listing (URL or local path).
    pub ionization_source: String,
    /// Kurucz-style line list (URL or local path). URLs are staged to
    /// `staging_path` before parsing.
    pub lines_source: String,
    /// CHIANTI-style per-ion database directory.
    pub levels_dir: PathBuf,
    /// Knox–Long zeta table (URL or local path).
    pub zeta_source: String,

    /// Element span kept from the weights listing.
    pub weights_range: String,
    /// Element span kept from the ionization listing.
    pub ionization_range: String,
    /// Element span kept from the line list.
    pub lines_range: String,
    /// Element span read from the levels/lines database (usually narrower).
    pub levels_range: String,

    /// Whether to read collision files from the levels/lines database.
    pub include_collisions: bool,
    /// Priority of the levels/lines source; ions it shares with the line
    /// list go to whichever source has the higher priority.
    pub levels_priority: i64,

    /// Local path the raw line list is downloaded to.
    pub staging_path: PathBuf,
    /// Path of the combined Parquet artifact.
    pub output_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            weights_source:
                "https://physics.nist.gov/cgi-bin/Compositions/stand_alone.pl?ele=&ascii=ascii2"
                    .to_string(),
            ionization_source:
                "https://physics.nist.gov/cgi-bin/ASD/ie.pl?spectra=H-Zn&units=1&format=1"
                    .to_string(),
            lines_source: "http://kurucz.harvard.edu/linelists/gfall/gfall.dat".to_string(),
            levels_dir: PathBuf::from("chianti_db"),
            zeta_source:
                "https://raw.githubusercontent.com/tardis-sn/carsus-db/master/knox_long/knox_long_zeta.dat"
                    .to_string(),
            weights_range: "H-Zn".to_string(),
            ionization_range: "H-Zn".to_string(),
            lines_range: "H-Zn".to_string(),
            levels_range: "H-He".to_string(),
            include_collisions: true,
            levels_priority: 20,
            staging_path: PathBuf::from("downloads/gfall.dat"),
            output_path: PathBuf::from("atom_data.parquet"),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a TOML file. Missing keys fall back to
    /// the defaults; unknown keys are rejected.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// The acquisition tasks of one run, in the fixed pipeline order.
    /// Adding or removing a source is a change here, not in the pipeline's
    /// control flow.
    pub fn tasks(&self) -> Result<Vec<AcquisitionTask>> {
        let parse = |spec: &str, what: &str| {
            ElementRange::parse(spec)
                .with_context(|| format!("{what} range '{spec}'"))
        };

        Ok(vec![
            AcquisitionTask::Weights {
                range: parse(&self.weights_range, "weights")?,
                source: self.weights_source.clone(),
            },
            AcquisitionTask::Ionization {
                range: parse(&self.ionization_range, "ionization")?,
                source: self.ionization_source.clone(),
            },
            AcquisitionTask::LineList {
                range: parse(&self.lines_range, "line list")?,
                source: self.lines_source.clone(),
                staging_path: self.staging_path.clone(),
            },
            AcquisitionTask::Levels {
                range: parse(&self.levels_range, "levels")?,
                database_dir: self.levels_dir.clone(),
                include_collisions: self.include_collisions,
                priority: self.levels_priority,
            },
            AcquisitionTask::Zeta {
                source: self.zeta_source.clone(),
            },
        ])
    }
}
