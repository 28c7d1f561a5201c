use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};

use crate::data::model::{DataTable, Provenance, SourceKind, SourceTable, TableValue};
use crate::elements::{self, ElementRange};
use crate::readers::parse_numeric;

// ---------------------------------------------------------------------------
// Levels/lines reader (CHIANTI-style per-ion database directory)
// ---------------------------------------------------------------------------

/// Reads spectroscopic level/line data from a CHIANTI-style database
/// directory holding one file set per ion, named by symbol and
/// spectroscopic stage (`he_2.levels` is singly-ionized helium):
///
/// * `<symbol>_<stage>.levels` – `index  energy  J  [label…]`
/// * `<symbol>_<stage>.lines` – `lower  upper  wavelength  gf`
/// * `<symbol>_<stage>.collisions` – `lower  upper  temperature  strength`
///
/// Collision files are only consulted when `include_collisions` is set.
/// The configured priority is attached to the source so the combiner can
/// resolve ions that the line list also covers.
pub struct ChiantiReader {
    range: ElementRange,
    database_dir: PathBuf,
    include_collisions: bool,
    priority: i64,
}

impl ChiantiReader {
    pub fn new(
        range: ElementRange,
        database_dir: impl Into<PathBuf>,
        include_collisions: bool,
        priority: i64,
    ) -> Self {
        ChiantiReader {
            range,
            database_dir: database_dir.into(),
            include_collisions,
            priority,
        }
    }

    /// Parse every ion of the configured range present in the database.
    pub fn read(&self) -> Result<SourceTable> {
        log::info!(
            "parsing levels/lines ({}) from {}",
            self.range,
            self.database_dir.display()
        );

        let mut levels_table = DataTable::new([
            "atomic_number",
            "ion_charge",
            "level_index",
            "energy",
            "j",
            "label",
        ]);
        let mut lines_table = DataTable::new([
            "atomic_number",
            "ion_charge",
            "level_index_lower",
            "level_index_upper",
            "wavelength",
            "gf",
        ]);
        let mut collisions_table = DataTable::new([
            "atomic_number",
            "ion_charge",
            "level_index_lower",
            "level_index_upper",
            "temperature",
            "strength",
        ]);

        let mut hasher = Sha256::new();
        let mut ions_found = 0usize;

        // Spectroscopic stage s is ion charge s - 1; the bare nucleus has
        // no levels, so stages run 1..=z.
        for z in self.range.iter() {
            let symbol = elements::symbol(z)
                .with_context(|| format!("atomic number {z} outside the symbol table"))?
                .to_ascii_lowercase();

            for stage in 1..=z {
                let base = self.database_dir.join(format!("{symbol}_{stage}"));
                let levels_path = base.with_extension("levels");
                if !levels_path.exists() {
                    continue;
                }
                ions_found += 1;
                let ion_charge = stage as i64 - 1;

                let levels_text = read_hashed(&levels_path, &mut hasher)?;
                let indices =
                    parse_levels(&levels_text, z, ion_charge, &mut levels_table)
                        .with_context(|| format!("parsing {}", levels_path.display()))?;

                let lines_path = base.with_extension("lines");
                if lines_path.exists() {
                    let lines_text = read_hashed(&lines_path, &mut hasher)?;
                    parse_transitions(
                        &lines_text,
                        z,
                        ion_charge,
                        &indices,
                        "wavelength",
                        &mut lines_table,
                    )
                    .with_context(|| format!("parsing {}", lines_path.display()))?;
                }

                if self.include_collisions {
                    let collisions_path = base.with_extension("collisions");
                    if collisions_path.exists() {
                        let collisions_text = read_hashed(&collisions_path, &mut hasher)?;
                        parse_transitions(
                            &collisions_text,
                            z,
                            ion_charge,
                            &indices,
                            "temperature",
                            &mut collisions_table,
                        )
                        .with_context(|| format!("parsing {}", collisions_path.display()))?;
                    }
                }
            }
        }

        if ions_found == 0 {
            log::warn!(
                "no ions of {} found in {}",
                self.range,
                self.database_dir.display()
            );
        }

        levels_table.sort_rows();
        lines_table.sort_rows();
        collisions_table.sort_rows();

        let checksum: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();

        let mut source = SourceTable::new(
            SourceKind::LevelsLines,
            Provenance {
                location: self.database_dir.display().to_string(),
                checksum: Some(checksum),
                priority: self.priority,
            },
        );
        source.insert_section("levels", levels_table);
        source.insert_section("lines", lines_table);
        if self.include_collisions {
            source.insert_section("collisions", collisions_table);
        }
        Ok(source)
    }
}

/// Read a database file, feeding its bytes into the running checksum.
fn read_hashed(path: &Path, hasher: &mut Sha256) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    hasher.update(&bytes);
    String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path.display()))
}

/// Parse one ion's level list; returns the set of declared level indices.
fn parse_levels(
    text: &str,
    z: u32,
    ion_charge: i64,
    table: &mut DataTable,
) -> Result<BTreeSet<i64>> {
    let mut indices = BTreeSet::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            bail!("line {}: expected at least 3 fields", line_no + 1);
        }

        let index: i64 = fields[0]
            .parse()
            .with_context(|| format!("line {}: bad level index '{}'", line_no + 1, fields[0]))?;
        if !indices.insert(index) {
            bail!("line {}: duplicate level index {index}", line_no + 1);
        }

        let energy = parse_numeric(fields[1], "energy")
            .with_context(|| format!("line {}", line_no + 1))?;
        let j = parse_numeric(fields[2], "J")
            .with_context(|| format!("line {}", line_no + 1))?;
        let label = if fields.len() > 3 {
            TableValue::String(fields[3..].join(" "))
        } else {
            TableValue::Null
        };

        table.push_row(vec![
            TableValue::Integer(z as i64),
            TableValue::Integer(ion_charge),
            TableValue::Integer(index),
            TableValue::Float(energy),
            TableValue::Float(j),
            label,
        ])?;
    }

    Ok(indices)
}

/// Parse one ion's transition list (`lower upper <x> <y>` records); both
/// the line and collision files share this shape.
fn parse_transitions(
    text: &str,
    z: u32,
    ion_charge: i64,
    level_indices: &BTreeSet<i64>,
    third_field: &str,
    table: &mut DataTable,
) -> Result<()> {
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            bail!("line {}: expected 4 fields, got {}", line_no + 1, fields.len());
        }

        let lower: i64 = fields[0]
            .parse()
            .with_context(|| format!("line {}: bad lower index '{}'", line_no + 1, fields[0]))?;
        let upper: i64 = fields[1]
            .parse()
            .with_context(|| format!("line {}: bad upper index '{}'", line_no + 1, fields[1]))?;
        for index in [lower, upper] {
            if !level_indices.contains(&index) {
                bail!("line {}: undefined level index {index}", line_no + 1);
            }
        }

        let third = parse_numeric(fields[2], third_field)
            .with_context(|| format!("line {}", line_no + 1))?;
        let fourth = parse_numeric(fields[3], "value")
            .with_context(|| format!("line {}", line_no + 1))?;

        table.push_row(vec![
            TableValue::Integer(z as i64),
            TableValue::Integer(ion_charge),
            TableValue::Integer(lower),
            TableValue::Integer(upper),
            TableValue::Float(third),
            TableValue::Float(fourth),
        ])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_ion(dir: &Path, name: &str, levels: &str, lines: &str, collisions: Option<&str>) {
        fs::write(dir.join(format!("{name}.levels")), levels).unwrap();
        fs::write(dir.join(format!("{name}.lines")), lines).unwrap();
        if let Some(c) = collisions {
            fs::write(dir.join(format!("{name}.collisions")), c).unwrap();
        }
    }

    fn sample_db() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_ion(
            dir.path(),
            "h_1",
            "# index energy j label\n0 0.0 0.5 1s 2S1/2\n1 82259.158 0.5 2p 2P1/2\n",
            "0 1 121.567 0.4164\n",
            Some("0 1 10000.0 0.29\n"),
        );
        write_ion(
            dir.path(),
            "he_2",
            "0 0.0 0.5\n1 329179.3 0.5\n",
            "0 1 30.378 0.1387\n",
            None,
        );
        dir
    }

    #[test]
    fn reads_every_ion_in_range() {
        let dir = sample_db();
        let range = ElementRange::parse("H-He").unwrap();
        let reader = ChiantiReader::new(range, dir.path(), true, 20);
        let source = reader.read().unwrap();

        let levels = source.section("levels").unwrap();
        assert_eq!(levels.len(), 4);
        let lines = source.section("lines").unwrap();
        assert_eq!(lines.len(), 2);
        // h_1 has a collision file, he_2 does not.
        let collisions = source.section("collisions").unwrap();
        assert_eq!(collisions.len(), 1);

        // Label with embedded spaces survives as one value.
        let label_idx = levels.column_index("label").unwrap();
        let labels: Vec<Option<&str>> =
            levels.rows.iter().map(|r| r[label_idx].as_str()).collect();
        assert!(labels.contains(&Some("1s 2S1/2")));
    }

    #[test]
    fn collisions_flag_off_drops_the_section() {
        let dir = sample_db();
        let range = ElementRange::parse("H-He").unwrap();
        let reader = ChiantiReader::new(range, dir.path(), false, 20);
        let source = reader.read().unwrap();
        assert!(source.section("collisions").is_none());
        assert!(source.section("levels").is_some());
    }

    #[test]
    fn range_excludes_ions_outside_span() {
        let dir = sample_db();
        let range = ElementRange::parse("H").unwrap();
        let reader = ChiantiReader::new(range, dir.path(), true, 20);
        let source = reader.read().unwrap();
        let levels = source.section("levels").unwrap();
        assert!(levels.rows.iter().all(|r| r[0].as_i64() == Some(1)));
    }

    #[test]
    fn undefined_level_reference_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_ion(dir.path(), "h_1", "0 0.0 0.5\n", "0 7 121.567 0.4164\n", None);
        let range = ElementRange::parse("H").unwrap();
        let reader = ChiantiReader::new(range, dir.path(), false, 20);
        assert!(reader.read().is_err());
    }
}
