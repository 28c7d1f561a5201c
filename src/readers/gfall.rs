use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::data::model::{DataTable, Provenance, SourceKind, SourceTable, TableValue};
use crate::elements::ElementRange;
use crate::fetch;
use crate::readers::parse_numeric;

// ---------------------------------------------------------------------------
// Line-list reader (Kurucz gfall-style)
// ---------------------------------------------------------------------------

/// Parses a Kurucz-style line list that has been staged to a local file.
///
/// One whitespace-separated record per transition:
///
/// ```text
/// # wavelength  log_gf  code   e_lower     j_lo  e_upper      j_up
///    72.5230    -3.790  26.00  45833.710   3.5   183651.630   4.5
/// ```
///
/// The element code encodes element and ion charge as `ZZ.II` (`26.01` is
/// singly-ionized iron). Besides the per-transition `lines` section, a
/// `levels` section is derived from the unique (energy, J) pairs of each
/// ion, indexed in energy order.
pub struct GfallReader {
    range: ElementRange,
    priority: i64,
}

impl GfallReader {
    pub fn new(range: ElementRange, priority: i64) -> Self {
        GfallReader { range, priority }
    }

    /// Parse the staged line-list file, scoped to the configured range.
    pub fn read(&self, path: &Path) -> Result<SourceTable> {
        log::info!("parsing line list ({}) from {}", self.range, path.display());
        let bytes =
            fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let checksum = fetch::sha256_hex(&bytes);
        let text = String::from_utf8(bytes)
            .with_context(|| format!("{} is not valid UTF-8", path.display()))?;

        let (levels, lines) = parse_gfall(&text, self.range)
            .with_context(|| format!("parsing line list from {}", path.display()))?;

        let mut source = SourceTable::new(
            SourceKind::LineList,
            Provenance {
                location: path.display().to_string(),
                checksum: Some(checksum),
                priority: self.priority,
            },
        );
        source.insert_section("levels", levels);
        source.insert_section("lines", lines);
        Ok(source)
    }
}

struct RawLine {
    z: u32,
    ion: i64,
    wavelength: f64,
    log_gf: f64,
    e_lower: f64,
    j_lower: f64,
    e_upper: f64,
    j_upper: f64,
}

/// Split a `ZZ.II` element code into (atomic number, ion charge).
fn parse_element_code(code: &str) -> Result<(u32, i64)> {
    let (z_part, ion_part) = code
        .split_once('.')
        .with_context(|| format!("element code '{code}' is not 'ZZ.II'"))?;
    let z: u32 = z_part
        .parse()
        .with_context(|| format!("element code '{code}': bad atomic number"))?;
    let ion: i64 = ion_part
        .parse()
        .with_context(|| format!("element code '{code}': bad ion charge"))?;
    Ok((z, ion))
}

/// Parse the staged text into derived `levels` and per-transition `lines`
/// tables.
fn parse_gfall(text: &str, range: ElementRange) -> Result<(DataTable, DataTable)> {
    let mut raw = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 7 {
            bail!(
                "line {}: expected 7 fields, got {}",
                line_no + 1,
                fields.len()
            );
        }

        let (z, ion) = parse_element_code(fields[2])
            .with_context(|| format!("line {}", line_no + 1))?;
        if !range.contains(z) {
            continue;
        }

        let ctx = |what: &str| format!("line {}: {what}", line_no + 1);
        raw.push(RawLine {
            z,
            ion,
            wavelength: parse_numeric(fields[0], "wavelength").with_context(|| ctx("wavelength"))?,
            log_gf: parse_numeric(fields[1], "log gf").with_context(|| ctx("log gf"))?,
            e_lower: parse_numeric(fields[3], "lower energy").with_context(|| ctx("lower energy"))?,
            j_lower: parse_numeric(fields[4], "lower J").with_context(|| ctx("lower J"))?,
            e_upper: parse_numeric(fields[5], "upper energy").with_context(|| ctx("upper energy"))?,
            j_upper: parse_numeric(fields[6], "upper J").with_context(|| ctx("upper J"))?,
        });
    }

    // Unique (energy, J) pairs per ion, in energy order.
    let mut per_ion: BTreeMap<(u32, i64), Vec<(f64, f64)>> = BTreeMap::new();
    for line in &raw {
        let levels = per_ion.entry((line.z, line.ion)).or_default();
        levels.push((line.e_lower, line.j_lower));
        levels.push((line.e_upper, line.j_upper));
    }

    let mut levels_table =
        DataTable::new(["atomic_number", "ion_charge", "level_index", "energy", "j"]);
    // (z, ion) → (energy bits, J bits) → level index
    let mut index_of: BTreeMap<(u32, i64), BTreeMap<(u64, u64), i64>> = BTreeMap::new();

    for ((z, ion), mut levels) in per_ion {
        levels.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        levels.dedup_by(|a, b| a.0 == b.0 && a.1 == b.1);

        let ion_index = index_of.entry((z, ion)).or_default();
        for (i, (energy, j)) in levels.iter().enumerate() {
            ion_index.insert((energy.to_bits(), j.to_bits()), i as i64);
            levels_table.push_row(vec![
                TableValue::Integer(z as i64),
                TableValue::Integer(ion),
                TableValue::Integer(i as i64),
                TableValue::Float(*energy),
                TableValue::Float(*j),
            ])?;
        }
    }

    let mut lines_table = DataTable::new([
        "atomic_number",
        "ion_charge",
        "level_index_lower",
        "level_index_upper",
        "wavelength",
        "log_gf",
        "energy_lower",
        "j_lower",
        "energy_upper",
        "j_upper",
    ]);

    for line in &raw {
        let ion_index = &index_of[&(line.z, line.ion)];
        let lower = ion_index[&(line.e_lower.to_bits(), line.j_lower.to_bits())];
        let upper = ion_index[&(line.e_upper.to_bits(), line.j_upper.to_bits())];
        lines_table.push_row(vec![
            TableValue::Integer(line.z as i64),
            TableValue::Integer(line.ion),
            TableValue::Integer(lower),
            TableValue::Integer(upper),
            TableValue::Float(line.wavelength),
            TableValue::Float(line.log_gf),
            TableValue::Float(line.e_lower),
            TableValue::Float(line.j_lower),
            TableValue::Float(line.e_upper),
            TableValue::Float(line.j_upper),
        ])?;
    }

    levels_table.sort_rows();
    lines_table.sort_rows();
    Ok((levels_table, lines_table))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# wavelength  log_gf  code   e_lower     j_lo  e_upper      j_up
   121.5670   -0.351   1.00       0.000   0.5   82259.158    1.5
   102.5722   -1.271   1.00       0.000   0.5   97492.304    1.5
   468.5704   -0.719   2.01  390140.800   2.5  411477.181    3.5
   593.4982    0.320  26.00   28604.611   4.0   45448.871    5.0
";

    #[test]
    fn element_code_maps_to_ion() {
        assert_eq!(parse_element_code("1.00").unwrap(), (1, 0));
        assert_eq!(parse_element_code("2.01").unwrap(), (2, 1));
        assert_eq!(parse_element_code("26.00").unwrap(), (26, 0));
        assert!(parse_element_code("26").is_err());
    }

    #[test]
    fn derives_indexed_levels_per_ion() {
        let range = ElementRange::parse("H-He").unwrap();
        let (levels, lines) = parse_gfall(SAMPLE, range).unwrap();

        // H I: ground level shared by both transitions → 3 unique levels.
        // He II: 2 unique levels.
        assert_eq!(levels.len(), 5);
        assert_eq!(lines.len(), 3);

        // Ground state of H I gets index 0.
        let first = &levels.rows[0];
        assert_eq!(first[0].as_i64(), Some(1));
        assert_eq!(first[2].as_i64(), Some(0));
        assert_eq!(first[3].as_f64(), Some(0.0));

        // Both H I lines share level_index_lower == 0.
        let lower_idx = lines.column_index("level_index_lower").unwrap();
        for row in lines.rows.iter().filter(|r| r[0].as_i64() == Some(1)) {
            assert_eq!(row[lower_idx].as_i64(), Some(0));
        }
    }

    #[test]
    fn range_scopes_ions_and_comments_are_skipped() {
        let range = ElementRange::parse("Fe").unwrap();
        let (levels, lines) = parse_gfall(SAMPLE, range).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(levels.len(), 2);
        assert_eq!(lines.rows[0][0].as_i64(), Some(26));
    }

    #[test]
    fn short_record_is_an_error() {
        let range = ElementRange::parse("H-Zn").unwrap();
        assert!(parse_gfall("121.5670 -0.351 1.00 0.0 0.5\n", range).is_err());
    }
}
