use anyhow::{Context, Result, bail};

use crate::data::model::{DataTable, Provenance, SourceKind, SourceTable, TableValue};
use crate::fetch;
use crate::readers::{DEFAULT_PRIORITY, parse_numeric};

// ---------------------------------------------------------------------------
// Zeta reader (Knox–Long ground-state recombination fractions)
// ---------------------------------------------------------------------------

/// Reads the Knox–Long zeta table: a `#`-comment header declares the
/// temperature grid, then one row per ion with one zeta value per
/// temperature:
///
/// ```text
/// # Knox & Long ground-state recombination fractions
/// # T[K]: 2000 4000 6000
/// 1 1 0.339 0.254 0.211
/// ```
///
/// The output is long-form: one row per (ion, temperature). No
/// configuration; the whole table is always read.
pub struct ZetaReader {
    source: String,
}

impl ZetaReader {
    pub fn new(source: impl Into<String>) -> Self {
        ZetaReader {
            source: source.into(),
        }
    }

    /// Fetch and parse the zeta table.
    pub fn read(&self) -> Result<SourceTable> {
        log::info!("parsing zeta data from {}", self.source);
        let (text, checksum) = fetch::fetch_source_text(&self.source)?;
        let table = parse_zeta(&text)
            .with_context(|| format!("parsing zeta data from {}", self.source))?;

        let mut source = SourceTable::new(
            SourceKind::Zeta,
            Provenance {
                location: self.source.clone(),
                checksum: Some(checksum),
                priority: DEFAULT_PRIORITY,
            },
        );
        source.insert_section("zeta", table);
        Ok(source)
    }
}

/// Parse the wide upstream table into long form:
/// atomic_number, ion_charge, temperature, zeta.
fn parse_zeta(text: &str) -> Result<DataTable> {
    let mut temperatures: Option<Vec<f64>> = None;
    let mut table = DataTable::new(["atomic_number", "ion_charge", "temperature", "zeta"]);

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            // The temperature grid lives in a "T[K]:" comment.
            if let Some(grid) = comment.trim().strip_prefix("T[K]:") {
                let temps = grid
                    .split_whitespace()
                    .map(|t| parse_numeric(t, "temperature"))
                    .collect::<Result<Vec<f64>>>()
                    .with_context(|| format!("line {}", line_no + 1))?;
                if temps.is_empty() {
                    bail!("line {}: empty temperature grid", line_no + 1);
                }
                temperatures = Some(temps);
            }
            continue;
        }

        let temps = temperatures
            .as_ref()
            .with_context(|| format!("line {}: data before the T[K] header", line_no + 1))?;

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != temps.len() + 2 {
            bail!(
                "line {}: expected {} fields (z, ion, {} zeta values), got {}",
                line_no + 1,
                temps.len() + 2,
                temps.len(),
                fields.len()
            );
        }

        let z: i64 = fields[0]
            .parse()
            .with_context(|| format!("line {}: bad atomic number '{}'", line_no + 1, fields[0]))?;
        let ion: i64 = fields[1]
            .parse()
            .with_context(|| format!("line {}: bad ion charge '{}'", line_no + 1, fields[1]))?;

        for (temp, field) in temps.iter().zip(&fields[2..]) {
            let zeta = parse_numeric(field, "zeta")
                .with_context(|| format!("line {}", line_no + 1))?;
            table.push_row(vec![
                TableValue::Integer(z),
                TableValue::Integer(ion),
                TableValue::Float(*temp),
                TableValue::Float(zeta),
            ])?;
        }
    }

    table.sort_rows();
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Knox & Long ground-state recombination fractions
# T[K]: 2000 4000 6000
2 1 0.581 0.413 0.344
1 1 0.339 0.254 0.211
";

    #[test]
    fn melts_to_long_form_and_sorts() {
        let table = parse_zeta(SAMPLE).unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(
            table.columns,
            vec!["atomic_number", "ion_charge", "temperature", "zeta"]
        );

        // Sorted: hydrogen first despite appearing second in the input.
        let first = &table.rows[0];
        assert_eq!(first[0].as_i64(), Some(1));
        assert_eq!(first[2].as_f64(), Some(2000.0));
        assert_eq!(first[3].as_f64(), Some(0.339));
    }

    #[test]
    fn wrong_arity_row_is_an_error() {
        let text = "# T[K]: 2000 4000\n1 1 0.339\n";
        assert!(parse_zeta(text).is_err());
    }

    #[test]
    fn data_before_header_is_an_error() {
        let text = "1 1 0.339\n# T[K]: 2000\n";
        assert!(parse_zeta(text).is_err());
    }
}
