use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};

use crate::data::model::{DataTable, Provenance, SourceKind, SourceTable, TableValue};
use crate::elements::{self, ElementRange};
use crate::fetch;
use crate::readers::{DEFAULT_PRIORITY, parse_numeric};

// ---------------------------------------------------------------------------
// Atomic weights reader (NIST linearized isotope-composition format)
// ---------------------------------------------------------------------------

/// Reads the NIST linearized atomic-weights/isotope-composition listing and
/// reduces it to one standard weight per element.
///
/// Input format: blank-line-separated isotope records of `Key = value`
/// lines, e.g.
///
/// ```text
/// Atomic Number = 1
/// Atomic Symbol = H
/// Mass Number = 1
/// Relative Atomic Mass = 1.00782503224(9)
/// Isotopic Composition = 0.999885(70)
/// Standard Atomic Weight = [1.00784,1.00811]
/// ```
pub struct WeightsReader {
    range: ElementRange,
    source: String,
}

impl WeightsReader {
    pub fn new(range: ElementRange, source: impl Into<String>) -> Self {
        WeightsReader {
            range,
            source: source.into(),
        }
    }

    /// Fetch and parse the listing, scoped to the configured range.
    pub fn read(&self) -> Result<SourceTable> {
        log::info!("parsing atomic weights ({}) from {}", self.range, self.source);
        let (text, checksum) = fetch::fetch_source_text(&self.source)?;
        let table = parse_weights(&text, self.range)
            .with_context(|| format!("parsing atomic weights from {}", self.source))?;

        let mut source = SourceTable::new(
            SourceKind::AtomicWeights,
            Provenance {
                location: self.source.clone(),
                checksum: Some(checksum),
                priority: DEFAULT_PRIORITY,
            },
        );
        source.insert_section("weights", table);
        Ok(source)
    }
}

struct Isotope {
    mass: f64,
    composition: Option<f64>,
}

/// Parse the linearized listing into a `weights` table:
/// atomic_number, symbol, mass.
fn parse_weights(text: &str, range: ElementRange) -> Result<DataTable> {
    // element → (isotopes, standard atomic weight field)
    let mut per_element: BTreeMap<u32, (Vec<Isotope>, Option<String>)> = BTreeMap::new();

    for (i, record) in text.split("\n\n").enumerate() {
        let fields = parse_record(record)
            .with_context(|| format!("isotope record {i}"))?;
        if fields.is_empty() {
            continue; // trailing blank block
        }

        let z_field = fields
            .get("Atomic Number")
            .with_context(|| format!("isotope record {i}: missing 'Atomic Number'"))?;
        let z: u32 = z_field
            .parse()
            .with_context(|| format!("isotope record {i}: bad atomic number '{z_field}'"))?;
        if !range.contains(z) {
            continue;
        }

        let entry = per_element.entry(z).or_insert_with(|| (Vec::new(), None));

        if let Some(mass_field) = fields.get("Relative Atomic Mass") {
            let mass = parse_numeric(mass_field, "Relative Atomic Mass")?;
            let composition = match fields.get("Isotopic Composition") {
                Some(c) if !c.is_empty() => Some(parse_numeric(c, "Isotopic Composition")?),
                _ => None,
            };
            entry.0.push(Isotope { mass, composition });
        }

        if entry.1.is_none() {
            if let Some(weight) = fields.get("Standard Atomic Weight") {
                if !weight.is_empty() {
                    entry.1 = Some(weight.clone());
                }
            }
        }
    }

    let mut table = DataTable::new(["atomic_number", "symbol", "mass"]);
    for (z, (isotopes, standard_weight)) in per_element {
        let mass = element_mass(z, &isotopes, standard_weight.as_deref())?;
        let symbol = elements::symbol(z)
            .with_context(|| format!("atomic number {z} outside the symbol table"))?;
        table.push_row(vec![
            TableValue::Integer(z as i64),
            TableValue::String(symbol.to_string()),
            TableValue::Float(mass),
        ])?;
    }
    table.sort_rows();
    Ok(table)
}

/// Split one record into its `Key = value` fields.
fn parse_record(record: &str) -> Result<BTreeMap<String, String>> {
    let mut fields = BTreeMap::new();
    for line in record.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .with_context(|| format!("line '{line}' is not 'Key = value'"))?;
        fields.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(fields)
}

/// One standard weight per element: abundance-weighted mean over isotopes
/// with known composition, else the quoted standard atomic weight
/// (midpoint for interval notation `[a,b]`).
fn element_mass(z: u32, isotopes: &[Isotope], standard_weight: Option<&str>) -> Result<f64> {
    let weighted: Vec<(f64, f64)> = isotopes
        .iter()
        .filter_map(|iso| iso.composition.map(|c| (iso.mass, c)))
        .filter(|(_, c)| *c > 0.0)
        .collect();

    let total: f64 = weighted.iter().map(|(_, c)| c).sum();
    if total > 0.0 {
        return Ok(weighted.iter().map(|(m, c)| m * c).sum::<f64>() / total);
    }

    match standard_weight {
        Some(w) if w.contains(',') => {
            let inner = w.trim().trim_matches(|c| matches!(c, '[' | ']'));
            let (lo, hi) = inner
                .split_once(',')
                .with_context(|| format!("element {z}: bad weight interval '{w}'"))?;
            let lo = parse_numeric(lo, "weight interval low")?;
            let hi = parse_numeric(hi, "weight interval high")?;
            Ok((lo + hi) / 2.0)
        }
        Some(w) => parse_numeric(w, "Standard Atomic Weight"),
        None => bail!("element {z}: no isotopic composition and no standard weight"),
    }
}
