use anyhow::{Context, Result, bail};

use crate::data::model::{DataTable, Provenance, SourceKind, SourceTable, TableValue};
use crate::elements::ElementRange;
use crate::fetch;
use crate::readers::{DEFAULT_PRIORITY, parse_numeric};

// ---------------------------------------------------------------------------
// Ionization energies reader (NIST pipe-delimited ground-states table)
// ---------------------------------------------------------------------------

/// Reads the NIST ionization-energies listing: a pipe-delimited table with
/// a header row and `----` separator lines, e.g.
///
/// ```text
/// At. Num | Sp. Name | Ion Charge | Ionization Energy (eV) |
/// --------|----------|------------|------------------------|
///       1 | H I      |          0 | 13.598434599702        |
/// ```
///
/// Interpolated `(…)` and theoretical `[…]` energies are accepted and
/// stripped to their numeric value.
pub struct IonizationReader {
    range: ElementRange,
    source: String,
}

impl IonizationReader {
    pub fn new(range: ElementRange, source: impl Into<String>) -> Self {
        IonizationReader {
            range,
            source: source.into(),
        }
    }

    /// Fetch and parse the listing, scoped to the configured range.
    pub fn read(&self) -> Result<SourceTable> {
        log::info!(
            "parsing ionization energies ({}) from {}",
            self.range,
            self.source
        );
        let (text, checksum) = fetch::fetch_source_text(&self.source)?;
        let table = parse_ionization(&text, self.range)
            .with_context(|| format!("parsing ionization energies from {}", self.source))?;

        let mut source = SourceTable::new(
            SourceKind::IonizationEnergies,
            Provenance {
                location: self.source.clone(),
                checksum: Some(checksum),
                priority: DEFAULT_PRIORITY,
            },
        );
        source.insert_section("ionization_energies", table);
        Ok(source)
    }
}

/// Parse the pipe-delimited listing into an `ionization_energies` table:
/// atomic_number, ion_charge, ionization_energy.
fn parse_ionization(text: &str, range: ElementRange) -> Result<DataTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .comment(Some(b'-'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("reading header row")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let z_idx = headers
        .iter()
        .position(|h| h == "At. Num")
        .context("missing 'At. Num' column")?;
    let charge_idx = headers
        .iter()
        .position(|h| h == "Ion Charge")
        .context("missing 'Ion Charge' column")?;
    let energy_idx = headers
        .iter()
        .position(|h| h.starts_with("Ionization Energy"))
        .context("missing 'Ionization Energy' column")?;

    let mut table = DataTable::new(["atomic_number", "ion_charge", "ionization_energy"]);

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("row {row_no}"))?;

        let z_field = record.get(z_idx).unwrap_or("");
        if z_field.is_empty() {
            continue; // ruled-off or blank line
        }
        let z: u32 = z_field
            .parse()
            .with_context(|| format!("row {row_no}: bad atomic number '{z_field}'"))?;
        if !range.contains(z) {
            continue;
        }

        let charge_field = record.get(charge_idx).unwrap_or("");
        let charge: i64 = charge_field
            .parse()
            .with_context(|| format!("row {row_no}: bad ion charge '{charge_field}'"))?;

        let energy_field = record.get(energy_idx).unwrap_or("");
        if energy_field.is_empty() {
            bail!("row {row_no}: missing ionization energy");
        }
        let energy = parse_numeric(energy_field, "ionization energy")
            .with_context(|| format!("row {row_no}"))?;

        table.push_row(vec![
            TableValue::Integer(z as i64),
            TableValue::Integer(charge),
            TableValue::Float(energy),
        ])?;
    }

    table.sort_rows();
    Ok(table)
}
