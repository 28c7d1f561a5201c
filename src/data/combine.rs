use std::collections::BTreeSet;

use anyhow::{Context, Result, bail};

use super::model::{
    CombinedDataset, DataTable, SourceKind, SourceSet, SourceTable, TableValue,
};

// ---------------------------------------------------------------------------
// Combine trait
// ---------------------------------------------------------------------------

/// Merge five acquired sources into one combined dataset.
///
/// The pipeline is generic over this trait so its contract can be checked
/// against a recording double.
pub trait Combine {
    fn combine(&self, sources: &SourceSet) -> Result<CombinedDataset>;
}

// ---------------------------------------------------------------------------
// AtomCombiner – the production merge policy
// ---------------------------------------------------------------------------

/// The production combiner.
///
/// Weights, ionization energies and zeta data pass through unchanged. The
/// level/line data of the line-list source and the levels/lines source can
/// overlap per ion; for each (atomic number, ion charge) both sources
/// cover, the source with the higher priority keeps the ion. On a priority
/// tie the levels/lines source wins.
pub struct AtomCombiner;

impl Combine for AtomCombiner {
    fn combine(&self, sources: &SourceSet) -> Result<CombinedDataset> {
        let mut combined = CombinedDataset::default();

        combined.insert_table(
            "atom_data",
            required_section(&sources.weights, "weights")?.clone(),
        );
        combined.insert_table(
            "ionization_data",
            required_section(&sources.ionization, "ionization_energies")?.clone(),
        );

        let (levels, lines) = merge_levels_lines(&sources.lines, &sources.levels)?;
        log::info!(
            "merged levels/lines: {} levels, {} lines",
            levels.len(),
            lines.len()
        );
        combined.insert_table("levels", levels);
        combined.insert_table("lines", lines);

        if let Some(collisions) = sources.levels.section("collisions") {
            combined.insert_table("collisions", collisions.clone());
        }

        combined.insert_table("zeta_data", required_section(&sources.zeta, "zeta")?.clone());
        combined.insert_table("meta", meta_table(sources));

        Ok(combined)
    }
}

fn required_section<'a>(source: &'a SourceTable, name: &str) -> Result<&'a DataTable> {
    source
        .section(name)
        .with_context(|| format!("{} source is missing its '{name}' section", source.kind))
}

fn required_column(table: &DataTable, name: &str, what: &str) -> Result<usize> {
    table
        .column_index(name)
        .with_context(|| format!("{what} is missing column '{name}'"))
}

/// The (atomic number, ion charge) pairs a table covers.
fn ions_of(table: &DataTable, what: &str) -> Result<BTreeSet<(i64, i64)>> {
    let z_idx = required_column(table, "atomic_number", what)?;
    let charge_idx = required_column(table, "ion_charge", what)?;

    let mut ions = BTreeSet::new();
    for row in &table.rows {
        let z = row[z_idx]
            .as_i64()
            .with_context(|| format!("{what}: non-integer atomic_number"))?;
        let charge = row[charge_idx]
            .as_i64()
            .with_context(|| format!("{what}: non-integer ion_charge"))?;
        ions.insert((z, charge));
    }
    Ok(ions)
}

/// Per-ion overlap resolution between the line-list and levels/lines
/// sources, producing unified `levels` and `lines` tables.
fn merge_levels_lines(
    line_list: &SourceTable,
    levels_lines: &SourceTable,
) -> Result<(DataTable, DataTable)> {
    let ll_levels = required_section(line_list, "levels")?;
    let ll_lines = required_section(line_list, "lines")?;
    let sp_levels = required_section(levels_lines, "levels")?;
    let sp_lines = required_section(levels_lines, "lines")?;

    let ll_ions = ions_of(ll_levels, "line-list levels")?;
    let sp_ions = ions_of(sp_levels, "levels/lines levels")?;
    let overlap: BTreeSet<(i64, i64)> = ll_ions.intersection(&sp_ions).copied().collect();

    // Higher priority keeps an overlapped ion; ties go to the
    // levels/lines source.
    let levels_lines_wins = levels_lines.provenance.priority >= line_list.provenance.priority;
    let (ll_dropped, sp_dropped) = if levels_lines_wins {
        (overlap.clone(), BTreeSet::new())
    } else {
        (BTreeSet::new(), overlap.clone())
    };
    if !overlap.is_empty() {
        log::info!(
            "{} overlapping ions resolved in favour of {}",
            overlap.len(),
            if levels_lines_wins {
                levels_lines.kind
            } else {
                line_list.kind
            }
        );
    }

    let mut levels = DataTable::new([
        "atomic_number",
        "ion_charge",
        "level_index",
        "energy",
        "j",
        "label",
        "source",
    ]);
    copy_levels(ll_levels, &ll_dropped, SourceKind::LineList, &mut levels)?;
    copy_levels(sp_levels, &sp_dropped, SourceKind::LevelsLines, &mut levels)?;
    levels.sort_rows();

    let mut lines = DataTable::new([
        "atomic_number",
        "ion_charge",
        "level_index_lower",
        "level_index_upper",
        "wavelength",
        "gf",
        "source",
    ]);
    copy_lines(ll_lines, &ll_dropped, SourceKind::LineList, &mut lines)?;
    copy_lines(sp_lines, &sp_dropped, SourceKind::LevelsLines, &mut lines)?;
    lines.sort_rows();

    Ok((levels, lines))
}

/// Copy one source's level rows into the unified table, skipping dropped
/// ions. Sources without a label column contribute Null labels.
fn copy_levels(
    input: &DataTable,
    dropped: &BTreeSet<(i64, i64)>,
    kind: SourceKind,
    output: &mut DataTable,
) -> Result<()> {
    let what = "levels";
    let z_idx = required_column(input, "atomic_number", what)?;
    let charge_idx = required_column(input, "ion_charge", what)?;
    let index_idx = required_column(input, "level_index", what)?;
    let energy_idx = required_column(input, "energy", what)?;
    let j_idx = required_column(input, "j", what)?;
    let label_idx = input.column_index("label");

    for row in &input.rows {
        let ion = ion_key(row, z_idx, charge_idx, what)?;
        if dropped.contains(&ion) {
            continue;
        }
        output.push_row(vec![
            row[z_idx].clone(),
            row[charge_idx].clone(),
            row[index_idx].clone(),
            row[energy_idx].clone(),
            row[j_idx].clone(),
            label_idx.map_or(TableValue::Null, |i| row[i].clone()),
            TableValue::String(kind.label().to_string()),
        ])?;
    }
    Ok(())
}

/// Copy one source's line rows into the unified table, skipping dropped
/// ions. Line-list sources quote log gf; it is converted to gf here so the
/// unified table carries one strength convention.
fn copy_lines(
    input: &DataTable,
    dropped: &BTreeSet<(i64, i64)>,
    kind: SourceKind,
    output: &mut DataTable,
) -> Result<()> {
    let what = "lines";
    let z_idx = required_column(input, "atomic_number", what)?;
    let charge_idx = required_column(input, "ion_charge", what)?;
    let lower_idx = required_column(input, "level_index_lower", what)?;
    let upper_idx = required_column(input, "level_index_upper", what)?;
    let wavelength_idx = required_column(input, "wavelength", what)?;

    let gf_idx = input.column_index("gf");
    let log_gf_idx = input.column_index("log_gf");
    if gf_idx.is_none() && log_gf_idx.is_none() {
        bail!("lines table has neither 'gf' nor 'log_gf'");
    }

    for row in &input.rows {
        let ion = ion_key(row, z_idx, charge_idx, what)?;
        if dropped.contains(&ion) {
            continue;
        }

        let gf = if let Some(i) = gf_idx {
            row[i].clone()
        } else {
            let log_gf = row[log_gf_idx.unwrap()]
                .as_f64()
                .context("lines: non-numeric log_gf")?;
            TableValue::Float(10f64.powf(log_gf))
        };

        output.push_row(vec![
            row[z_idx].clone(),
            row[charge_idx].clone(),
            row[lower_idx].clone(),
            row[upper_idx].clone(),
            row[wavelength_idx].clone(),
            gf,
            TableValue::String(kind.label().to_string()),
        ])?;
    }
    Ok(())
}

fn ion_key(
    row: &[TableValue],
    z_idx: usize,
    charge_idx: usize,
    what: &str,
) -> Result<(i64, i64)> {
    let z = row[z_idx]
        .as_i64()
        .with_context(|| format!("{what}: non-integer atomic_number"))?;
    let charge = row[charge_idx]
        .as_i64()
        .with_context(|| format!("{what}: non-integer ion_charge"))?;
    Ok((z, charge))
}

/// One provenance row per source, in positional order.
fn meta_table(sources: &SourceSet) -> DataTable {
    let mut meta = DataTable::new(["source", "location", "checksum", "priority"]);
    for source in sources.iter() {
        let checksum = source
            .provenance
            .checksum
            .clone()
            .map_or(TableValue::Null, TableValue::String);
        // Arity is fixed here, so the push cannot fail.
        meta.push_row(vec![
            TableValue::String(source.kind.label().to_string()),
            TableValue::String(source.provenance.location.clone()),
            checksum,
            TableValue::Integer(source.provenance.priority),
        ])
        .expect("meta row arity");
    }
    meta
}
