use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Result, bail};

// ---------------------------------------------------------------------------
// TableValue – a single cell in a data table
// ---------------------------------------------------------------------------

/// A dynamically-typed table cell mirroring the upstream tabular dtypes.
/// Tables are sorted for deterministic output so `TableValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum TableValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so rows of TableValue can be sorted --

impl Eq for TableValue {}

impl PartialOrd for TableValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TableValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use TableValue::*;
        fn discriminant(v: &TableValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for TableValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            TableValue::String(s) => s.hash(state),
            TableValue::Integer(i) => i.hash(state),
            TableValue::Float(f) => f.to_bits().hash(state),
            TableValue::Bool(b) => b.hash(state),
            TableValue::Null => {}
        }
    }
}

impl fmt::Display for TableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableValue::String(s) => write!(f, "{s}"),
            TableValue::Integer(i) => write!(f, "{i}"),
            TableValue::Float(v) => write!(f, "{v}"),
            TableValue::Bool(b) => write!(f, "{b}"),
            TableValue::Null => write!(f, "<null>"),
        }
    }
}

impl TableValue {
    /// Interpret the value as an `f64` where that loses nothing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TableValue::Float(v) => Some(*v),
            TableValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Interpret the value as an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TableValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Borrow the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TableValue::String(s) => Some(s),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// DataTable – named columns plus dynamically-typed rows
// ---------------------------------------------------------------------------

/// A small column-named table of [`TableValue`] rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    /// Ordered column names.
    pub columns: Vec<String>,
    /// Rows; every row has exactly `columns.len()` cells.
    pub rows: Vec<Vec<TableValue>>,
}

impl DataTable {
    /// Create an empty table with the given column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DataTable {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row, checking its arity against the column list.
    pub fn push_row(&mut self, row: Vec<TableValue>) -> Result<()> {
        if row.len() != self.columns.len() {
            bail!(
                "row has {} cells but table has {} columns",
                row.len(),
                self.columns.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Sort rows lexicographically; equal tables then serialize identically.
    pub fn sort_rows(&mut self) {
        self.rows.sort();
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Source kinds and provenance
// ---------------------------------------------------------------------------

/// The five kinds of upstream data source, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    AtomicWeights,
    IonizationEnergies,
    LineList,
    LevelsLines,
    Zeta,
}

impl SourceKind {
    /// Stable lower-case label, used in logs and the output meta table.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::AtomicWeights => "atomic_weights",
            SourceKind::IonizationEnergies => "ionization_energies",
            SourceKind::LineList => "line_list",
            SourceKind::LevelsLines => "levels_lines",
            SourceKind::Zeta => "zeta",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a source's bytes came from and what was read.
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    /// Local path or URL the source was read from.
    pub location: String,
    /// SHA-256 hex digest of the bytes read, when available.
    pub checksum: Option<String>,
    /// Priority used to resolve per-ion overlap between sources.
    pub priority: i64,
}

// ---------------------------------------------------------------------------
// SourceTable – one acquired source
// ---------------------------------------------------------------------------

/// One acquired source: named sections of tabular data plus provenance.
///
/// The levels/lines source, for example, carries `levels`, `lines` and
/// (optionally) `collisions` sections; most sources carry a single section.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub kind: SourceKind,
    pub provenance: Provenance,
    pub sections: BTreeMap<String, DataTable>,
}

impl SourceTable {
    pub fn new(kind: SourceKind, provenance: Provenance) -> Self {
        SourceTable {
            kind,
            provenance,
            sections: BTreeMap::new(),
        }
    }

    /// Insert (or replace) a named section.
    pub fn insert_section(&mut self, name: impl Into<String>, table: DataTable) {
        self.sections.insert(name.into(), table);
    }

    /// Look up a section by name.
    pub fn section(&self, name: &str) -> Option<&DataTable> {
        self.sections.get(name)
    }

    /// Total row count across all sections.
    pub fn row_count(&self) -> usize {
        self.sections.values().map(DataTable::len).sum()
    }
}

// ---------------------------------------------------------------------------
// SourceSet – the five sources, positional
// ---------------------------------------------------------------------------

/// Exactly five acquired sources in the fixed pipeline order.
///
/// Constructed only after every acquisition succeeded; there is no partial
/// state.
#[derive(Debug, Clone)]
pub struct SourceSet {
    pub weights: SourceTable,
    pub ionization: SourceTable,
    pub lines: SourceTable,
    pub levels: SourceTable,
    pub zeta: SourceTable,
}

impl SourceSet {
    /// Expected kinds in positional order.
    pub const ORDER: [SourceKind; 5] = [
        SourceKind::AtomicWeights,
        SourceKind::IonizationEnergies,
        SourceKind::LineList,
        SourceKind::LevelsLines,
        SourceKind::Zeta,
    ];

    /// Assemble the set from sources acquired in pipeline order.
    pub fn from_acquired(acquired: Vec<SourceTable>) -> Result<Self> {
        if acquired.len() != Self::ORDER.len() {
            bail!(
                "expected {} acquired sources, got {}",
                Self::ORDER.len(),
                acquired.len()
            );
        }
        for (source, expected) in acquired.iter().zip(Self::ORDER) {
            if source.kind != expected {
                bail!("expected {} source, got {}", expected, source.kind);
            }
        }

        let mut it = acquired.into_iter();
        Ok(SourceSet {
            weights: it.next().unwrap(),
            ionization: it.next().unwrap(),
            lines: it.next().unwrap(),
            levels: it.next().unwrap(),
            zeta: it.next().unwrap(),
        })
    }

    /// Iterate the sources in positional order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceTable> {
        [
            &self.weights,
            &self.ionization,
            &self.lines,
            &self.levels,
            &self.zeta,
        ]
        .into_iter()
    }
}

// ---------------------------------------------------------------------------
// CombinedDataset – the merged output
// ---------------------------------------------------------------------------

/// The merged atomic dataset: output table name → table.
///
/// Produced by the combiner; its only output operation is
/// [`CombinedDataset::write_parquet`](crate::data::writer).
#[derive(Debug, Clone, Default)]
pub struct CombinedDataset {
    pub tables: BTreeMap<String, DataTable>,
}

impl CombinedDataset {
    /// Insert (or replace) an output table.
    pub fn insert_table(&mut self, name: impl Into<String>, table: DataTable) {
        self.tables.insert(name.into(), table);
    }

    /// Look up an output table by name.
    pub fn table(&self, name: &str) -> Option<&DataTable> {
        self.tables.get(name)
    }
}
