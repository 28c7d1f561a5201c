use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Chemical element symbols, H (1) through U (92)
// ---------------------------------------------------------------------------

/// Element symbols indexed by `atomic_number - 1`.
pub const SYMBOLS: [&str; 92] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al",
    "Si", "P", "S", "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe",
    "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb", "Sr",
    "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In", "Sn",
    "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm",
    "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W",
    "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At", "Rn",
    "Fr", "Ra", "Ac", "Th", "Pa", "U",
];

/// Symbol for an atomic number, if it is within the supported table.
pub fn symbol(atomic_number: u32) -> Option<&'static str> {
    if atomic_number == 0 {
        return None;
    }
    SYMBOLS.get(atomic_number as usize - 1).copied()
}

/// Atomic number for a symbol (case-insensitive), if known.
pub fn atomic_number(symbol: &str) -> Option<u32> {
    SYMBOLS
        .iter()
        .position(|s| s.eq_ignore_ascii_case(symbol))
        .map(|i| i as u32 + 1)
}

// ---------------------------------------------------------------------------
// ElementRange – inclusive "First-Last" span of elements
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("empty element range")]
    Empty,
    #[error("unknown element symbol '{0}'")]
    UnknownSymbol(String),
    #[error("inverted element range: {first} comes after {last}")]
    Inverted { first: String, last: String },
}

/// Inclusive span of chemical elements by atomic number.
///
/// Parsed from a `"First-Last"` string such as `"H-Zn"`; a bare symbol
/// (`"Si"`) denotes the single-element span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementRange {
    first: u32,
    last: u32,
}

impl ElementRange {
    /// Parse a range specification like `"H-Zn"` or `"Si"`.
    pub fn parse(spec: &str) -> Result<Self, RangeError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(RangeError::Empty);
        }

        let (first_sym, last_sym) = match spec.split_once('-') {
            Some((a, b)) => (a.trim(), b.trim()),
            None => (spec, spec),
        };

        let first = atomic_number(first_sym)
            .ok_or_else(|| RangeError::UnknownSymbol(first_sym.to_string()))?;
        let last = atomic_number(last_sym)
            .ok_or_else(|| RangeError::UnknownSymbol(last_sym.to_string()))?;

        if first > last {
            return Err(RangeError::Inverted {
                first: first_sym.to_string(),
                last: last_sym.to_string(),
            });
        }

        Ok(ElementRange { first, last })
    }

    /// First atomic number of the span.
    pub fn first(&self) -> u32 {
        self.first
    }

    /// Last atomic number of the span.
    pub fn last(&self) -> u32 {
        self.last
    }

    /// Whether an atomic number falls inside the span.
    pub fn contains(&self, atomic_number: u32) -> bool {
        atomic_number >= self.first && atomic_number <= self.last
    }

    /// Iterate the atomic numbers of the span in order.
    pub fn iter(&self) -> impl Iterator<Item = u32> {
        self.first..=self.last
    }
}

impl fmt::Display for ElementRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = symbol(self.first).unwrap_or("?");
        let last = symbol(self.last).unwrap_or("?");
        if self.first == self.last {
            write!(f, "{first}")
        } else {
            write!(f, "{first}-{last}")
        }
    }
}

impl FromStr for ElementRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementRange::parse(s)
    }
}
