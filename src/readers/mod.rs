/// Readers: one parser per upstream data source.
///
/// Each reader takes an element range (where applicable) plus
/// reader-specific options, pulls its source through [`crate::fetch`], and
/// returns a [`crate::data::model::SourceTable`] with named sections.
pub mod chianti;
pub mod gfall;
pub mod ionization;
pub mod weights;
pub mod zeta;

use anyhow::{Context, Result};

/// Priority assigned to sources without a configured one.
pub const DEFAULT_PRIORITY: i64 = 10;

/// Parse a numeric field as upstream catalogues print them: uncertainty
/// suffixes (`1.00782503224(9)`), interpolation parentheses (`(13.59)`)
/// and theory brackets (`[10.2]`) are stripped before parsing.
pub(crate) fn parse_numeric(raw: &str, what: &str) -> Result<f64> {
    let cleaned = raw
        .trim()
        .trim_matches(|c| matches!(c, '[' | ']' | '(' | ')'));
    let cleaned = match cleaned.find('(') {
        Some(idx) => &cleaned[..idx],
        None => cleaned,
    };
    cleaned
        .trim()
        .parse::<f64>()
        .with_context(|| format!("{what}: '{raw}' is not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_catalogue_number_syntax() {
        assert_eq!(parse_numeric("1.5", "v").unwrap(), 1.5);
        assert_eq!(parse_numeric("1.00782503224(9)", "v").unwrap(), 1.00782503224);
        assert_eq!(parse_numeric("(13.59)", "v").unwrap(), 13.59);
        assert_eq!(parse_numeric("[10.2]", "v").unwrap(), 10.2);
        assert_eq!(parse_numeric(" 0.999885(70) ", "v").unwrap(), 0.999885);
        assert!(parse_numeric("n/a", "v").is_err());
    }
}
