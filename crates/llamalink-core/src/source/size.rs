//! Human-readable model sizes and size-range filtering.

use crate::error::{LinkError, Result};

const UNITS: [(&str, u32); 5] = [("TB", 4), ("GB", 3), ("MB", 2), ("KB", 1), ("B", 0)];

fn unit_multiplier(unit: &str) -> Option<f64> {
    let unit = unit.to_ascii_uppercase();
    UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, power)| 1024f64.powi(*power as i32))
}

fn to_bytes(value: f64, multiplier: f64) -> Option<u64> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier).round() as u64)
}

/// Split `4.7GB` into (`4.7`, `GB`).
fn split_number_unit(field: &str) -> Option<(f64, &str)> {
    let split = field
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(field.len());
    if split == 0 {
        return None;
    }
    let value: f64 = field[..split].parse().ok()?;
    Some((value, &field[split..]))
}

/// Parse a size given as one field (`4.7GB`) or a number and a unit (`4.7`, `GB`).
pub fn parse_size(number: &str, unit: Option<&str>) -> Option<u64> {
    match unit {
        Some(unit) => {
            let value: f64 = number.parse().ok()?;
            to_bytes(value, unit_multiplier(unit)?)
        }
        None => {
            let (value, unit) = split_number_unit(number)?;
            to_bytes(value, unit_multiplier(unit)?)
        }
    }
}

/// Locate a size among the whitespace-separated fields of a listing row.
pub fn find_size(fields: &[&str]) -> Option<u64> {
    for (i, field) in fields.iter().enumerate() {
        if let Some(next) = fields.get(i + 1) {
            if unit_multiplier(next).is_some() {
                if let Some(bytes) = parse_size(field, Some(next)) {
                    return Some(bytes);
                }
            }
        }
        if let Some(bytes) = parse_size(field, None) {
            return Some(bytes);
        }
    }
    None
}

/// Parse a size argument; a bare number is taken as gigabytes.
///
/// Accepts `4`, `4.5`, `4GB`, `500MB` and `500 MB`.
pub fn parse_size_arg(arg: &str) -> Result<u64> {
    let compact: String = arg.split_whitespace().collect();
    let invalid = || LinkError::Config {
        message: format!("Invalid size '{}': expected e.g. 4, 4.5GB or 500MB", arg),
    };

    let (value, unit) = split_number_unit(&compact).ok_or_else(invalid)?;
    let multiplier = if unit.is_empty() {
        1024f64.powi(3)
    } else {
        unit_multiplier(unit).ok_or_else(invalid)?
    };
    to_bytes(value, multiplier).ok_or_else(invalid)
}

/// Inclusive size range for model selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeFilter {
    pub min_bytes: Option<u64>,
    pub max_bytes: Option<u64>,
}

impl SizeFilter {
    pub fn new(min_bytes: Option<u64>, max_bytes: Option<u64>) -> Self {
        Self {
            min_bytes,
            max_bytes,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min_bytes.is_none() && self.max_bytes.is_none()
    }

    /// Models of unknown size only pass an unbounded filter.
    pub fn matches(&self, size_bytes: Option<u64>) -> bool {
        match size_bytes {
            Some(size) => {
                self.min_bytes.map_or(true, |min| size >= min)
                    && self.max_bytes.map_or(true, |max| size <= max)
            }
            None => self.is_unbounded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GB: u64 = 1024 * 1024 * 1024;
    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_parse_size_forms() {
        assert_eq!(parse_size("4", Some("GB")), Some(4 * GB));
        assert_eq!(parse_size("500MB", None), Some(500 * MB));
        assert_eq!(parse_size("12b", None), Some(12));
        assert_eq!(parse_size("abc", None), None);
        assert_eq!(parse_size("7b", Some("weeks")), None);
    }

    #[test]
    fn test_find_size_in_listing_row() {
        let row = ["llama3:8b", "365c0bd3c000", "4.7", "GB", "2", "weeks", "ago"];
        assert_eq!(find_size(&row), Some((4.7 * GB as f64).round() as u64));

        let compact = ["phi:latest", "e2fd6321a5fe", "1.6GB", "3", "days", "ago"];
        assert_eq!(find_size(&compact), Some((1.6 * GB as f64).round() as u64));

        assert_eq!(find_size(&["model:tag"]), None);
    }

    #[test]
    fn test_parse_size_arg() {
        assert_eq!(parse_size_arg("4").unwrap(), 4 * GB);
        assert_eq!(parse_size_arg("4.5").unwrap(), (4.5 * GB as f64) as u64);
        assert_eq!(parse_size_arg("500MB").unwrap(), 500 * MB);
        assert_eq!(parse_size_arg("500 MB").unwrap(), 500 * MB);
        assert_eq!(parse_size_arg("2gb").unwrap(), 2 * GB);
        assert!(parse_size_arg("lots").is_err());
        assert!(parse_size_arg("5 parsecs").is_err());
    }

    #[test]
    fn test_size_filter() {
        let filter = SizeFilter::new(Some(GB), Some(8 * GB));
        assert!(filter.matches(Some(4 * GB)));
        assert!(filter.matches(Some(GB)));
        assert!(!filter.matches(Some(500 * MB)));
        assert!(!filter.matches(Some(9 * GB)));
        assert!(!filter.matches(None));

        assert!(SizeFilter::default().matches(None));
        assert!(SizeFilter::new(None, Some(GB)).matches(Some(MB)));
    }
}
