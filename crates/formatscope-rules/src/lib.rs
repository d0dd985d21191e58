//! Validation code catalog for formatscope.
//!
//! Every finding the engine reports carries a stable, machine-readable code
//! (e.g. `UNCLOSED_TAG`, `CSV_INJECTION`). This crate is the single source of
//! truth for those codes: it is generated from `codes.json` at build time.
//!
//! # Usage
//!
//! ```
//! use formatscope_rules::{CODES_DATA, get_code_summary};
//!
//! for (id, summary) in CODES_DATA {
//!     println!("{}: {}", id, summary);
//! }
//!
//! assert!(get_code_summary("UNCLOSED_TAG").is_some());
//! ```
//!
//! # Formats
//!
//! - **json**: bracket balance, decoding and JSON linting
//! - **csv**: tokenizer, structure, security and data-quality checks
//! - **xml**: recursive descent, syntax, structure and XXE checks
//! - **registry**: parser routing failures
//! - **any**: codes shared by several formats

// Include the auto-generated catalog from build.rs
include!(concat!(env!("OUT_DIR"), "/codes_data.rs"));

/// Returns the total number of codes.
pub fn code_count() -> usize {
    CODES_DATA.len()
}

fn lookup(table: &'static [(&'static str, &'static str)], id: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(code, _)| *code == id)
        .map(|(_, value)| *value)
}

/// Looks up a code by ID, returning its summary if found.
pub fn get_code_summary(id: &str) -> Option<&'static str> {
    lookup(CODES_DATA, id)
}

/// Returns the format a code belongs to (`json`, `csv`, `xml`, `registry` or `any`).
pub fn get_code_format(id: &str) -> Option<&'static str> {
    lookup(CODE_FORMATS, id)
}

/// Returns the validation category of a code (e.g. `security`, `structure`).
pub fn get_code_category(id: &str) -> Option<&'static str> {
    lookup(CODE_CATEGORIES, id)
}

/// Returns the default severity of a code (`error`, `warning` or `info`).
///
/// Some checks emit a code at a different severity depending on the
/// threshold crossed; this is the severity most findings carry.
pub fn get_code_severity(id: &str) -> Option<&'static str> {
    lookup(CODE_SEVERITIES, id)
}

/// Returns every code relevant to a format, including the shared `any` codes.
///
/// Matching is case-insensitive.
///
/// # Example
/// ```
/// use formatscope_rules::codes_for_format;
///
/// let codes = codes_for_format("XML");
/// assert!(codes.contains(&"UNCLOSED_TAG"));
/// assert!(codes.contains(&"EMPTY_CONTENT"));
/// assert!(!codes.contains(&"CSV_INJECTION"));
/// ```
pub fn codes_for_format(format: &str) -> Vec<&'static str> {
    CODE_FORMATS
        .iter()
        .filter(|(_, f)| f.eq_ignore_ascii_case(format) || *f == "any")
        .map(|(id, _)| *id)
        .collect()
}

/// Check if a code exists in the catalog.
pub fn is_known_code(id: &str) -> bool {
    get_code_summary(id).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::const_is_empty)]
    fn test_codes_data_not_empty() {
        assert!(!CODES_DATA.is_empty(), "CODES_DATA should not be empty");
    }

    #[test]
    fn test_code_count() {
        assert_eq!(code_count(), CODES_DATA.len());
    }

    #[test]
    fn test_tables_are_parallel() {
        assert_eq!(CODES_DATA.len(), CODE_FORMATS.len());
        assert_eq!(CODES_DATA.len(), CODE_CATEGORIES.len());
        assert_eq!(CODES_DATA.len(), CODE_SEVERITIES.len());
        for (i, (id, _)) in CODES_DATA.iter().enumerate() {
            assert_eq!(CODE_FORMATS[i].0, *id);
            assert_eq!(CODE_CATEGORIES[i].0, *id);
            assert_eq!(CODE_SEVERITIES[i].0, *id);
        }
    }

    #[test]
    fn test_get_code_summary_exists() {
        assert!(get_code_summary("CSV_INJECTION").is_some());
        assert!(get_code_summary("UNCLOSED_TAG").is_some());
        assert!(get_code_summary("SYNTAX_ERROR").is_some());
    }

    #[test]
    fn test_get_code_summary_not_exists() {
        assert!(get_code_summary("NONEXISTENT_999").is_none());
    }

    #[test]
    fn test_no_duplicate_ids() {
        let mut ids: Vec<&str> = CODES_DATA.iter().map(|(id, _)| *id).collect();
        let original_len = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), original_len, "Should have no duplicate codes");
    }

    #[test]
    fn test_formats_known() {
        for format in ["json", "csv", "xml", "registry", "any"] {
            assert!(
                KNOWN_FORMATS.contains(&format),
                "KNOWN_FORMATS should contain '{}'",
                format
            );
        }
    }

    #[test]
    fn test_code_metadata() {
        assert_eq!(get_code_format("CSV_INJECTION"), Some("csv"));
        assert_eq!(get_code_category("CSV_INJECTION"), Some("security"));
        assert_eq!(get_code_severity("CSV_INJECTION"), Some("error"));
        assert_eq!(get_code_severity("DTD_DETECTED"), Some("warning"));
        assert_eq!(get_code_format("EMPTY_CONTENT"), Some("any"));
    }

    #[test]
    fn test_codes_for_format_excludes_other_formats() {
        let json = codes_for_format("json");
        assert!(json.contains(&"UNCLOSED_BRACKET"));
        assert!(json.contains(&"EXCESSIVE_NESTING"));
        assert!(!json.contains(&"UNCLOSED_TAG"));
        assert!(!json.contains(&"UNKNOWN_FORMAT"));
    }

    #[test]
    fn test_every_severity_is_valid() {
        for (id, severity) in CODE_SEVERITIES {
            assert!(
                matches!(*severity, "error" | "warning" | "info"),
                "{} has invalid severity {}",
                id,
                severity
            );
        }
    }
}
