//! Build script for formatscope-rules.
//!
//! Generates Rust code from codes.json at compile time.
//!
//! Generated constants:
//! - `CODES_DATA`: All code (id, summary) tuples
//! - `CODE_FORMATS`: (id, format) tuples
//! - `CODE_CATEGORIES`: (id, category) tuples
//! - `CODE_SEVERITIES`: (id, default severity) tuples
//! - `KNOWN_FORMATS`: Unique format names referenced by the catalog

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;

/// Maximum allowed file size for codes.json (1 MB)
const MAX_CODES_FILE_SIZE: u64 = 1024 * 1024;

const SEVERITIES: &[&str] = &["error", "warning", "info"];

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let codes_path = Path::new(&manifest_dir).join("codes.json");

    println!("cargo:rerun-if-changed={}", codes_path.display());

    let file_size = fs::metadata(&codes_path)
        .unwrap_or_else(|e| panic!("Failed to get metadata for {}: {}", codes_path.display(), e))
        .len();
    if file_size > MAX_CODES_FILE_SIZE {
        panic!(
            "codes.json at {} is too large ({} bytes, max {} bytes)",
            codes_path.display(),
            file_size,
            MAX_CODES_FILE_SIZE
        );
    }

    let codes_json = fs::read_to_string(&codes_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read codes.json at {}: {}",
            codes_path.display(),
            e
        )
    });

    let catalog: serde_json::Value = serde_json::from_str(&codes_json).unwrap_or_else(|e| {
        panic!(
            "Failed to parse codes.json at {}: {}",
            codes_path.display(),
            e
        )
    });

    let codes = catalog["codes"]
        .as_array()
        .expect("codes.json must have a 'codes' array");

    // Escape special characters for Rust string literal
    let escape_str = |s: &str| {
        s.replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    };

    // Codes are SCREAMING_SNAKE_CASE (e.g., UNCLOSED_TAG, CSV_INJECTION)
    let is_valid_id = |id: &str| -> bool {
        !id.is_empty()
            && id.len() <= 40
            && id
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    };

    let is_valid_text = |text: &str| -> bool {
        !text.is_empty() && text.len() <= 200 && !text.chars().any(|c| c.is_control())
    };

    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut formats: BTreeSet<String> = BTreeSet::new();
    let mut data = String::new();
    let mut format_rows = String::new();
    let mut category_rows = String::new();
    let mut severity_rows = String::new();

    for (idx, code) in codes.iter().enumerate() {
        let id = str_field(code, idx, "id");
        let format = str_field(code, idx, "format");
        let category = str_field(code, idx, "category");
        let severity = str_field(code, idx, "severity");
        let summary = str_field(code, idx, "summary");

        if !is_valid_id(id) {
            panic!(
                "code[{}] has invalid id '{}': must be 1-40 uppercase/digit/underscore characters",
                idx, id
            );
        }
        if !seen.insert(id.to_string()) {
            panic!("code[{}] '{}' is declared more than once", idx, id);
        }
        if !is_valid_text(summary) || !is_valid_text(category) || !is_valid_text(format) {
            panic!(
                "code[{}] '{}' has an invalid text field: must be 1-200 chars, no control characters",
                idx, id
            );
        }
        if !SEVERITIES.contains(&severity) {
            panic!(
                "code[{}] '{}' has invalid severity '{}': expected one of {:?}",
                idx, id, severity, SEVERITIES
            );
        }

        formats.insert(format.to_string());

        let id = escape_str(id);
        data.push_str(&format!("    (\"{}\", \"{}\"),\n", id, escape_str(summary)));
        format_rows.push_str(&format!("    (\"{}\", \"{}\"),\n", id, escape_str(format)));
        category_rows.push_str(&format!("    (\"{}\", \"{}\"),\n", id, escape_str(category)));
        severity_rows.push_str(&format!("    (\"{}\", \"{}\"),\n", id, severity));
    }

    let mut generated_code = String::new();
    generated_code.push_str("// Auto-generated from codes.json by build.rs\n");
    generated_code.push_str("// Do not edit manually!\n\n");

    generated_code.push_str("/// Code data as (id, summary) tuples.\n");
    generated_code.push_str("pub const CODES_DATA: &[(&str, &str)] = &[\n");
    generated_code.push_str(&data);
    generated_code.push_str("];\n\n");

    generated_code.push_str("/// Format each code belongs to, as (id, format) tuples.\n");
    generated_code.push_str("pub const CODE_FORMATS: &[(&str, &str)] = &[\n");
    generated_code.push_str(&format_rows);
    generated_code.push_str("];\n\n");

    generated_code.push_str("/// Validation category of each code, as (id, category) tuples.\n");
    generated_code.push_str("pub const CODE_CATEGORIES: &[(&str, &str)] = &[\n");
    generated_code.push_str(&category_rows);
    generated_code.push_str("];\n\n");

    generated_code.push_str("/// Default severity of each code, as (id, severity) tuples.\n");
    generated_code.push_str("pub const CODE_SEVERITIES: &[(&str, &str)] = &[\n");
    generated_code.push_str(&severity_rows);
    generated_code.push_str("];\n\n");

    generated_code.push_str("/// Format names referenced by the catalog.\n");
    generated_code.push_str("pub const KNOWN_FORMATS: &[&str] = &[\n");
    for format in &formats {
        generated_code.push_str(&format!("    \"{}\",\n", escape_str(format)));
    }
    generated_code.push_str("];\n");

    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("codes_data.rs");
    fs::write(&dest_path, generated_code).expect("Failed to write generated codes");
}

fn str_field<'a>(code: &'a serde_json::Value, idx: usize, name: &str) -> &'a str {
    code[name]
        .as_str()
        .unwrap_or_else(|| panic!("code[{}] must have string '{}' field", idx, name))
}
