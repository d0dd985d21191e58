//! The engine's code constants and the catalog must agree

use std::collections::HashSet;

use formatscope_core::codes;

#[test]
fn every_code_is_in_the_catalog() {
    let missing: Vec<_> = codes::ALL
        .iter()
        .filter(|code| !formatscope_rules::is_known_code(code))
        .collect();
    assert!(missing.is_empty(), "codes missing from codes.json: {:?}", missing);
}

#[test]
fn catalog_has_no_extra_codes() {
    assert_eq!(formatscope_rules::code_count(), codes::ALL.len());
}

#[test]
fn code_constants_are_unique() {
    let unique: HashSet<_> = codes::ALL.iter().collect();
    assert_eq!(unique.len(), codes::ALL.len());
}

#[test]
fn every_catalog_entry_has_a_summary_and_format() {
    for code in codes::ALL {
        assert!(formatscope_rules::get_code_summary(code).is_some(), "{}", code);
        let format = formatscope_rules::get_code_format(code).unwrap();
        assert!(
            ["json", "csv", "xml", "registry", "any"].contains(&format),
            "{} has format {}",
            code,
            format
        );
    }
}
