//! Properties that must hold for any input

use std::sync::Arc;

use formatscope_core::{
    DetectOptions, FormatDetector, FormatParser, FormatRegistry, ParseConfig, ParseResult,
    ValidationProfile,
};
use proptest::prelude::*;

fn check_blocking_invariant<T>(result: &ParseResult<T>) -> Result<(), TestCaseError> {
    if result.is_valid {
        prop_assert!(result.errors.iter().all(|e| !e.is_blocking()));
        prop_assert!(result.data.is_some());
    } else {
        prop_assert!(result.data.is_none());
        prop_assert!(result.errors.iter().any(|e| e.is_blocking()));
    }
    Ok(())
}

/// Text built from the characters the three formats are made of
fn structured_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[\\[\\]{}\":,0-9a-z \\n]{0,160}",
        "[a-z0-9,;\\t\"\\n=+@-]{0,160}",
        "[<>/?!=\"a-z:\\- \\n&;]{0,160}",
        ".{0,120}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn detection_confidence_is_bounded(content in structured_text()) {
        let registry = Arc::new(FormatRegistry::with_defaults());
        for parser in registry.parsers() {
            prop_assert!(parser.detect(&content).confidence <= 100);
        }
        prop_assert!(registry.detect_format(&content, Some("data.csv"), None).confidence <= 100);

        let detector = FormatDetector::new(registry);
        let options = DetectOptions {
            filename: Some("data.json"),
            mime_type: Some("text/xml"),
            ..DetectOptions::uncached()
        };
        prop_assert!(detector.detect(&content, &options).confidence <= 100);
        prop_assert!(detector.detect_by_content(&content).confidence <= 100);
    }

    #[test]
    fn parse_results_respect_blocking(content in structured_text()) {
        let registry = FormatRegistry::with_defaults();
        for profile in [ValidationProfile::Strict, ValidationProfile::Lenient, ValidationProfile::Custom] {
            let config = ParseConfig::for_profile(profile);
            for parser in registry.parsers() {
                check_blocking_invariant(&parser.parse(&content, &config))?;
            }
        }
    }

    #[test]
    fn uncached_detection_is_idempotent(content in structured_text()) {
        let detector = FormatDetector::new(Arc::new(FormatRegistry::with_defaults()));
        let first = detector.detect(&content, &DetectOptions::uncached());
        let second = detector.detect(&content, &DetectOptions::uncached());
        prop_assert_eq!(first, second);
    }
}
