//! JSON detection, structural validation and decoding

use std::time::Instant;

use regex::Regex;

use crate::{
    codes,
    config::ParseConfig,
    diagnostics::{DetectionResult, ParseMetadata, ParseResult, ValidationError},
    document::Document,
    parsers::FormatParser,
    regex_util::static_regex,
    rules::json::json_layers,
};

static_regex!(fn key_value_pattern, r#""(?:[^"\\\n]|\\.)*"\s*:"#);
static_regex!(fn quoted_string_pattern, r#""(?:[^"\\\n]|\\.)*""#);
static_regex!(fn literal_pattern, r"\b(?:null|true|false)\b");

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonParser;

impl JsonParser {
    pub fn new() -> Self {
        Self
    }
}

impl FormatParser for JsonParser {
    fn name(&self) -> &str {
        "json"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json", "jsonc", "geojson", "webmanifest"]
    }

    fn mime_types(&self) -> &[&'static str] {
        &["application/json", "text/json", "application/ld+json", "application/geo+json"]
    }

    fn detect(&self, content: &str) -> DetectionResult {
        let trimmed = content.trim();
        let mut score = 0.0;
        let mut evidence = Vec::new();

        if (trimmed.starts_with('{') && trimmed.ends_with('}'))
            || (trimmed.starts_with('[') && trimmed.ends_with(']'))
        {
            score += 40.0;
            evidence.push("Wrapped in matching JSON brackets".to_string());
        }
        if key_value_pattern().is_match(trimmed) {
            score += 30.0;
            evidence.push("Contains quoted key-value pairs".to_string());
        }
        if quoted_string_pattern().is_match(trimmed) {
            score += 15.0;
            evidence.push("Contains double-quoted strings".to_string());
        }
        if literal_pattern().is_match(trimmed) {
            score += 10.0;
            evidence.push("Contains JSON literals".to_string());
        }
        if trimmed.starts_with('<') {
            score -= 50.0;
            evidence.push("Starts with '<' (markup, not JSON)".to_string());
        }

        let format = if score > 50.0 {
            self.name()
        } else {
            DetectionResult::UNKNOWN
        };
        DetectionResult::new(format, score, evidence)
    }

    fn validate(&self, content: &str, config: &ParseConfig) -> Vec<ValidationError> {
        let mut errors = check_structure(content);
        if errors.iter().any(ValidationError::is_blocking) || content.trim().is_empty() {
            config.filter_disabled(&mut errors);
            return errors;
        }

        for layer in json_layers(&config.json) {
            errors.extend(layer.validate(content, config));
        }
        config.filter_disabled(&mut errors);
        errors
    }

    fn parse(&self, content: &str, config: &ParseConfig) -> ParseResult<Document> {
        let start = Instant::now();
        let confidence = self.detect(content).confidence;
        let mut errors = self.validate(content, config);
        let metadata = ParseMetadata::new(self.name(), content.len(), confidence);

        if errors.iter().any(ValidationError::is_blocking) {
            return ParseResult::failure(errors, metadata.with_parse_time(start.elapsed()));
        }

        match serde_json::from_str::<serde_json::Value>(content) {
            Ok(value) => ParseResult::from_parts(
                Some(Document::Json(value)),
                errors,
                metadata.with_parse_time(start.elapsed()),
            ),
            Err(e) => {
                errors.push(syntax_error(&e));
                ParseResult::failure(errors, metadata.with_parse_time(start.elapsed()))
            }
        }
    }
}

/// Convert a decoder error into a `SYNTAX_ERROR` finding at the decoder's
/// reported position.
pub(crate) fn syntax_error(error: &serde_json::Error) -> ValidationError {
    let finding = ValidationError::error(
        codes::SYNTAX_ERROR,
        format!("Invalid JSON: {}", humanize_decode_error(error)),
    );
    if error.line() > 0 {
        finding.at(error.line(), error.column().max(1))
    } else {
        finding
    }
}

/// serde_json messages end with " at line N column M"; position is reported
/// separately, so drop it and capitalize.
fn humanize_decode_error(error: &serde_json::Error) -> String {
    let text = error.to_string();
    let text = match text.rfind(" at line ") {
        Some(idx) => &text[..idx],
        None => text.as_str(),
    };
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "malformed document".to_string(),
    }
}

/// Structural checks that run before any lint layer: emptiness, outer
/// bracket pair, bracket balance and per-line string termination.
pub fn check_structure(content: &str) -> Vec<ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return vec![ValidationError::error(codes::EMPTY_CONTENT, "JSON content is empty")
            .with_suggestion("Provide a JSON object or array")];
    }

    let mut errors = Vec::new();

    let first = trimmed.chars().next();
    let last = trimmed.chars().last();
    let wrapped = matches!((first, last), (Some('{'), Some('}')) | (Some('['), Some(']')));
    if !wrapped {
        errors.push(
            ValidationError::error(
                codes::INVALID_STRUCTURE,
                "JSON must start with '{' or '[' and end with the matching bracket",
            )
            .at(1, 1)
            .with_suggestion("Wrap the document in an object or array"),
        );
    }

    errors.extend(check_brackets(content));
    errors.extend(check_strings(content));
    errors
}

fn check_brackets(content: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut stack: Vec<(char, usize, usize)> = Vec::new();

    for (line_idx, line) in content.lines().enumerate() {
        let line_num = line_idx + 1;
        // Strings cannot span lines; the string scan reports those.
        let mut in_string = false;
        let mut escaped = false;

        for (col_idx, ch) in line.chars().enumerate() {
            let col = col_idx + 1;
            if in_string {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    in_string = false;
                }
                continue;
            }
            match ch {
                '"' => in_string = true,
                '{' | '[' => stack.push((ch, line_num, col)),
                '}' | ']' => {
                    let expected_open = if ch == '}' { '{' } else { '[' };
                    match stack.pop() {
                        None => errors.push(
                            ValidationError::error(
                                codes::UNMATCHED_CLOSING,
                                format!("Unmatched closing '{}'", ch),
                            )
                            .at(line_num, col),
                        ),
                        Some((open, _, _)) if open != expected_open => errors.push(
                            ValidationError::error(
                                codes::MISMATCHED_BRACKETS,
                                format!(
                                    "Expected '{}' but found '{}'",
                                    closing_for(open),
                                    ch
                                ),
                            )
                            .at(line_num, col),
                        ),
                        Some(_) => {}
                    }
                }
                _ => {}
            }
        }
    }

    for (open, line, col) in stack {
        errors.push(
            ValidationError::error(
                codes::UNCLOSED_BRACKET,
                format!("Unclosed '{}'", open),
            )
            .at(line, col)
            .with_suggestion(format!("Add a matching '{}'", closing_for(open))),
        );
    }
    errors
}

fn closing_for(open: char) -> char {
    if open == '{' {
        '}'
    } else {
        ']'
    }
}

fn check_strings(content: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        let mut open_at: Option<usize> = None;
        let mut escaped = false;
        for (col_idx, ch) in line.chars().enumerate() {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' if open_at.is_some() => escaped = true,
                '"' => {
                    open_at = match open_at {
                        Some(_) => None,
                        None => Some(col_idx + 1),
                    }
                }
                _ => {}
            }
        }
        if let Some(col) = open_at {
            errors.push(
                ValidationError::error(codes::UNTERMINATED_STRING, "Unterminated string")
                    .at(line_idx + 1, col)
                    .with_suggestion("Close the string with '\"' on the same line"),
            );
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes_of(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().map(|e| e.code.as_str()).collect()
    }

    #[test]
    fn test_detect_object() {
        let result = JsonParser.detect(r#"{"name": "ada", "active": true}"#);
        assert_eq!(result.format, "json");
        assert_eq!(result.confidence, 95);
    }

    #[test]
    fn test_detect_markup_is_not_json() {
        let result = JsonParser.detect("<root>\"x\"</root>");
        assert_eq!(result.format, "unknown");
        assert_eq!(result.confidence, 0);
    }

    #[test]
    fn test_detect_plain_array_below_threshold_keeps_score() {
        let result = JsonParser.detect("[1, 2, 3]");
        assert_eq!(result.format, "unknown");
        assert_eq!(result.confidence, 40);
    }

    #[test]
    fn test_empty_content_short_circuits() {
        let errors = JsonParser.validate("   \n", &ParseConfig::default());
        assert_eq!(codes_of(&errors), vec!["EMPTY_CONTENT"]);
    }

    #[test]
    fn test_invalid_structure() {
        let errors = check_structure("\"just a string\"");
        assert!(codes_of(&errors).contains(&"INVALID_STRUCTURE"));
    }

    #[test]
    fn test_bracket_errors_have_positions() {
        let errors = check_structure("{\n  \"a\": [1, 2}\n");
        let mismatch = errors
            .iter()
            .find(|e| e.code == "MISMATCHED_BRACKETS")
            .unwrap();
        assert_eq!(mismatch.line, Some(2));
        assert_eq!(mismatch.column, Some(13));
        assert!(codes_of(&errors).contains(&"UNCLOSED_BRACKET"));
    }

    #[test]
    fn test_unmatched_closing() {
        let errors = check_structure("{}]");
        assert!(codes_of(&errors).contains(&"UNMATCHED_CLOSING"));
    }

    #[test]
    fn test_brackets_inside_strings_are_ignored() {
        let errors = check_structure(r#"{"a": "}]{[", "b": "\"}"}"#);
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_unterminated_string() {
        let errors = check_structure("{\n  \"a\": \"oops\n}");
        let unterminated = errors
            .iter()
            .find(|e| e.code == "UNTERMINATED_STRING")
            .unwrap();
        assert_eq!(unterminated.line, Some(2));
        assert_eq!(unterminated.column, Some(8));
    }

    #[test]
    fn test_trailing_comma_fails_with_syntax_error() {
        let result = JsonParser.parse(r#"{"a":1,}"#, &ParseConfig::default());
        assert!(!result.is_valid);
        assert!(result.data.is_none());
        assert!(result.has_code("SYNTAX_ERROR"));
        let syntax = result.errors.iter().find(|e| e.code == "SYNTAX_ERROR").unwrap();
        assert_eq!(syntax.line, Some(1));
    }

    #[test]
    fn test_parse_returns_decoded_value() {
        let result = JsonParser.parse(r#"{"a": [1, 2, {"b": null}]}"#, &ParseConfig::default());
        assert!(result.is_valid);
        let expected = serde_json::json!({"a": [1, 2, {"b": null}]});
        assert_eq!(result.data.unwrap().as_json(), Some(&expected));
        assert_eq!(result.metadata.format, "json");
    }

    #[test]
    fn test_parse_keeps_advisory_findings() {
        let result = JsonParser.parse(r#"{"a": 1, "a": 2}"#, &ParseConfig::default());
        assert!(result.is_valid);
        assert!(result.has_code("DUPLICATE_KEY"));
    }

    #[test]
    fn test_parse_skips_decode_after_blocking_error() {
        let result = JsonParser.parse("{\"a\": [1}", &ParseConfig::default());
        assert!(!result.is_valid);
        assert!(!result.has_code("SYNTAX_ERROR"));
    }

    #[test]
    fn test_lenient_profile_still_reports_decode_failure() {
        let config = ParseConfig::for_profile(crate::ValidationProfile::Lenient);
        let result = JsonParser.parse("[1 2]", &config);
        assert!(!result.is_valid);
        assert!(result.has_code("SYNTAX_ERROR"));
    }

    #[test]
    fn test_humanized_message_drops_position() {
        let err = serde_json::from_str::<serde_json::Value>("[1,]").unwrap_err();
        let finding = syntax_error(&err);
        assert!(!finding.message.contains("at line"));
        assert!(finding.message.starts_with("Invalid JSON: "));
    }
}
