//! JSON lint layers: performance, security, best practices and naming

use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;

use crate::{
    codes,
    config::{JsonOptions, ParseConfig},
    diagnostics::ValidationError,
    parsers::json::syntax_error,
    regex_util::static_regex,
    rules::Validator,
};

const LARGE_FILE_INFO_BYTES: usize = 1024 * 1024;
const LARGE_FILE_WARNING_BYTES: usize = 5 * 1024 * 1024;
const MAX_LINES: usize = 50_000;
/// 2^53 - 1
const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

const PROTOTYPE_KEYS: &[&str] = &["__proto__", "constructor", "prototype"];

const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "let", "new", "null", "return", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

static_regex!(fn camel_case_pattern, r"^[a-z][a-zA-Z0-9]*$");

/// Layers enabled by the JSON options, in reporting order
pub fn json_layers(options: &JsonOptions) -> Vec<Box<dyn Validator>> {
    let mut layers: Vec<Box<dyn Validator>> = Vec::new();
    if options.performance {
        layers.push(Box::new(PerformanceLint));
    }
    if options.security {
        layers.push(Box::new(SecurityLint));
    }
    if options.best_practices {
        layers.push(Box::new(BestPracticesLint));
    }
    if options.strict_naming {
        layers.push(Box::new(NamingLint));
    }
    layers
}

/// A key as it appears in the raw text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOccurrence {
    pub name: String,
    pub line: usize,
    pub column: usize,
    /// Another key with this name already appeared in the same object
    pub duplicate: bool,
}

/// A string literal's length and start position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringRun {
    pub chars: usize,
    pub line: usize,
    pub column: usize,
}

/// Everything the layers need from one pass over the raw text
#[derive(Debug, Default)]
pub struct RawScan {
    pub keys: Vec<KeyOccurrence>,
    pub strings: Vec<StringRun>,
    pub max_depth: usize,
    /// Where `max_depth` was first reached
    pub max_depth_at: (usize, usize),
}

impl RawScan {
    pub fn scan(content: &str) -> Self {
        let chars: Vec<char> = content.chars().collect();
        let mut scan = RawScan::default();
        // Some(keys seen) for objects, None for arrays
        let mut scopes: Vec<Option<HashSet<String>>> = Vec::new();
        let (mut i, mut line, mut col) = (0usize, 1usize, 1usize);

        while i < chars.len() {
            match chars[i] {
                '{' | '[' => {
                    scopes.push(if chars[i] == '{' {
                        Some(HashSet::new())
                    } else {
                        None
                    });
                    if scopes.len() > scan.max_depth {
                        scan.max_depth = scopes.len();
                        scan.max_depth_at = (line, col);
                    }
                }
                '}' | ']' => {
                    scopes.pop();
                }
                '"' => {
                    let (start_line, start_col) = (line, col);
                    let mut value = String::new();
                    let mut length = 0;
                    let mut closed = false;
                    i += 1;
                    col += 1;
                    while i < chars.len() {
                        match chars[i] {
                            '\\' => {
                                value.push('\\');
                                if let Some(next) = chars.get(i + 1) {
                                    value.push(*next);
                                }
                                length += 1;
                                i += 2;
                                col += 2;
                            }
                            '"' => {
                                closed = true;
                                break;
                            }
                            '\n' => break,
                            c => {
                                value.push(c);
                                length += 1;
                                i += 1;
                                col += 1;
                            }
                        }
                    }
                    if !closed {
                        continue;
                    }

                    scan.strings.push(StringRun {
                        chars: length,
                        line: start_line,
                        column: start_col,
                    });

                    let is_key = chars[i + 1..]
                        .iter()
                        .find(|c| !c.is_whitespace())
                        .is_some_and(|c| *c == ':');
                    if is_key {
                        if let Some(Some(seen)) = scopes.last_mut() {
                            let duplicate = !seen.insert(value.clone());
                            scan.keys.push(KeyOccurrence {
                                name: value,
                                line: start_line,
                                column: start_col,
                                duplicate,
                            });
                        }
                    }
                }
                '\n' => {
                    line += 1;
                    col = 0;
                }
                _ => {}
            }
            i += 1;
            col += 1;
        }
        scan
    }
}

/// File size and line count
pub struct PerformanceLint;

impl Validator for PerformanceLint {
    fn validate(&self, content: &str, _config: &ParseConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let size = content.len();
        let mb = size as f64 / (1024.0 * 1024.0);

        if size > LARGE_FILE_WARNING_BYTES {
            errors.push(
                ValidationError::warning(
                    codes::LARGE_FILE,
                    format!("File is {:.1} MB; parsing may be slow", mb),
                )
                .with_suggestion("Consider streaming or splitting the document"),
            );
        } else if size > LARGE_FILE_INFO_BYTES {
            errors.push(ValidationError::info(
                codes::LARGE_FILE,
                format!("File is {:.1} MB", mb),
            ));
        }

        let lines = content.lines().count();
        if lines > MAX_LINES {
            errors.push(ValidationError::warning(
                codes::TOO_MANY_LINES,
                format!("Document has {} lines (more than {})", lines, MAX_LINES),
            ));
        }
        errors
    }
}

/// Nesting depth, prototype-pollution keys and overlong strings
pub struct SecurityLint;

impl Validator for SecurityLint {
    fn validate(&self, content: &str, config: &ParseConfig) -> Vec<ValidationError> {
        let options = &config.json;
        let scan = RawScan::scan(content);
        let mut errors = Vec::new();

        if scan.max_depth > options.max_nesting_depth {
            let (line, col) = scan.max_depth_at;
            errors.push(
                ValidationError::error(
                    codes::EXCESSIVE_NESTING,
                    format!(
                        "Nesting depth {} exceeds maximum of {}",
                        scan.max_depth, options.max_nesting_depth
                    ),
                )
                .at(line, col)
                .with_suggestion("Flatten the document structure"),
            );
        }

        for key in &scan.keys {
            if PROTOTYPE_KEYS.contains(&key.name.as_str()) {
                errors.push(
                    ValidationError::warning(
                        codes::PROTOTYPE_POLLUTION,
                        format!("Key '{}' can pollute object prototypes", key.name),
                    )
                    .at(key.line, key.column),
                );
            }
        }

        for run in &scan.strings {
            if run.chars > options.max_string_length {
                errors.push(
                    ValidationError::warning(
                        codes::LONG_STRING,
                        format!(
                            "String of {} characters exceeds {}",
                            run.chars, options.max_string_length
                        ),
                    )
                    .at(run.line, run.column),
                );
            }
        }
        errors
    }
}

/// Decodes the document and checks sizes, integers and duplicate keys
pub struct BestPracticesLint;

impl Validator for BestPracticesLint {
    fn validate(&self, content: &str, config: &ParseConfig) -> Vec<ValidationError> {
        let value: Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(e) => return vec![syntax_error(&e)],
        };

        let mut errors = Vec::new();
        walk_value(&value, "$", &config.json, &mut errors);

        for key in RawScan::scan(content).keys.iter().filter(|k| k.duplicate) {
            errors.push(
                ValidationError::warning(
                    codes::DUPLICATE_KEY,
                    format!("Duplicate key '{}' in the same object", key.name),
                )
                .at(key.line, key.column)
                .with_suggestion("Only the last value is kept by most decoders"),
            );
        }
        errors
    }
}

fn walk_value(value: &Value, path: &str, options: &JsonOptions, errors: &mut Vec<ValidationError>) {
    match value {
        Value::Array(items) => {
            if items.len() > options.max_array_length {
                errors.push(ValidationError::warning(
                    codes::LARGE_ARRAY,
                    format!(
                        "Array at {} has {} items (maximum {})",
                        path,
                        items.len(),
                        options.max_array_length
                    ),
                ));
            }
            for (idx, item) in items.iter().enumerate() {
                walk_value(item, &format!("{}[{}]", path, idx), options, errors);
            }
        }
        Value::Object(map) => {
            if map.len() > options.max_properties {
                errors.push(ValidationError::warning(
                    codes::TOO_MANY_PROPERTIES,
                    format!(
                        "Object at {} has {} properties (maximum {})",
                        path,
                        map.len(),
                        options.max_properties
                    ),
                ));
            }
            for (key, child) in map {
                if key.chars().count() > options.max_property_name_length {
                    errors.push(ValidationError::info(
                        codes::LONG_PROPERTY_NAME,
                        format!(
                            "Property name at {} is longer than {} characters",
                            path, options.max_property_name_length
                        ),
                    ));
                }
                walk_value(child, &format!("{}.{}", path, key), options, errors);
            }
        }
        Value::Number(number) if is_unsafe_integer(number) => {
            errors.push(
                ValidationError::warning(
                    codes::UNSAFE_INTEGER,
                    format!("Integer {} at {} loses precision in many decoders", number, path),
                )
                .with_suggestion("Encode large identifiers as strings"),
            );
        }
        _ => {}
    }
}

fn is_unsafe_integer(number: &serde_json::Number) -> bool {
    if let Some(n) = number.as_u64() {
        return n > MAX_SAFE_INTEGER;
    }
    if let Some(n) = number.as_i64() {
        return n.unsigned_abs() > MAX_SAFE_INTEGER;
    }
    number
        .as_f64()
        .is_some_and(|f| f.fract() == 0.0 && f.abs() > MAX_SAFE_INTEGER as f64)
}

/// camelCase property names and reserved words
pub struct NamingLint;

impl Validator for NamingLint {
    fn validate(&self, content: &str, _config: &ParseConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut reported = HashSet::new();

        for key in RawScan::scan(content).keys {
            if !reported.insert(key.name.clone()) {
                continue;
            }
            if RESERVED_WORDS.contains(&key.name.as_str()) {
                errors.push(
                    ValidationError::info(
                        codes::RESERVED_WORD,
                        format!("Property name '{}' is a reserved word", key.name),
                    )
                    .at(key.line, key.column),
                );
            } else if !camel_case_pattern().is_match(&key.name) {
                errors.push(
                    ValidationError::info(
                        codes::NAMING_CONVENTION,
                        format!("Property name '{}' is not camelCase", key.name),
                    )
                    .at(key.line, key.column),
                );
            }
        }
        errors
    }
}
