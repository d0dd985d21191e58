//! XML lint layers: security, syntax, structure and quality
//!
//! Layers scan the raw text rather than the parsed tree so they report on
//! documents the recursive descent would reject outright.

use std::collections::HashSet;

use regex::Regex;

use crate::{
    codes,
    config::{ParseConfig, XmlOptions},
    diagnostics::ValidationError,
    parsers::xml::scan::{mask_non_element_markup, max_depth, scan_tags, TagKind, TagToken},
    regex_util::static_regex,
    rules::{LineIndex, Validator},
};

const MAX_ATTRIBUTES: usize = 10;
const RESERVED_PREFIXES: &[&str] = &["xml", "xmlns"];

static_regex!(fn external_entity_pattern, r"(?i)<!ENTITY\s+[^\s%>]+\s+(?:SYSTEM|PUBLIC)\b");
static_regex!(fn parameter_entity_pattern, r"(?i)<!ENTITY\s+%");
static_regex!(fn doctype_pattern, r"(?i)<!DOCTYPE\b");
static_regex!(fn entity_reference_pattern, r"&(?:[A-Za-z_][\w.\-]*|#[0-9]+|#x[0-9A-Fa-f]+);");
static_regex!(fn malformed_comment_pattern, r"(?m)<!-(?:[^-]|$)");
static_regex!(fn namespace_declaration_pattern, r"\bxmlns:([A-Za-z_][\w.\-]*)\s*=");
static_regex!(fn attribute_pattern, r#"[A-Za-z_][\w:.\-]*\s*=\s*(?:"[^"]*"|'[^']*')"#);
static_regex!(fn camel_case_pattern, r"^[a-z][a-zA-Z0-9]*$");
static_regex!(fn kebab_case_pattern, r"^[a-z][a-z0-9]*(?:-[a-z0-9]+)*$");

/// Layers enabled by the XML options, in reporting order
pub fn xml_layers(options: &XmlOptions) -> Vec<Box<dyn Validator>> {
    let mut layers: Vec<Box<dyn Validator>> = Vec::new();
    if options.security {
        layers.push(Box::new(SecurityLayer));
    }
    if options.syntax {
        layers.push(Box::new(SyntaxLayer));
    }
    if options.structure {
        layers.push(Box::new(StructureLayer));
    }
    if options.quality {
        layers.push(Box::new(QualityLayer));
    }
    layers
}

/// Entity declarations, DOCTYPE presence and entity reference volume.
///
/// Detection only; nothing is ever resolved.
pub struct SecurityLayer;

impl Validator for SecurityLayer {
    fn validate(&self, content: &str, config: &ParseConfig) -> Vec<ValidationError> {
        let index = LineIndex::new(content);
        let mut errors = Vec::new();

        for m in external_entity_pattern().find_iter(content) {
            let (line, column) = index.position(m.start());
            errors.push(
                ValidationError::error(
                    codes::XXE_DETECTED,
                    "External entity declaration (possible XXE)",
                )
                .at(line, column)
                .with_suggestion("Remove SYSTEM/PUBLIC entity declarations"),
            );
        }
        for m in parameter_entity_pattern().find_iter(content) {
            let (line, column) = index.position(m.start());
            errors.push(
                ValidationError::error(
                    codes::XXE_DETECTED,
                    "Parameter entity declaration (possible XXE)",
                )
                .at(line, column),
            );
        }
        if let Some(m) = doctype_pattern().find(content) {
            let (line, column) = index.position(m.start());
            errors.push(
                ValidationError::warning(codes::DTD_DETECTED, "Document contains a DOCTYPE declaration")
                    .at(line, column),
            );
        }

        let references = entity_reference_pattern().find_iter(content).count();
        let limit = config.xml.max_entity_references;
        if references > limit {
            errors.push(ValidationError::warning(
                codes::EXCESSIVE_ENTITIES,
                format!("{} entity references exceed the limit of {}", references, limit),
            ));
        }
        errors
    }
}

/// Quote parity, attribute syntax inside tags and malformed comment openers
pub struct SyntaxLayer;

impl Validator for SyntaxLayer {
    fn validate(&self, content: &str, _config: &ParseConfig) -> Vec<ValidationError> {
        let masked = mask_non_element_markup(content);
        let index = LineIndex::new(content);

        let mut errors = check_attribute_syntax(&masked, &index);
        let unclosed_lines: HashSet<usize> = errors
            .iter()
            .filter(|e| e.code == codes::UNCLOSED_QUOTE)
            .filter_map(|e| e.line)
            .collect();
        errors.extend(
            check_quote_parity(&masked, &index)
                .into_iter()
                .filter(|e| e.line.map_or(true, |line| !unclosed_lines.contains(&line))),
        );
        for m in malformed_comment_pattern().find_iter(&masked) {
            let (line, column) = index.position(m.start());
            errors.push(
                ValidationError::error(
                    codes::MALFORMED_COMMENT,
                    "Comment opener '<!-' is missing its second dash",
                )
                .at(line, column)
                .with_suggestion("Comments start with '<!--'"),
            );
        }
        errors
    }
}

fn is_name_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte >= 0x80
}

fn is_name_byte(byte: u8) -> bool {
    is_name_start(byte) || byte.is_ascii_digit() || matches!(byte, b':' | b'-' | b'.')
}

/// Walk each start tag's attribute list byte by byte. Findings are reported
/// once per code and line.
fn check_attribute_syntax(masked: &str, index: &LineIndex<'_>) -> Vec<ValidationError> {
    let bytes = masked.as_bytes();
    let len = bytes.len();
    let mut errors = Vec::new();
    let mut reported: HashSet<(&'static str, usize)> = HashSet::new();
    let mut report = |code: &'static str, offset: usize, message: String| {
        let (line, column) = index.position(offset);
        if reported.insert((code, line)) {
            errors.push(ValidationError::error(code, message).at(line, column));
        }
    };

    let mut pos = 0;
    while let Some(found) = masked[pos..].find('<') {
        let start = pos + found;
        let mut i = start + 1;
        if !bytes.get(i).copied().is_some_and(is_name_start) {
            pos = start + 1;
            continue;
        }
        while i < len && is_name_byte(bytes[i]) {
            i += 1;
        }

        loop {
            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= len || bytes[i] == b'<' {
                break;
            }
            if bytes[i] == b'>' {
                i += 1;
                break;
            }
            if !is_name_start(bytes[i]) {
                i += 1;
                continue;
            }

            let name_start = i;
            while i < len && is_name_byte(bytes[i]) {
                i += 1;
            }
            let name = &masked[name_start..i];
            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if bytes.get(i) != Some(&b'=') {
                report(
                    codes::ATTRIBUTE_WITHOUT_VALUE,
                    name_start,
                    format!("Attribute '{}' has no value", name),
                );
                continue;
            }
            i += 1;
            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }

            match bytes.get(i).copied() {
                Some(quote @ (b'"' | b'\'')) => {
                    let body = &masked[i + 1..];
                    match body.find(|c: char| c == quote as char || c == '<') {
                        Some(k) if bytes[i + 1 + k] == quote => i += k + 2,
                        other => {
                            report(
                                codes::UNCLOSED_QUOTE,
                                name_start,
                                format!("Value of attribute '{}' has an unclosed quote", name),
                            );
                            i = other.map_or(len, |k| i + 1 + k);
                            break;
                        }
                    }
                }
                _ => {
                    report(
                        codes::UNQUOTED_ATTRIBUTE,
                        name_start,
                        format!("Value of attribute '{}' is not quoted", name),
                    );
                    while i < len
                        && !bytes[i].is_ascii_whitespace()
                        && bytes[i] != b'>'
                        && bytes[i] != b'<'
                        && !(bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>'))
                    {
                        i += 1;
                    }
                }
            }
        }
        pos = i.max(start + 1);
    }
    errors
}

/// Per-line quote parity inside tag spans.
///
/// Quote state resets at every newline, so a line that ends with a quote
/// still open is reported at the quote that opened it. Text content between
/// tags is not counted.
fn check_quote_parity(masked: &str, index: &LineIndex<'_>) -> Vec<ValidationError> {
    let bytes = masked.as_bytes();
    let mut errors = Vec::new();
    let mut in_tag = false;
    let mut open_quote: Option<(u8, usize)> = None;

    let report = |offset: usize, quote: u8, errors: &mut Vec<ValidationError>| {
        let (line, column) = index.position(offset);
        errors.push(
            ValidationError::error(
                codes::UNBALANCED_QUOTES,
                format!("Line {} ends inside a {} quoted value", line, quote as char),
            )
            .at(line, column)
            .with_suggestion("Close the attribute value on the same line"),
        );
    };

    for (i, &byte) in bytes.iter().enumerate() {
        match (byte, open_quote) {
            (b'\n', Some((quote, start))) => {
                report(start, quote, &mut errors);
                open_quote = None;
            }
            (b'\n', None) => {}
            (q, Some((quote, _))) if q == quote => open_quote = None,
            (_, Some(_)) => {}
            (b'<', None) => {
                in_tag = bytes
                    .get(i + 1)
                    .copied()
                    .is_some_and(|b| is_name_start(b) || b == b'/');
            }
            (b'>', None) => in_tag = false,
            (q @ (b'"' | b'\''), None) if in_tag => open_quote = Some((q, i)),
            _ => {}
        }
    }
    if let Some((quote, start)) = open_quote {
        report(start, quote, &mut errors);
    }
    errors
}

/// Tag balance, declaration, nesting depth and namespace prefixes
pub struct StructureLayer;

impl Validator for StructureLayer {
    fn validate(&self, content: &str, config: &ParseConfig) -> Vec<ValidationError> {
        let masked = mask_non_element_markup(content);
        let index = LineIndex::new(content);
        let tags = scan_tags(&masked, &index);
        let mut errors = check_tag_balance(&tags);

        if !content.trim_start_matches('\u{FEFF}').trim_start().starts_with("<?xml") {
            errors.push(
                ValidationError::info(codes::MISSING_DECLARATION, "Document has no XML declaration")
                    .at(1, 1)
                    .with_suggestion("Add <?xml version=\"1.0\" encoding=\"UTF-8\"?>"),
            );
        }

        if let Some((depth, tag)) = max_depth(&tags) {
            let limit = config.xml.max_nesting_depth;
            if depth > limit {
                errors.push(
                    ValidationError::error(
                        codes::EXCESSIVE_NESTING,
                        format!("Element nesting depth {} exceeds the limit of {}", depth, limit),
                    )
                    .at(tag.line, tag.column),
                );
            }
        }

        errors.extend(check_namespace_prefixes(&tags));
        errors
    }
}

/// Stack-based balance check over scanned tags.
///
/// A closing tag matching an element deeper in the stack closes it and
/// reports everything above it as unclosed.
pub fn check_tag_balance(tags: &[TagToken<'_>]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut stack: Vec<&TagToken<'_>> = Vec::new();

    for tag in tags {
        match tag.kind {
            TagKind::Open => stack.push(tag),
            TagKind::SelfClosing => {}
            TagKind::Close => {
                if let Some(depth) = stack.iter().rposition(|open| open.name == tag.name) {
                    for unclosed in stack.drain(depth + 1..) {
                        errors.push(unclosed_tag(unclosed));
                    }
                    stack.pop();
                } else if let Some(open) = stack.last() {
                    errors.push(
                        ValidationError::error(
                            codes::MISMATCHED_TAG,
                            format!("Expected </{}> but found </{}>", open.name, tag.name),
                        )
                        .at(tag.line, tag.column),
                    );
                } else {
                    errors.push(
                        ValidationError::error(
                            codes::UNEXPECTED_CLOSING_TAG,
                            format!("Closing tag </{}> has no matching open tag", tag.name),
                        )
                        .at(tag.line, tag.column),
                    );
                }
            }
        }
    }

    errors.extend(stack.into_iter().map(unclosed_tag));
    errors
}

fn unclosed_tag(tag: &TagToken<'_>) -> ValidationError {
    ValidationError::error(codes::UNCLOSED_TAG, format!("Element <{}> is never closed", tag.name))
        .at(tag.line, tag.column)
        .with_suggestion(format!("Add </{}>", tag.name))
}

fn check_namespace_prefixes(tags: &[TagToken<'_>]) -> Vec<ValidationError> {
    let declared: HashSet<&str> = tags
        .iter()
        .flat_map(|tag| namespace_declaration_pattern().captures_iter(tag.attributes))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();

    let mut reported = HashSet::new();
    let mut errors = Vec::new();
    for tag in tags.iter().filter(|t| t.kind != TagKind::Close) {
        let Some(prefix) = tag.prefix() else {
            continue;
        };
        if RESERVED_PREFIXES.contains(&prefix) || declared.contains(prefix) {
            continue;
        }
        if reported.insert(prefix) {
            errors.push(
                ValidationError::warning(
                    codes::UNDEFINED_NAMESPACE_PREFIX,
                    format!("Namespace prefix '{}' is never declared", prefix),
                )
                .at(tag.line, tag.column)
                .with_suggestion(format!("Declare it with xmlns:{}=\"...\"", prefix)),
            );
        }
    }
    errors
}

/// Element naming, empty elements and attribute counts
pub struct QualityLayer;

impl Validator for QualityLayer {
    fn validate(&self, content: &str, _config: &ParseConfig) -> Vec<ValidationError> {
        let masked = mask_non_element_markup(content);
        let index = LineIndex::new(content);
        let tags = scan_tags(&masked, &index);
        let mut errors = Vec::new();
        let mut named = HashSet::new();

        for (i, tag) in tags.iter().enumerate() {
            if tag.kind == TagKind::Close {
                continue;
            }

            let local = tag.name.rsplit(':').next().unwrap_or(tag.name);
            if !camel_case_pattern().is_match(local)
                && !kebab_case_pattern().is_match(local)
                && named.insert(local)
            {
                errors.push(
                    ValidationError::info(
                        codes::NAMING_CONVENTION,
                        format!("Element name '{}' is neither camelCase nor kebab-case", local),
                    )
                    .at(tag.line, tag.column),
                );
            }

            let attribute_count = attribute_pattern().find_iter(tag.attributes).count();
            if attribute_count >= MAX_ATTRIBUTES {
                errors.push(
                    ValidationError::info(
                        codes::TOO_MANY_ATTRIBUTES,
                        format!("Element <{}> has {} attributes", tag.name, attribute_count),
                    )
                    .at(tag.line, tag.column),
                );
            }

            if tag.kind == TagKind::Open {
                if let Some(next) = tags.get(i + 1) {
                    if next.kind == TagKind::Close
                        && next.name == tag.name
                        && content[tag.end..next.offset].trim().is_empty()
                    {
                        errors.push(
                            ValidationError::info(
                                codes::EMPTY_ELEMENT,
                                format!("Element <{}> is empty", tag.name),
                            )
                            .at(tag.line, tag.column)
                            .with_suggestion(format!("Use <{}/>", tag.name)),
                        );
                    }
                }
            }
        }
        errors
    }
}
