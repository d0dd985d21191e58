//! End-to-end behavior of the engine through its public API

use std::sync::Arc;

use formatscope_core::{
    analyze_content, codes,
    parsers::{csv::parse_row, xml::XmlNodeKind},
    CsvParser, DetectOptions, FormatDetector, FormatParser, FormatRegistry, JsonParser,
    ParseConfig, ParseOptions, Severity, XmlParser,
};

fn registry() -> Arc<FormatRegistry> {
    Arc::new(FormatRegistry::with_defaults())
}

#[test]
fn json_trailing_comma_is_invalid() {
    let result = registry().parse(
        r#"{"a":1,}"#,
        &ParseOptions::with_format("json"),
        &ParseConfig::default(),
    );

    assert!(!result.is_valid);
    assert!(result.data.is_none());
    assert!(result.has_code(codes::SYNTAX_ERROR), "{:?}", result.errors);
    assert!(result.blocking_errors().count() >= 1);
}

#[test]
fn csv_formula_injection_is_an_error() {
    let errors = CsvParser::new().validate("Name,Val\n=SUM(1+1),x", &ParseConfig::default());

    let hit = errors
        .iter()
        .find(|e| e.code == codes::CSV_INJECTION)
        .expect("injection finding");
    assert_eq!(hit.severity, Severity::Error);
}

#[test]
fn csv_formula_injection_blocks_parse() {
    let result = registry().parse(
        "Name,Val\n=SUM(1+1),x",
        &ParseOptions::with_format("csv"),
        &ParseConfig::default(),
    );
    assert!(!result.is_valid);
    assert!(result.data.is_none());
}

#[test]
fn xml_unclosed_tag_on_line_one() {
    let errors = XmlParser::new().validate("<root><item>text</root>", &ParseConfig::default());

    let unclosed = errors
        .iter()
        .find(|e| e.code == codes::UNCLOSED_TAG)
        .expect("unclosed tag finding");
    assert_eq!(unclosed.line, Some(1));
    assert!(unclosed.message.contains("item"));
}

#[test]
fn xml_tree_shape() {
    let result = XmlParser::new().parse(
        r#"<root><item id="1">x</item></root>"#,
        &ParseConfig::default(),
    );
    assert!(result.is_valid, "{:?}", result.errors);

    let doc = result.data.as_ref().and_then(|d| d.as_xml()).unwrap();
    assert_eq!(doc.root_element().unwrap().name, "root");

    let items: Vec<_> = doc.child_elements(doc.root).collect();
    assert_eq!(items.len(), 1);
    let (item_id, item) = items[0];
    assert_eq!(item.name, "item");
    assert_eq!(item.attributes.len(), 1);
    assert_eq!(item.attributes[0].name, "id");
    assert_eq!(item.attributes[0].value, "1");

    let children: Vec<_> = doc.children(item_id).collect();
    assert_eq!(children.len(), 1);
    assert_eq!(
        children[0].1.kind,
        XmlNodeKind::Text {
            value: "x".to_string()
        }
    );
    assert_eq!(doc.parent(item_id), Some(doc.root));
}

#[test]
fn xml_declared_prefix_resolves() {
    let result = XmlParser::new().parse(r#"<a xmlns:p="u1"><p:b/></a>"#, &ParseConfig::default());
    assert!(result.is_valid, "{:?}", result.errors);
    assert!(!result.has_code(codes::UNDEFINED_NAMESPACE_PREFIX));

    let doc = result.data.as_ref().and_then(|d| d.as_xml()).unwrap();
    let (_, b) = doc.child_elements(doc.root).next().unwrap();
    assert_eq!(b.namespace.as_deref(), Some("u1"));
}

#[test]
fn xml_undeclared_prefix_is_a_warning() {
    let result = XmlParser::new().parse("<a><p:b/></a>", &ParseConfig::default());

    let warning = result
        .errors
        .iter()
        .find(|e| e.code == codes::UNDEFINED_NAMESPACE_PREFIX)
        .expect("undefined prefix finding");
    assert_eq!(warning.severity, Severity::Warning);
    assert!(result.is_valid);

    let doc = result.data.as_ref().and_then(|d| d.as_xml()).unwrap();
    let (_, b) = doc.child_elements(doc.root).next().unwrap();
    assert_eq!(b.prefix.as_deref(), Some("p"));
    assert_eq!(b.namespace, None);
}

#[test]
fn csv_tokenizer_quotes() {
    assert_eq!(parse_row(r#"a,"b,c",d"#, ',', '"', '"'), vec!["a", "b,c", "d"]);
    assert_eq!(parse_row(r#""a""b""#, ',', '"', '"'), vec![r#"a"b"#]);
}

#[test]
fn filename_hint_does_not_overturn_json_signature() {
    let detector = FormatDetector::new(registry());
    let options = DetectOptions {
        filename: Some("x.csv"),
        ..DetectOptions::uncached()
    };

    let result = detector.detect(r#"{"id": 1, "tags": ["a", "b"]}"#, &options);
    assert_eq!(result.format, "json");
}

#[test]
fn registry_filename_bonus_does_not_overturn_json() {
    let result = registry().detect_format(r#"{"id": 1, "tags": ["a", "b"]}"#, Some("x.csv"), None);
    assert_eq!(result.format, "json");
}

#[test]
fn detect_is_idempotent() {
    let detector = FormatDetector::new(registry());
    let content = "<?xml version=\"1.0\"?>\n<feed><entry>1</entry></feed>";

    let first = detector.detect(content, &DetectOptions::uncached());
    let second = detector.detect(content, &DetectOptions::uncached());
    assert_eq!(first, second);
}

#[test]
fn json_round_trip() {
    let input = r#"{"name": "Ada", "langs": ["en", "fr"], "age": 36, "admin": false, "meta": null}"#;
    let native: serde_json::Value = serde_json::from_str(input).unwrap();

    let first = JsonParser::new().parse(input, &ParseConfig::default());
    let decoded = first.data.as_ref().and_then(|d| d.as_json()).unwrap();
    assert_eq!(decoded, &native);

    let reserialized = serde_json::to_string(decoded).unwrap();
    let second = JsonParser::new().parse(&reserialized, &ParseConfig::default());
    assert_eq!(second.data.as_ref().and_then(|d| d.as_json()), Some(&native));
}

#[test]
fn analyze_routes_each_format() {
    let detector = FormatDetector::new(registry());
    let config = ParseConfig::default();

    let cases = [
        (r#"[{"id": 1}, {"id": 2}]"#, None, "json"),
        ("id,name,active\n1,ada,true\n2,alan,false\n", Some("people.csv"), "csv"),
        (
            "<?xml version=\"1.0\"?>\n<catalog><book id=\"1\">Dune</book></catalog>",
            None,
            "xml",
        ),
    ];

    for (content, filename, expected) in cases {
        let analysis = analyze_content(content, filename, &detector, &config);
        assert_eq!(analysis.detection.format, expected, "{}", content);
        assert!(analysis.result.is_valid, "{:?}", analysis.result.errors);
        assert_eq!(
            analysis.result.data.as_ref().map(|d| d.format()),
            Some(expected)
        );
    }
}

#[test]
fn unregistered_format_is_not_detected() {
    let mut registry = FormatRegistry::new();
    registry.register(Arc::new(JsonParser::new())).unwrap();
    let detector = FormatDetector::new(Arc::new(registry));

    let result = detector.detect("<root><a>1</a></root>", &DetectOptions::uncached());
    assert_ne!(result.format, "xml");
}
