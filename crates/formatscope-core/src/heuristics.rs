//! Content heuristics shared by the parsers' `detect` and the detector's
//! enhanced content scoring.
//!
//! Everything here is pure statistics over the raw text. Nothing in this
//! module decides a format on its own; callers weigh the numbers.

use regex::Regex;

use crate::regex_util::static_regex;

/// Delimiters the detector's enhanced CSV heuristic considers
pub const DETECTOR_DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Delimiters the CSV parser considers (adds `:`)
pub const PARSER_DELIMITERS: [char; 5] = [',', ';', '\t', '|', ':'];

/// Number of lines sampled for delimiter statistics
pub const SAMPLE_LINES: usize = 10;

static_regex!(fn date_like_pattern, r"^\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}");
static_regex!(fn currency_like_pattern, r"^[$€£¥]\s*-?[\d,]+(\.\d+)?$|^-?[\d,]+(\.\d+)?\s*[$€£¥]$");
static_regex!(fn xml_tag_pattern, r"<(/?)([A-Za-z_][\w:.\-]*)(?:\s[^<>]*?)?(/?)>");
static_regex!(fn processing_instruction_pattern, r"<\?([A-Za-z_][\w.\-]*)");
static_regex!(fn delimited_line_pattern, r"^[^<>]*[,;\t|][^<>]*$");

const KNOWN_HEADER_WORDS: &[&str] = &[
    "id", "name", "date", "time", "email", "phone", "address", "city", "country", "type",
    "status", "value", "amount", "price", "total", "count", "description", "title", "code",
    "category", "created", "updated", "age", "year", "key", "label", "number",
];

/// A heuristic score before it is labelled with a format
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeuristicScore {
    pub score: f64,
    pub evidence: Vec<String>,
}

impl HeuristicScore {
    fn add(&mut self, points: f64, evidence: String) {
        self.score += points;
        self.evidence.push(evidence);
    }
}

/// First `limit` non-empty lines, with trailing `\r` removed
pub fn sample_lines(content: &str, limit: usize) -> Vec<&str> {
    content
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .take(limit)
        .collect()
}

/// Count `delimiter` occurrences in `line` that sit outside quoted runs
pub fn count_unquoted(line: &str, delimiter: char, quote: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for ch in line.chars() {
        if ch == quote {
            in_quotes = !in_quotes;
        } else if ch == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Per-line occurrence statistics for one candidate delimiter
#[derive(Debug, Clone, PartialEq)]
pub struct DelimiterStats {
    pub delimiter: char,
    pub counts: Vec<usize>,
    pub mean: f64,
    pub variance: f64,
}

impl DelimiterStats {
    pub fn compute(lines: &[&str], delimiter: char, quote: char) -> Self {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_unquoted(line, delimiter, quote))
            .collect();
        let (mean, variance) = mean_and_variance(&counts);
        Self {
            delimiter,
            counts,
            mean,
            variance,
        }
    }

    /// Standard deviation over mean; infinite when the delimiter never occurs
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            return f64::INFINITY;
        }
        self.variance.sqrt() / self.mean
    }

    /// `1 - cv`, clamped at zero
    pub fn cv_consistency(&self) -> f64 {
        if self.mean == 0.0 {
            return 0.0;
        }
        (1.0 - self.coefficient_of_variation()).max(0.0)
    }

    /// `1 - variance / mean`, clamped at zero
    pub fn variance_consistency(&self) -> f64 {
        if self.mean == 0.0 {
            return 0.0;
        }
        (1.0 - self.variance / self.mean).max(0.0)
    }

    /// Score used by the CSV parser: `min(90, mean * 20 * consistency)`
    pub fn parser_score(&self) -> f64 {
        (self.mean * 20.0 * self.variance_consistency()).min(90.0)
    }

    /// Field count of each sampled line when split on this delimiter
    pub fn field_counts(&self) -> Vec<usize> {
        self.counts.iter().map(|c| c + 1).collect()
    }
}

fn mean_and_variance(values: &[usize]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<usize>() as f64 / n;
    let variance = values
        .iter()
        .map(|v| {
            let d = *v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, variance)
}

/// Best delimiter by the CSV parser's score. Ties keep the earlier candidate.
pub fn best_parser_delimiter(lines: &[&str], quote: char) -> Option<DelimiterStats> {
    let mut best: Option<DelimiterStats> = None;
    for delimiter in PARSER_DELIMITERS {
        let stats = DelimiterStats::compute(lines, delimiter, quote);
        if stats.mean == 0.0 {
            continue;
        }
        let better = match &best {
            Some(b) => stats.parser_score() > b.parser_score(),
            None => true,
        };
        if better {
            best = Some(stats);
        }
    }
    best
}

/// Fraction of values equal to the most common value (the mode)
pub fn row_length_consistency(field_counts: &[usize]) -> f64 {
    if field_counts.is_empty() {
        return 0.0;
    }
    let mut tally: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
    for count in field_counts {
        *tally.entry(*count).or_insert(0) += 1;
    }
    let mode_count = tally.values().copied().max().unwrap_or(0);
    mode_count as f64 / field_counts.len() as f64
}

/// Most common field count; ties resolve to the larger count
pub fn mode_field_count(field_counts: &[usize]) -> Option<usize> {
    let mut tally: std::collections::BTreeMap<usize, usize> = std::collections::BTreeMap::new();
    for count in field_counts {
        *tally.entry(*count).or_insert(0) += 1;
    }
    tally
        .into_iter()
        .max_by_key(|(count, freq)| (*freq, *count))
        .map(|(count, _)| count)
}

/// Does the line contain a field that opens with a quote?
pub fn has_quoted_field(line: &str, delimiter: char, quote: char) -> bool {
    let mut at_field_start = true;
    for ch in line.chars() {
        if at_field_start && ch == quote {
            return true;
        }
        if ch == delimiter {
            at_field_start = true;
        } else if !ch.is_whitespace() {
            at_field_start = false;
        }
    }
    false
}

/// Fraction of lines with at least one quoted field
pub fn quoted_line_ratio(lines: &[&str], delimiter: char, quote: char) -> f64 {
    if lines.is_empty() {
        return 0.0;
    }
    let quoted = lines
        .iter()
        .filter(|line| has_quoted_field(line, delimiter, quote))
        .count();
    quoted as f64 / lines.len() as f64
}

/// Is this value shaped like a date (`2024-01-31`, `31/01/2024`, ...)?
pub fn is_date_like(value: &str) -> bool {
    date_like_pattern().is_match(value.trim())
}

/// Is this value shaped like a currency amount (`$1,200.00`, `5 €`)?
pub fn is_currency_like(value: &str) -> bool {
    currency_like_pattern().is_match(value.trim())
}

/// Weighted header-likeness of one field, at most 1.0
pub fn header_field_score(field: &str) -> f64 {
    let field = field.trim().trim_matches('"');
    let lower = field.to_ascii_lowercase();
    let mut score = 0.0;

    if field.chars().any(char::is_alphabetic) {
        score += 0.3;
    }
    if KNOWN_HEADER_WORDS.iter().any(|word| lower.contains(word)) {
        score += 0.3;
    }
    if (1..=50).contains(&field.chars().count()) {
        score += 0.2;
    }
    if !is_date_like(field) && !is_currency_like(field) {
        score += 0.2;
    }
    score
}

/// Average header-likeness over a row's fields
pub fn header_likeness(fields: &[String]) -> f64 {
    if fields.is_empty() {
        return 0.0;
    }
    fields.iter().map(|f| header_field_score(f)).sum::<f64>() / fields.len() as f64
}

/// Enhanced CSV heuristic used by the detector: delimiter consistency,
/// quoted fields and row-length mode over the first ten non-empty lines.
pub fn score_csv_structure(content: &str) -> HeuristicScore {
    let mut result = HeuristicScore::default();
    let trimmed = content.trim_start();
    let lines = sample_lines(content, SAMPLE_LINES);
    if lines.is_empty() {
        return result;
    }

    let best = DETECTOR_DELIMITERS
        .iter()
        .map(|d| DelimiterStats::compute(&lines, *d, '"'))
        .filter(|s| s.mean > 0.0)
        .fold(None::<DelimiterStats>, |best, stats| match best {
            Some(b) if b.cv_consistency() >= stats.cv_consistency() => Some(b),
            _ => Some(stats),
        });

    if let Some(stats) = best {
        let consistency = stats.cv_consistency();
        if consistency >= 0.3 {
            result.add(
                consistency * 40.0,
                format!(
                    "Delimiter {:?} appears consistently ({:.0}% consistency)",
                    stats.delimiter,
                    consistency * 100.0
                ),
            );

            let quoted = quoted_line_ratio(&lines, stats.delimiter, '"');
            if quoted > 0.0 {
                result.add(quoted * 20.0, "Quoted fields present".to_string());
            }

            let rows = row_length_consistency(&stats.field_counts());
            if rows >= 0.7 {
                result.add(
                    20.0,
                    format!("{:.0}% of rows share the same field count", rows * 100.0),
                );
            }
        }
    }

    if trimmed.starts_with('<') {
        result.add(-30.0, "Starts with '<' (markup, not CSV)".to_string());
    } else if trimmed.starts_with('{') || trimmed.starts_with('[') {
        result.add(-25.0, "Starts with a JSON bracket".to_string());
    }

    result
}

/// Tag statistics for XML-ish content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlTagStats {
    pub tag_count: usize,
    /// Open/close pairs matched on a stack count 2, self-closing tags count 1
    pub well_formed: usize,
    pub has_namespaces: bool,
    pub has_cdata: bool,
    pub has_processing_instructions: bool,
    pub has_comments: bool,
}

impl XmlTagStats {
    pub fn well_formed_ratio(&self) -> f64 {
        if self.tag_count == 0 {
            return 0.0;
        }
        self.well_formed as f64 / self.tag_count as f64
    }
}

pub fn xml_tag_stats(content: &str) -> XmlTagStats {
    let mut stats = XmlTagStats::default();
    let mut stack: Vec<&str> = Vec::new();

    for caps in xml_tag_pattern().captures_iter(content) {
        stats.tag_count += 1;
        let closing = !caps[1].is_empty();
        let self_closing = !caps[3].is_empty();
        let name = caps.get(2).map_or("", |m| m.as_str());

        if self_closing {
            stats.well_formed += 1;
        } else if closing {
            if stack.last() == Some(&name) {
                stack.pop();
                stats.well_formed += 2;
            }
        } else {
            stack.push(name);
        }
    }

    stats.has_namespaces = content.contains("xmlns");
    stats.has_cdata = content.contains("<![CDATA[");
    stats.has_processing_instructions = processing_instruction_pattern()
        .captures_iter(content)
        .any(|caps| !caps[1].eq_ignore_ascii_case("xml"));
    stats.has_comments = content.contains("<!--");
    stats
}

/// Enhanced XML heuristic: declaration, tag count and balance, and the
/// presence of namespaces, CDATA, processing instructions and comments.
pub fn score_xml_structure(content: &str) -> HeuristicScore {
    let mut result = HeuristicScore::default();
    let trimmed = content.trim_start();

    if trimmed.starts_with("<?xml") {
        result.add(40.0, "XML declaration found".to_string());
    }

    let stats = xml_tag_stats(content);
    if stats.tag_count > 0 {
        let points = (stats.tag_count as f64 * 2.0).min(25.0);
        result.add(points, format!("{} tags found", stats.tag_count));
        let ratio = stats.well_formed_ratio();
        if ratio >= 0.5 {
            result.add(
                20.0,
                format!("{:.0}% of tags are well-formed", ratio * 100.0),
            );
        }
    }
    if stats.has_namespaces {
        result.add(15.0, "Namespace declarations found".to_string());
    }
    if stats.has_cdata {
        result.add(10.0, "CDATA sections found".to_string());
    }
    if stats.has_processing_instructions {
        result.add(10.0, "Processing instructions found".to_string());
    }
    if stats.has_comments {
        result.add(5.0, "XML comments found".to_string());
    }

    let first_line = trimmed.lines().next().unwrap_or("");
    if !first_line.starts_with('<') && delimited_line_pattern().is_match(first_line) {
        result.add(-20.0, "First line looks delimited".to_string());
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        result.add(-30.0, "Starts with a JSON bracket".to_string());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_lines_skips_blank_and_caps() {
        let content = "a,b\n\n  \nc,d\r\n".to_string() + &"x,y\n".repeat(20);
        let lines = sample_lines(&content, SAMPLE_LINES);
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "a,b");
        assert_eq!(lines[1], "c,d");
    }

    #[test]
    fn test_count_unquoted_ignores_quoted_delimiters() {
        assert_eq!(count_unquoted(r#"a,"b,c",d"#, ',', '"'), 2);
        assert_eq!(count_unquoted("a;b;c", ',', '"'), 0);
    }

    #[test]
    fn test_delimiter_stats_perfectly_consistent() {
        let lines = ["a,b,c", "1,2,3", "4,5,6"];
        let stats = DelimiterStats::compute(&lines, ',', '"');
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.cv_consistency(), 1.0);
        assert_eq!(stats.variance_consistency(), 1.0);
        assert_eq!(stats.parser_score(), 40.0);
    }

    #[test]
    fn test_delimiter_stats_absent_delimiter() {
        let lines = ["abc", "def"];
        let stats = DelimiterStats::compute(&lines, '|', '"');
        assert_eq!(stats.cv_consistency(), 0.0);
        assert_eq!(stats.parser_score(), 0.0);
        assert!(stats.coefficient_of_variation().is_infinite());
    }

    #[test]
    fn test_best_parser_delimiter_prefers_semicolon() {
        let lines = ["a;b;c", "1;2,5;3", "4;5;6"];
        let best = best_parser_delimiter(&lines, '"').unwrap();
        assert_eq!(best.delimiter, ';');
    }

    #[test]
    fn test_row_length_consistency() {
        assert_eq!(row_length_consistency(&[3, 3, 3, 2]), 0.75);
        assert_eq!(row_length_consistency(&[]), 0.0);
        assert_eq!(mode_field_count(&[2, 3, 3, 2]), Some(3));
    }

    #[test]
    fn test_has_quoted_field() {
        assert!(has_quoted_field(r#"a,"b",c"#, ',', '"'));
        assert!(has_quoted_field(r#""a",b"#, ',', '"'));
        assert!(!has_quoted_field(r#"a,b"c",d"#, ',', '"'));
    }

    #[test]
    fn test_header_likeness() {
        let headers = vec!["id".to_string(), "name".to_string(), "email".to_string()];
        let data = vec!["2024-01-01".to_string(), "$5.00".to_string(), "42".to_string()];
        assert!(header_likeness(&headers) > 0.9);
        assert!(header_likeness(&data) < 0.5);
    }

    #[test]
    fn test_score_csv_structure_for_csv() {
        let csv = "name,age,city\nada,36,london\nalan,41,wilmslow\n";
        let score = score_csv_structure(csv);
        assert!(score.score >= 60.0, "score was {}", score.score);
    }

    #[test]
    fn test_score_csv_structure_penalizes_markup() {
        let xml = "<root><a>1,2</a></root>";
        assert!(score_csv_structure(xml).score <= 0.0);
    }

    #[test]
    fn test_xml_tag_stats_counts_pairs_and_self_closing() {
        let stats = xml_tag_stats(r#"<root><item id="1">x</item><br/></root>"#);
        assert_eq!(stats.tag_count, 5);
        assert_eq!(stats.well_formed, 5);
        assert_eq!(stats.well_formed_ratio(), 1.0);
    }

    #[test]
    fn test_xml_tag_stats_unbalanced() {
        let stats = xml_tag_stats("<root><item>text</root>");
        assert_eq!(stats.tag_count, 3);
        assert_eq!(stats.well_formed, 0);
    }

    #[test]
    fn test_processing_instruction_excludes_declaration() {
        assert!(!xml_tag_stats("<?xml version=\"1.0\"?><a/>").has_processing_instructions);
        assert!(xml_tag_stats("<?xml-stylesheet href=\"a.xsl\"?><a/>").has_processing_instructions);
    }

    #[test]
    fn test_score_xml_structure() {
        let xml = "<?xml version=\"1.0\"?>\n<!-- c -->\n<root xmlns:a=\"urn:a\"><a:b/></root>";
        let score = score_xml_structure(xml);
        assert!(score.score > 80.0, "score was {}", score.score);

        let json = r#"{"a": "<b>"}"#;
        assert!(score_xml_structure(json).score < 50.0);
    }
}
