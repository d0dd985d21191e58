//! Multi-signal format detection with a bounded result cache
//!
//! Four independent methods (signature, MIME type, filename, content) each
//! nominate at most one format. Nominations are grouped by format and
//! averaged with per-method weights; the best average wins.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{Arc, Mutex, PoisonError},
};

use regex::Regex;

use crate::{
    diagnostics::{clamp_confidence, DetectionResult},
    file_utils::extension_of,
    heuristics::{score_csv_structure, score_xml_structure},
    regex_util::static_regex,
    registry::{rank_candidates, FormatRegistry},
};

/// Cached detections kept before the oldest is evicted
pub const DEFAULT_CACHE_CAPACITY: usize = 100;
/// Leading characters hashed into the cache key
pub const CACHE_KEY_CHARS: usize = 1000;

const SIGNATURE_CONFIDENCE: f64 = 95.0;
const MIME_CONFIDENCE: f64 = 80.0;
const FILENAME_CONFIDENCE: f64 = 70.0;

const SIGNATURE_WEIGHT: f64 = 1.0;
const MIME_WEIGHT: f64 = 0.8;
const FILENAME_WEIGHT: f64 = 0.6;
const CONTENT_WEIGHT: f64 = 0.5;

static_regex!(fn json_signature, r#"^(?:\{\s*(?:"|\})|\[\s*(?:[\[\{"\]\-0-9]|true\b|false\b|null\b))"#);
static_regex!(fn xml_declaration_signature, r"^<\?xml\s");
static_regex!(fn xml_markup_signature, r"^<(?:!DOCTYPE\s|!--|[A-Za-z_][\w:.\-]*[\s/>])");
static_regex!(fn csv_comma_signature, r#"^[A-Za-z_"][\w\-" ]*(?:,[A-Za-z_"][\w\-" ]*)+\r?\n[^\n]*,"#);
static_regex!(fn csv_tab_signature, r#"^[A-Za-z_"][\w\-" ]*(?:\t[A-Za-z_"][\w\-" ]*)+\r?\n[^\n]*\t"#);

struct Signature {
    format: &'static str,
    description: &'static str,
    pattern: fn() -> &'static Regex,
}

/// Checked in order; the first match wins
const SIGNATURES: &[Signature] = &[
    Signature {
        format: "json",
        description: "JSON object or array opener",
        pattern: json_signature,
    },
    Signature {
        format: "xml",
        description: "XML declaration",
        pattern: xml_declaration_signature,
    },
    Signature {
        format: "xml",
        description: "XML markup opener",
        pattern: xml_markup_signature,
    },
    Signature {
        format: "csv",
        description: "comma-separated header row",
        pattern: csv_comma_signature,
    },
    Signature {
        format: "csv",
        description: "tab-separated header row",
        pattern: csv_tab_signature,
    },
];

/// Hints and cache control for [`FormatDetector::detect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectOptions<'a> {
    pub filename: Option<&'a str>,
    pub mime_type: Option<&'a str>,
    pub use_cache: bool,
}

impl Default for DetectOptions<'_> {
    fn default() -> Self {
        Self {
            filename: None,
            mime_type: None,
            use_cache: true,
        }
    }
}

impl<'a> DetectOptions<'a> {
    pub fn uncached() -> Self {
        Self {
            use_cache: false,
            ..Self::default()
        }
    }
}

/// Insertion-ordered cache. Re-inserting a key replaces its value but keeps
/// its age; the oldest insertion is evicted first.
#[derive(Debug)]
struct DetectionCache {
    capacity: usize,
    order: VecDeque<String>,
    entries: HashMap<String, DetectionResult>,
}

impl DetectionCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            entries: HashMap::with_capacity(capacity),
        }
    }

    fn get(&self, key: &str) -> Option<DetectionResult> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: String, value: DetectionResult) {
        if self.capacity == 0 {
            return;
        }
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = value;
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                tracing::debug!(key = %oldest, "evicted cached detection");
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// `h = h * 31 + c` over the leading characters, wrapping at 32 bits, then
/// made non-negative
pub fn content_hash(content: &str) -> u32 {
    content
        .chars()
        .take(CACHE_KEY_CHARS)
        .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(c as i32))
        .unsigned_abs()
}

pub fn cache_key(content: &str, filename: Option<&str>, mime_type: Option<&str>) -> String {
    format!(
        "{}-{}-{}",
        content_hash(content),
        filename.unwrap_or_default(),
        mime_type.unwrap_or_default()
    )
}

/// Detection layered over a [`FormatRegistry`]
pub struct FormatDetector {
    registry: Arc<FormatRegistry>,
    cache: Mutex<DetectionCache>,
}

impl std::fmt::Debug for FormatDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatDetector")
            .field("registry", &self.registry)
            .field("cached", &self.cache_len())
            .finish()
    }
}

impl FormatDetector {
    pub fn new(registry: Arc<FormatRegistry>) -> Self {
        Self::with_cache_capacity(registry, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(registry: Arc<FormatRegistry>, capacity: usize) -> Self {
        Self {
            registry,
            cache: Mutex::new(DetectionCache::new(capacity)),
        }
    }

    pub fn registry(&self) -> &Arc<FormatRegistry> {
        &self.registry
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, DetectionCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    /// First matching magic pattern over the trimmed content, at a flat 95.
    /// Signatures for unregistered formats are skipped.
    pub fn detect_by_signature(&self, content: &str) -> DetectionResult {
        let trimmed = content.trim();
        SIGNATURES
            .iter()
            .filter(|s| self.registry.get(s.format).is_some())
            .find(|s| (s.pattern)().is_match(trimmed))
            .map_or_else(DetectionResult::unknown, |s| {
                DetectionResult::new(
                    s.format,
                    SIGNATURE_CONFIDENCE,
                    vec![format!("Matches {} signature", s.description)],
                )
            })
    }

    /// 70 when the filename's extension is registered
    pub fn detect_by_filename(&self, filename: &str) -> DetectionResult {
        let Some(ext) = extension_of(filename) else {
            return DetectionResult::unknown();
        };
        match self.registry.get_by_extension(&ext) {
            Some(parser) => DetectionResult::new(
                parser.name(),
                FILENAME_CONFIDENCE,
                vec![format!("Extension .{} maps to {}", ext, parser.name())],
            ),
            None => DetectionResult::unknown(),
        }
    }

    /// 80 when the MIME type is registered
    pub fn detect_by_mime_type(&self, mime_type: &str) -> DetectionResult {
        match self.registry.get_by_mime_type(mime_type) {
            Some(parser) => DetectionResult::new(
                parser.name(),
                MIME_CONFIDENCE,
                vec![format!("MIME type {} maps to {}", mime_type, parser.name())],
            ),
            None => DetectionResult::unknown(),
        }
    }

    /// Every parser's own `detect` plus the shared CSV and XML structure
    /// heuristics; per format the highest score is kept.
    pub fn detect_by_content(&self, content: &str) -> DetectionResult {
        let mut best_per_format: BTreeMap<String, (u8, Vec<String>)> = BTreeMap::new();
        let mut offer = |format: &str, confidence: u8, evidence: Vec<String>| {
            if confidence == 0 {
                return;
            }
            match best_per_format.get(format) {
                Some((current, _)) if *current >= confidence => {}
                _ => {
                    best_per_format.insert(format.to_string(), (confidence, evidence));
                }
            }
        };

        for parser in self.registry.parsers() {
            let result = parser.detect(content);
            offer(parser.name(), result.confidence, result.evidence);
        }
        if self.registry.get("csv").is_some() {
            let heuristic = score_csv_structure(content);
            offer("csv", clamp_confidence(heuristic.score), heuristic.evidence);
        }
        if self.registry.get("xml").is_some() {
            let heuristic = score_xml_structure(content);
            offer("xml", clamp_confidence(heuristic.score), heuristic.evidence);
        }

        let mut candidates: Vec<(String, u8, Vec<String>)> = best_per_format
            .into_iter()
            .map(|(format, (confidence, evidence))| (format, confidence, evidence))
            .collect();
        rank_candidates(&mut candidates);
        candidates
            .into_iter()
            .next()
            .map_or_else(DetectionResult::unknown, |(format, confidence, evidence)| {
                DetectionResult {
                    format,
                    confidence,
                    evidence,
                }
            })
    }

    /// Run every method, weight each nomination (signature 1.0, MIME 0.8,
    /// filename 0.6, content 0.5) and return the format with the best
    /// weighted average.
    pub fn detect(&self, content: &str, options: &DetectOptions<'_>) -> DetectionResult {
        let key = options
            .use_cache
            .then(|| cache_key(content, options.filename, options.mime_type));
        if let Some(key) = &key {
            if let Some(hit) = self.lock_cache().get(key) {
                tracing::debug!(key = %key, format = %hit.format, "detection cache hit");
                return hit;
            }
        }

        let result = self.detect_uncached(content, options);

        if let Some(key) = key {
            tracing::debug!(key = %key, format = %result.format, "caching detection");
            self.lock_cache().insert(key, result.clone());
        }
        result
    }

    fn detect_uncached(&self, content: &str, options: &DetectOptions<'_>) -> DetectionResult {
        let mut nominations = vec![(self.detect_by_signature(content), SIGNATURE_WEIGHT)];
        if let Some(mime_type) = options.mime_type {
            nominations.push((self.detect_by_mime_type(mime_type), MIME_WEIGHT));
        }
        if let Some(filename) = options.filename {
            nominations.push((self.detect_by_filename(filename), FILENAME_WEIGHT));
        }
        nominations.push((self.detect_by_content(content), CONTENT_WEIGHT));

        // format -> (weighted sum, weight sum, evidence)
        let mut grouped: BTreeMap<String, (f64, f64, Vec<String>)> = BTreeMap::new();
        for (result, weight) in nominations {
            if result.is_unknown() || result.confidence == 0 {
                continue;
            }
            let entry = grouped.entry(result.format).or_default();
            entry.0 += f64::from(result.confidence) * weight;
            entry.1 += weight;
            entry.2.extend(result.evidence);
        }

        let mut candidates: Vec<(String, u8, Vec<String>)> = grouped
            .into_iter()
            .map(|(format, (sum, weights, evidence))| {
                (format, clamp_confidence(sum / weights), evidence)
            })
            .collect();
        rank_candidates(&mut candidates);

        let mut ranked = candidates.into_iter();
        let Some((format, confidence, mut evidence)) = ranked.next() else {
            return DetectionResult::unknown();
        };
        for (alternative, alternative_confidence, _) in ranked {
            evidence.push(format!(
                "Alternative: {} ({}%)",
                alternative, alternative_confidence
            ));
        }
        tracing::debug!(format = %format, confidence, "detected format");
        DetectionResult {
            format,
            confidence,
            evidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> FormatDetector {
        FormatDetector::new(Arc::new(FormatRegistry::with_defaults()))
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(content_hash(""), 0);
        assert_eq!(content_hash("a"), 97);
        assert_eq!(content_hash("ab"), 97 * 31 + 98);
    }

    #[test]
    fn test_content_hash_only_reads_prefix() {
        let base = "x".repeat(CACHE_KEY_CHARS);
        assert_eq!(
            content_hash(&format!("{}tail one", base)),
            content_hash(&format!("{}tail two", base))
        );
    }

    #[test]
    fn test_cache_key_includes_hints() {
        assert_eq!(cache_key("a", Some("x.csv"), None), "97-x.csv-");
        assert_ne!(cache_key("a", None, None), cache_key("a", None, Some("text/csv")));
    }

    #[test]
    fn test_cache_evicts_oldest_insertion() {
        let mut cache = DetectionCache::new(2);
        cache.insert("a".to_string(), DetectionResult::unknown());
        cache.insert("b".to_string(), DetectionResult::unknown());
        // replacing a value does not make it younger
        cache.insert("a".to_string(), DetectionResult::new("json", 90.0, vec![]));
        cache.insert("c".to_string(), DetectionResult::unknown());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_signature_methods() {
        let d = detector();
        assert_eq!(d.detect_by_signature(r#"  {"a": 1}"#).format, "json");
        assert_eq!(d.detect_by_signature(r#"  {"a": 1}"#).confidence, 95);
        assert_eq!(d.detect_by_signature("[1, 2]").format, "json");
        assert_eq!(d.detect_by_signature("<?xml version=\"1.0\"?><r/>").format, "xml");
        assert_eq!(d.detect_by_signature("<root>x</root>").format, "xml");
        assert_eq!(d.detect_by_signature("name,age\nada,36\n").format, "csv");
        assert_eq!(d.detect_by_signature("id\tname\n1\tada\n").format, "csv");
        assert!(d.detect_by_signature("Hello, world\nhow are you").is_unknown());
        assert_eq!(d.detect_by_signature("plain words").confidence, 0);
    }

    #[test]
    fn test_filename_method() {
        let d = detector();
        let result = d.detect_by_filename("data/People.CSV");
        assert_eq!((result.format.as_str(), result.confidence), ("csv", 70));
        assert!(d.detect_by_filename("README").is_unknown());
        assert!(d.detect_by_filename("trailing.").is_unknown());
        assert!(d.detect_by_filename("notes.txt").is_unknown());
    }

    #[test]
    fn test_mime_method() {
        let d = detector();
        let result = d.detect_by_mime_type("application/json");
        assert_eq!((result.format.as_str(), result.confidence), ("json", 80));
        assert!(d.detect_by_mime_type("application/pdf").is_unknown());
    }

    #[test]
    fn test_content_method_prefers_strongest_format() {
        let d = detector();
        assert_eq!(d.detect_by_content(r#"{"a": true}"#).format, "json");
        assert_eq!(
            d.detect_by_content("<?xml version=\"1.0\"?>\n<root><a>1</a></root>").format,
            "xml"
        );
    }

    #[test]
    fn test_signature_outweighs_filename_hint() {
        let d = detector();
        let options = DetectOptions {
            filename: Some("x.csv"),
            ..DetectOptions::uncached()
        };
        let result = d.detect(r#"{"id": 1, "name": "Ada"}"#, &options);
        assert_eq!(result.format, "json");
        assert!(result.evidence.iter().any(|e| e.starts_with("Alternative: csv")));
    }

    #[test]
    fn test_weighted_average() {
        let d = detector();
        // signature 95 @ 1.0, MIME 80 @ 0.8 and content 95 @ 0.5 all say json
        let options = DetectOptions {
            mime_type: Some("application/json"),
            ..DetectOptions::uncached()
        };
        let result = d.detect(r#"{"name": "Ada", "active": true}"#, &options);
        assert_eq!(result.format, "json");
        let expected = (95.0 * 1.0 + 80.0 * 0.8 + 95.0 * 0.5) / (1.0 + 0.8 + 0.5);
        assert_eq!(result.confidence, clamp_confidence(expected));
    }

    #[test]
    fn test_nothing_found_is_unknown() {
        let d = detector();
        let result = d.detect("", &DetectOptions::uncached());
        assert!(result.is_unknown());
        assert_eq!(result.confidence, 0);
    }

    #[test]
    fn test_detect_is_idempotent_without_cache() {
        let d = detector();
        let content = "id;name\n1;ada\n2;alan\n";
        let first = d.detect(content, &DetectOptions::uncached());
        let second = d.detect(content, &DetectOptions::uncached());
        assert_eq!(first, second);
        assert_eq!(d.cache_len(), 0);
    }

    #[test]
    fn test_cache_hits_and_clear() {
        let d = detector();
        let first = d.detect("<r/>", &DetectOptions::default());
        let second = d.detect("<r/>", &DetectOptions::default());
        assert_eq!(first, second);
        assert_eq!(d.cache_len(), 1);

        d.detect(
            "<r/>",
            &DetectOptions {
                filename: Some("r.xml"),
                ..DetectOptions::default()
            },
        );
        assert_eq!(d.cache_len(), 2);

        d.clear_cache();
        assert_eq!(d.cache_len(), 0);
    }

    #[test]
    fn test_detector_capacity() {
        let d = FormatDetector::with_cache_capacity(Arc::new(FormatRegistry::with_defaults()), 3);
        for i in 0..10 {
            d.detect(&format!("[{}]", i), &DetectOptions::default());
        }
        assert_eq!(d.cache_len(), 3);
    }
}
