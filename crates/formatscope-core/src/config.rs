//! Parser configuration and validation profiles

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Named bundle of lint toggles and thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationProfile {
    /// Every lint on, tight thresholds
    Strict,
    /// Structural and security checks only
    Lenient,
    /// Every lint except strict naming, default thresholds
    #[default]
    Custom,
}

impl std::str::FromStr for ValidationProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown validation profile '{}'", other)),
        }
    }
}

/// Configuration shared by every parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Profile the toggles below were derived from
    pub profile: ValidationProfile,

    /// Codes suppressed from validation output (e.g., ["MISSING_DECLARATION"])
    pub disabled_codes: Vec<String>,

    pub json: JsonOptions,

    pub csv: CsvOptions,

    pub xml: XmlOptions,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self::for_profile(ValidationProfile::Custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonOptions {
    /// File size and line count checks
    pub performance: bool,
    /// Nesting depth, prototype keys and long strings
    pub security: bool,
    /// Size limits, unsafe integers and duplicate keys (requires a decode)
    pub best_practices: bool,
    /// camelCase and reserved-word property names
    pub strict_naming: bool,
    pub max_nesting_depth: usize,
    pub max_array_length: usize,
    pub max_properties: usize,
    pub max_property_name_length: usize,
    pub max_string_length: usize,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            performance: true,
            security: true,
            best_practices: true,
            strict_naming: false,
            max_nesting_depth: 100,
            max_array_length: 10_000,
            max_properties: 1_000,
            max_property_name_length: 100,
            max_string_length: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Explicit delimiter; inferred from content when unset
    pub delimiter: Option<char>,
    pub quote_char: char,
    pub escape_char: char,
    /// Whether the first row holds headers; detected when unset
    pub has_headers: Option<bool>,
    pub skip_empty_lines: bool,
    pub trim_whitespace: bool,
    /// Formula injection and long fields
    pub security: bool,
    /// BOM, line endings, control and replacement characters
    pub encoding: bool,
    /// Delimiter confidence, row consistency, quotes, column count
    pub structure: bool,
    /// Type consistency, null rate, duplicate identifiers
    pub data_quality: bool,
    /// Duplicate, empty, problematic and overlong header names
    pub headers: bool,
    /// Require 90% row-length consistency instead of 70%
    pub strict: bool,
    pub max_columns: usize,
    pub max_field_length: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            quote_char: '"',
            escape_char: '"',
            has_headers: None,
            skip_empty_lines: true,
            trim_whitespace: false,
            security: true,
            encoding: true,
            structure: true,
            data_quality: true,
            headers: true,
            strict: false,
            max_columns: 1_000,
            max_field_length: 10_000,
        }
    }
}

impl CsvOptions {
    pub fn row_consistency_threshold(&self) -> f64 {
        if self.strict {
            0.9
        } else {
            0.7
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlOptions {
    /// Keep whitespace-only text nodes
    pub preserve_whitespace: bool,
    /// XXE, DTD and entity expansion checks
    pub security: bool,
    /// Quote parity, attribute syntax, malformed comments
    pub syntax: bool,
    /// Tag balance, declaration, nesting depth, namespace prefixes
    pub structure: bool,
    /// Naming, empty elements, attribute count
    pub quality: bool,
    pub max_nesting_depth: usize,
    pub max_entity_references: usize,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            preserve_whitespace: false,
            security: true,
            syntax: true,
            structure: true,
            quality: true,
            max_nesting_depth: 100,
            max_entity_references: 1_000,
        }
    }
}

impl ParseConfig {
    /// Build the toggle/threshold bundle for a named profile
    pub fn for_profile(profile: ValidationProfile) -> Self {
        match profile {
            ValidationProfile::Custom => Self {
                profile,
                json: JsonOptions::default(),
                csv: CsvOptions::default(),
                xml: XmlOptions::default(),
                disabled_codes: Vec::new(),
            },
            ValidationProfile::Strict => Self {
                profile,
                json: JsonOptions {
                    strict_naming: true,
                    max_nesting_depth: 20,
                    max_array_length: 1_000,
                    max_properties: 100,
                    max_property_name_length: 50,
                    max_string_length: 5_000,
                    ..JsonOptions::default()
                },
                csv: CsvOptions {
                    strict: true,
                    max_columns: 500,
                    max_field_length: 5_000,
                    ..CsvOptions::default()
                },
                xml: XmlOptions {
                    max_nesting_depth: 50,
                    max_entity_references: 100,
                    ..XmlOptions::default()
                },
                disabled_codes: Vec::new(),
            },
            ValidationProfile::Lenient => Self {
                profile,
                json: JsonOptions {
                    performance: false,
                    best_practices: false,
                    max_nesting_depth: 500,
                    max_string_length: 1_000_000,
                    ..JsonOptions::default()
                },
                csv: CsvOptions {
                    encoding: false,
                    data_quality: false,
                    headers: false,
                    max_field_length: 1_000_000,
                    ..CsvOptions::default()
                },
                xml: XmlOptions {
                    syntax: false,
                    quality: false,
                    max_nesting_depth: 500,
                    max_entity_references: 10_000,
                    ..XmlOptions::default()
                },
                disabled_codes: Vec::new(),
            },
        }
    }

    /// Load config from a TOML file.
    ///
    /// The file's `profile` selects the base bundle; every other key in the
    /// file overrides that bundle.
    pub fn load(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let overrides: toml::Table = toml::from_str(content)?;
        let profile = match overrides.get("profile").and_then(|v| v.as_str()) {
            Some(name) => name.parse().map_err(anyhow::Error::msg)?,
            None => ValidationProfile::default(),
        };

        let mut merged = match toml::Value::try_from(Self::for_profile(profile))? {
            toml::Value::Table(table) => table,
            _ => anyhow::bail!("config did not serialize to a table"),
        };
        merge_tables(&mut merged, overrides);
        Ok(toml::Value::Table(merged).try_into()?)
    }

    /// Load config or use default
    pub fn load_or_default(path: Option<&PathBuf>) -> Self {
        path.and_then(|p| Self::load(p).ok()).unwrap_or_default()
    }

    /// A code is reported unless it is listed in `disabled_codes`
    pub fn is_code_enabled(&self, code: &str) -> bool {
        !self.disabled_codes.iter().any(|c| c.eq_ignore_ascii_case(code))
    }

    /// Drop findings whose code has been disabled
    pub fn filter_disabled(&self, errors: &mut Vec<crate::ValidationError>) {
        if !self.disabled_codes.is_empty() {
            errors.retain(|e| self.is_code_enabled(&e.code));
        }
    }
}

fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_custom_profile() {
        let config = ParseConfig::default();
        assert_eq!(config.profile, ValidationProfile::Custom);
        assert!(config.json.performance);
        assert!(config.json.security);
        assert!(config.json.best_practices);
        assert!(!config.json.strict_naming);
        assert!(config.csv.security);
        assert!(config.xml.quality);
    }

    #[test]
    fn test_strict_profile_tightens_thresholds() {
        let strict = ParseConfig::for_profile(ValidationProfile::Strict);
        let custom = ParseConfig::default();

        assert!(strict.json.strict_naming);
        assert!(strict.json.max_nesting_depth < custom.json.max_nesting_depth);
        assert!(strict.json.max_array_length < custom.json.max_array_length);
        assert!(strict.xml.max_nesting_depth < custom.xml.max_nesting_depth);
        assert_eq!(strict.csv.row_consistency_threshold(), 0.9);
        assert_eq!(custom.csv.row_consistency_threshold(), 0.7);
    }

    #[test]
    fn test_lenient_profile_keeps_security() {
        let lenient = ParseConfig::for_profile(ValidationProfile::Lenient);

        assert!(lenient.json.security);
        assert!(!lenient.json.performance);
        assert!(!lenient.json.best_practices);
        assert!(lenient.csv.security);
        assert!(lenient.csv.structure);
        assert!(!lenient.csv.data_quality);
        assert!(lenient.xml.security);
        assert!(lenient.xml.structure);
        assert!(!lenient.xml.quality);
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!("STRICT".parse::<ValidationProfile>(), Ok(ValidationProfile::Strict));
        assert_eq!("lenient".parse::<ValidationProfile>(), Ok(ValidationProfile::Lenient));
        assert!("paranoid".parse::<ValidationProfile>().is_err());
    }

    #[test]
    fn test_disabled_codes() {
        let mut config = ParseConfig::default();
        config.disabled_codes = vec!["MISSING_DECLARATION".to_string()];

        assert!(!config.is_code_enabled("MISSING_DECLARATION"));
        assert!(!config.is_code_enabled("missing_declaration"));
        assert!(config.is_code_enabled("UNCLOSED_TAG"));

        let mut errors = vec![
            crate::ValidationError::info("MISSING_DECLARATION", "no decl"),
            crate::ValidationError::error("UNCLOSED_TAG", "unclosed"),
        ];
        config.filter_disabled(&mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "UNCLOSED_TAG");
    }

    #[test]
    fn test_toml_deserialization_partial() {
        let toml_str = r#"
profile = "strict"
disabled_codes = ["DTD_DETECTED"]

[csv]
delimiter = ";"
has_headers = true

[xml]
preserve_whitespace = true
"#;

        let config: ParseConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.profile, ValidationProfile::Strict);
        assert_eq!(config.csv.delimiter, Some(';'));
        assert_eq!(config.csv.has_headers, Some(true));
        assert_eq!(config.csv.quote_char, '"');
        assert!(config.xml.preserve_whitespace);
        assert!(config.xml.security);
        assert_eq!(config.json.max_nesting_depth, 100);
        assert!(!config.is_code_enabled("DTD_DETECTED"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ParseConfig::for_profile(ValidationProfile::Strict);
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ParseConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_from_toml_str_uses_profile_as_base() {
        let config = ParseConfig::from_toml_str(
            r#"
profile = "strict"

[json]
max_nesting_depth = 30
"#,
        )
        .unwrap();

        assert_eq!(config.profile, ValidationProfile::Strict);
        assert_eq!(config.json.max_nesting_depth, 30);
        // Untouched keys come from the strict bundle
        assert!(config.json.strict_naming);
        assert_eq!(config.json.max_array_length, 1_000);
    }

    #[test]
    fn test_from_toml_str_rejects_unknown_profile() {
        assert!(ParseConfig::from_toml_str("profile = \"paranoid\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("formatscope.toml");
        std::fs::write(&path, "profile = \"lenient\"\n[csv]\ndelimiter = \"|\"\n").unwrap();

        let config = ParseConfig::load(&path).unwrap();
        assert_eq!(config.profile, ValidationProfile::Lenient);
        assert_eq!(config.csv.delimiter, Some('|'));
        assert!(!config.csv.data_quality);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let missing = PathBuf::from("/definitely/not/here/formatscope.toml");
        let config = ParseConfig::load_or_default(Some(&missing));
        assert_eq!(config, ParseConfig::default());
    }
}
