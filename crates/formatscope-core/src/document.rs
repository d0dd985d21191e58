//! Decoded documents returned by `parse`

use serde::Serialize;

use crate::parsers::csv::CsvData;
use crate::parsers::xml::XmlDocument;

/// A successfully decoded document of any supported format
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", content = "data", rename_all = "lowercase")]
pub enum Document {
    Json(serde_json::Value),
    Csv(CsvData),
    Xml(XmlDocument),
}

impl Document {
    pub fn format(&self) -> &'static str {
        match self {
            Document::Json(_) => "json",
            Document::Csv(_) => "csv",
            Document::Xml(_) => "xml",
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Document::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_csv(&self) -> Option<&CsvData> {
        match self {
            Document::Csv(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_xml(&self) -> Option<&XmlDocument> {
        match self {
            Document::Xml(doc) => Some(doc),
            _ => None,
        }
    }

    /// One-line description used by the CLI
    pub fn summary(&self) -> String {
        match self {
            Document::Json(value) => match value {
                serde_json::Value::Object(map) => format!("JSON object with {} keys", map.len()),
                serde_json::Value::Array(items) => format!("JSON array with {} items", items.len()),
                _ => "JSON scalar".to_string(),
            },
            Document::Csv(data) => format!(
                "CSV with {} columns and {} rows (delimiter {:?})",
                data.columns.len(),
                data.rows.len(),
                data.metadata.delimiter
            ),
            Document::Xml(doc) => {
                let root = doc.root_element().map(|e| e.name.as_str()).unwrap_or("?");
                format!(
                    "XML document rooted at <{}> with {} elements",
                    root,
                    doc.element_count()
                )
            }
        }
    }
}
