//! Validation layers
//!
//! Each format's optional lint stages are small validators selected by the
//! active [`ParseConfig`]. Parsers run the structural checks themselves and
//! then every layer the config enables.

pub mod csv;
pub mod json;
pub mod xml;

use crate::{config::ParseConfig, diagnostics::ValidationError};

/// Trait for validation layers.
///
/// `Input` is the raw text for JSON and XML; CSV layers receive the
/// tokenized records so the file is only split once.
pub trait Validator<Input: ?Sized = str>: Send + Sync {
    fn validate(&self, input: &Input, config: &ParseConfig) -> Vec<ValidationError>;
}

/// Maps byte offsets to 1-based line and column (in characters)
pub(crate) struct LineIndex<'a> {
    content: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub(crate) fn new(content: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(content.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            content,
            line_starts,
        }
    }

    pub(crate) fn position(&self, offset: usize) -> (usize, usize) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let start = self.line_starts[line_idx];
        let end = offset.min(self.content.len());
        let column = self
            .content
            .get(start..end)
            .map_or(0, |prefix| prefix.chars().count());
        (line_idx + 1, column + 1)
    }
}
