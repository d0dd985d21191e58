//! Input sanitization boundary used by the XML parser

use std::borrow::Cow;

use regex::Regex;
use thiserror::Error;

use crate::regex_util::static_regex;

/// Default ceiling for sanitized input (50 MiB)
pub const DEFAULT_MAX_INPUT_SIZE: usize = 50 * 1024 * 1024;

const MAX_ERROR_MESSAGE_CHARS: usize = 500;

static_regex!(fn absolute_path_pattern, r#"(?:[A-Za-z]:\\|/)(?:[^\s/\\:*?"'<>|]+[/\\])+[^\s/\\:*?"'<>|]*"#);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    #[error("Input of {size} bytes exceeds the {limit} byte limit")]
    InputTooLarge { size: usize, limit: usize },

    #[error("Input rejected: {reason}")]
    Rejected { reason: String },
}

/// Sanitizes untrusted input before parsing and scrubs error text before it
/// is shown to callers.
pub trait SecurityManager: Send + Sync {
    /// Return the content to parse, possibly rewritten, or refuse it.
    fn sanitize_input<'a>(
        &self,
        content: &'a str,
        format_hint: &str,
    ) -> Result<Cow<'a, str>, SecurityError>;

    fn sanitize_error_message(&self, message: &str) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultSecurityManager {
    pub max_input_size: usize,
}

impl Default for DefaultSecurityManager {
    fn default() -> Self {
        Self {
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
        }
    }
}

impl DefaultSecurityManager {
    pub fn with_max_input_size(max_input_size: usize) -> Self {
        Self { max_input_size }
    }
}

impl SecurityManager for DefaultSecurityManager {
    fn sanitize_input<'a>(
        &self,
        content: &'a str,
        format_hint: &str,
    ) -> Result<Cow<'a, str>, SecurityError> {
        if content.len() > self.max_input_size {
            tracing::debug!(
                format = format_hint,
                size = content.len(),
                "rejecting oversized input"
            );
            return Err(SecurityError::InputTooLarge {
                size: content.len(),
                limit: self.max_input_size,
            });
        }
        if content.contains('\0') {
            return Ok(Cow::Owned(content.replace('\0', "")));
        }
        Ok(Cow::Borrowed(content))
    }

    fn sanitize_error_message(&self, message: &str) -> String {
        let cleaned: String = message
            .chars()
            .map(|c| if c.is_control() && c != '\n' { ' ' } else { c })
            .collect();
        let cleaned = absolute_path_pattern().replace_all(&cleaned, "<path>");
        if cleaned.chars().count() > MAX_ERROR_MESSAGE_CHARS {
            let mut truncated: String = cleaned.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
            truncated.push_str("...");
            truncated
        } else {
            cleaned.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_clean_input_through_borrowed() {
        let manager = DefaultSecurityManager::default();
        let out = manager.sanitize_input("<a/>", "xml").unwrap();
        assert!(matches!(out, Cow::Borrowed("<a/>")));
    }

    #[test]
    fn test_strips_nul_characters() {
        let manager = DefaultSecurityManager::default();
        let out = manager.sanitize_input("<a>\0x</a>", "xml").unwrap();
        assert_eq!(out, "<a>x</a>");
    }

    #[test]
    fn test_rejects_oversized_input() {
        let manager = DefaultSecurityManager::with_max_input_size(4);
        let err = manager.sanitize_input("<a></a>", "xml").unwrap_err();
        assert_eq!(err, SecurityError::InputTooLarge { size: 7, limit: 4 });
    }

    #[test]
    fn test_error_message_hides_paths() {
        let manager = DefaultSecurityManager::default();
        let msg = manager.sanitize_error_message("cannot open /home/user/secret/data.xml now");
        assert_eq!(msg, "cannot open <path> now");
    }

    #[test]
    fn test_error_message_strips_control_and_truncates() {
        let manager = DefaultSecurityManager::default();
        assert_eq!(manager.sanitize_error_message("a\u{7}b"), "a b");

        let long = "x".repeat(600);
        let msg = manager.sanitize_error_message(&long);
        assert_eq!(msg.chars().count(), MAX_ERROR_MESSAGE_CHARS + 3);
        assert!(msg.ends_with("..."));
    }
}
