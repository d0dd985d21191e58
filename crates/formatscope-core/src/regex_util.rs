//! Lazily-compiled static regex patterns.
//!
//! Detection and validation run the same pattern banks on every call, so each
//! pattern is compiled once and cached for the life of the process.

/// Declare functions returning `&'static regex::Regex`, each backed by its
/// own `std::sync::OnceLock`. Several declarations may share one invocation,
/// separated by `;`, and each may carry a visibility.
///
/// The calling module must have `use regex::Regex;` in scope.
///
/// # Panics
///
/// Panics on first call if a pattern is not a valid regex. The message
/// includes the pattern text.
///
/// # Example
///
/// ```ignore
/// use regex::Regex;
/// use crate::regex_util::static_regex;
///
/// static_regex!(
///     fn xml_declaration, r"^\s*<\?xml\s";
///     pub(crate) fn csv_header, r"^[\w ]+(?:,[\w ]+)+$";
/// );
///
/// assert!(xml_declaration().is_match("<?xml version=\"1.0\"?>"));
/// ```
macro_rules! static_regex {
    ($($vis:vis fn $fname:ident, $pattern:expr);+ $(;)?) => {
        $(
            $vis fn $fname() -> &'static Regex {
                static STORE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
                STORE.get_or_init(|| {
                    Regex::new($pattern).expect(concat!("BUG: invalid static regex: ", $pattern))
                })
            }
        )+
    };
}
pub(crate) use static_regex;

#[cfg(test)]
mod tests {
    use regex::Regex;

    static_regex!(
        fn digits, r"^\d+$";
        fn word, r"^[a-z]+$";
    );

    #[test]
    fn test_grouped_declarations() {
        assert!(digits().is_match("123"));
        assert!(word().is_match("abc"));
        assert!(!word().is_match("a1"));
    }

    #[test]
    fn test_same_instance_is_returned() {
        assert!(std::ptr::eq(digits(), digits()));
    }
}
