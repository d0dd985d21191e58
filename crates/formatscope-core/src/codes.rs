//! Stable validation codes, mirrored in the formatscope-rules catalog

// any
pub const EMPTY_CONTENT: &str = "EMPTY_CONTENT";
pub const SECURITY_ERROR: &str = "SECURITY_ERROR";
pub const EXCESSIVE_NESTING: &str = "EXCESSIVE_NESTING";
pub const NAMING_CONVENTION: &str = "NAMING_CONVENTION";
// registry
pub const UNKNOWN_FORMAT: &str = "UNKNOWN_FORMAT";
pub const FORMAT_DETECTION_FAILED: &str = "FORMAT_DETECTION_FAILED";
pub const PARSER_NOT_FOUND: &str = "PARSER_NOT_FOUND";
// batch
pub const FILE_READ_ERROR: &str = "FILE_READ_ERROR";
// json
pub const INVALID_STRUCTURE: &str = "INVALID_STRUCTURE";
pub const UNMATCHED_CLOSING: &str = "UNMATCHED_CLOSING";
pub const MISMATCHED_BRACKETS: &str = "MISMATCHED_BRACKETS";
pub const UNCLOSED_BRACKET: &str = "UNCLOSED_BRACKET";
pub const UNTERMINATED_STRING: &str = "UNTERMINATED_STRING";
pub const SYNTAX_ERROR: &str = "SYNTAX_ERROR";
pub const LARGE_FILE: &str = "LARGE_FILE";
pub const TOO_MANY_LINES: &str = "TOO_MANY_LINES";
pub const PROTOTYPE_POLLUTION: &str = "PROTOTYPE_POLLUTION";
pub const LONG_STRING: &str = "LONG_STRING";
pub const LARGE_ARRAY: &str = "LARGE_ARRAY";
pub const TOO_MANY_PROPERTIES: &str = "TOO_MANY_PROPERTIES";
pub const LONG_PROPERTY_NAME: &str = "LONG_PROPERTY_NAME";
pub const UNSAFE_INTEGER: &str = "UNSAFE_INTEGER";
pub const DUPLICATE_KEY: &str = "DUPLICATE_KEY";
pub const RESERVED_WORD: &str = "RESERVED_WORD";
// csv
pub const CSV_INJECTION: &str = "CSV_INJECTION";
pub const CSV_INJECTION_BULK: &str = "CSV_INJECTION_BULK";
pub const LONG_FIELD: &str = "LONG_FIELD";
pub const BOM_DETECTED: &str = "BOM_DETECTED";
pub const MIXED_LINE_ENDINGS: &str = "MIXED_LINE_ENDINGS";
pub const CONTROL_CHARACTERS: &str = "CONTROL_CHARACTERS";
pub const REPLACEMENT_CHARACTER: &str = "REPLACEMENT_CHARACTER";
pub const LOW_DELIMITER_CONFIDENCE: &str = "LOW_DELIMITER_CONFIDENCE";
pub const INCONSISTENT_ROW_LENGTH: &str = "INCONSISTENT_ROW_LENGTH";
pub const UNTERMINATED_QUOTE: &str = "UNTERMINATED_QUOTE";
pub const TOO_MANY_COLUMNS: &str = "TOO_MANY_COLUMNS";
pub const INCONSISTENT_TYPES: &str = "INCONSISTENT_TYPES";
pub const HIGH_NULL_RATE: &str = "HIGH_NULL_RATE";
pub const DUPLICATE_IDENTIFIERS: &str = "DUPLICATE_IDENTIFIERS";
pub const DUPLICATE_HEADER: &str = "DUPLICATE_HEADER";
pub const EMPTY_HEADER: &str = "EMPTY_HEADER";
pub const PROBLEMATIC_HEADER: &str = "PROBLEMATIC_HEADER";
pub const LONG_HEADER: &str = "LONG_HEADER";
pub const ROW_LENGTH_MISMATCH: &str = "ROW_LENGTH_MISMATCH";
pub const TYPE_CONVERSION_FAILED: &str = "TYPE_CONVERSION_FAILED";
pub const DELIMITER_OVERRIDDEN: &str = "DELIMITER_OVERRIDDEN";
// xml
pub const XXE_DETECTED: &str = "XXE_DETECTED";
pub const DTD_DETECTED: &str = "DTD_DETECTED";
pub const EXCESSIVE_ENTITIES: &str = "EXCESSIVE_ENTITIES";
pub const UNCLOSED_QUOTE: &str = "UNCLOSED_QUOTE";
pub const UNBALANCED_QUOTES: &str = "UNBALANCED_QUOTES";
pub const ATTRIBUTE_WITHOUT_VALUE: &str = "ATTRIBUTE_WITHOUT_VALUE";
pub const UNQUOTED_ATTRIBUTE: &str = "UNQUOTED_ATTRIBUTE";
pub const MALFORMED_COMMENT: &str = "MALFORMED_COMMENT";
pub const UNCLOSED_TAG: &str = "UNCLOSED_TAG";
pub const MISMATCHED_TAG: &str = "MISMATCHED_TAG";
pub const UNEXPECTED_CLOSING_TAG: &str = "UNEXPECTED_CLOSING_TAG";
pub const MISSING_DECLARATION: &str = "MISSING_DECLARATION";
pub const UNDEFINED_NAMESPACE_PREFIX: &str = "UNDEFINED_NAMESPACE_PREFIX";
pub const EMPTY_ELEMENT: &str = "EMPTY_ELEMENT";
pub const TOO_MANY_ATTRIBUTES: &str = "TOO_MANY_ATTRIBUTES";
pub const XML_PARSE_ERROR: &str = "XML_PARSE_ERROR";

/// Every code the engine can emit.
pub const ALL: &[&str] = &[
    EMPTY_CONTENT,
    SECURITY_ERROR,
    EXCESSIVE_NESTING,
    NAMING_CONVENTION,
    UNKNOWN_FORMAT,
    FORMAT_DETECTION_FAILED,
    PARSER_NOT_FOUND,
    FILE_READ_ERROR,
    INVALID_STRUCTURE,
    UNMATCHED_CLOSING,
    MISMATCHED_BRACKETS,
    UNCLOSED_BRACKET,
    UNTERMINATED_STRING,
    SYNTAX_ERROR,
    LARGE_FILE,
    TOO_MANY_LINES,
    PROTOTYPE_POLLUTION,
    LONG_STRING,
    LARGE_ARRAY,
    TOO_MANY_PROPERTIES,
    LONG_PROPERTY_NAME,
    UNSAFE_INTEGER,
    DUPLICATE_KEY,
    RESERVED_WORD,
    CSV_INJECTION,
    CSV_INJECTION_BULK,
    LONG_FIELD,
    BOM_DETECTED,
    MIXED_LINE_ENDINGS,
    CONTROL_CHARACTERS,
    REPLACEMENT_CHARACTER,
    LOW_DELIMITER_CONFIDENCE,
    INCONSISTENT_ROW_LENGTH,
    UNTERMINATED_QUOTE,
    TOO_MANY_COLUMNS,
    INCONSISTENT_TYPES,
    HIGH_NULL_RATE,
    DUPLICATE_IDENTIFIERS,
    DUPLICATE_HEADER,
    EMPTY_HEADER,
    PROBLEMATIC_HEADER,
    LONG_HEADER,
    ROW_LENGTH_MISMATCH,
    TYPE_CONVERSION_FAILED,
    DELIMITER_OVERRIDDEN,
    XXE_DETECTED,
    DTD_DETECTED,
    EXCESSIVE_ENTITIES,
    UNCLOSED_QUOTE,
    UNBALANCED_QUOTES,
    ATTRIBUTE_WITHOUT_VALUE,
    UNQUOTED_ATTRIBUTE,
    MALFORMED_COMMENT,
    UNCLOSED_TAG,
    MISMATCHED_TAG,
    UNEXPECTED_CLOSING_TAG,
    MISSING_DECLARATION,
    UNDEFINED_NAMESPACE_PREFIX,
    EMPTY_ELEMENT,
    TOO_MANY_ATTRIBUTES,
    XML_PARSE_ERROR,
];
