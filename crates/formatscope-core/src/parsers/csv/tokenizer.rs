//! Quote-aware record splitting and row tokenizing

/// One physical record and the line it starts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord<'a> {
    pub text: &'a str,
    pub line: usize,
}

/// Records split from a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSplit<'a> {
    pub records: Vec<RawRecord<'a>>,
    /// Line of the quote that was still open at end of input
    pub unterminated_quote_line: Option<usize>,
}

/// Split content into records on newlines that sit outside quoted fields.
///
/// A trailing `\r` is removed from each record so CRLF input tokenizes the
/// same as LF input.
pub fn split_records(content: &str, quote: char, escape: char) -> RecordSplit<'_> {
    let mut split = RecordSplit::default();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut quote_line = 0;
    let mut line = 1;
    let mut record_start = 0;
    let mut record_line = 1;

    for (idx, ch) in content.char_indices() {
        if escaped {
            escaped = false;
            if ch != '\n' {
                continue;
            }
        }
        if in_quotes && escape != quote && ch == escape {
            escaped = true;
        } else if ch == quote {
            in_quotes = !in_quotes;
            if in_quotes {
                quote_line = line;
            }
        } else if ch == '\n' {
            if !in_quotes {
                split.records.push(RawRecord {
                    text: content[record_start..idx].trim_end_matches('\r'),
                    line: record_line,
                });
                record_start = idx + 1;
                record_line = line + 1;
            }
            line += 1;
        }
    }

    if record_start < content.len() {
        split.records.push(RawRecord {
            text: content[record_start..].trim_end_matches('\r'),
            line: record_line,
        });
    }
    if in_quotes {
        split.unterminated_quote_line = Some(quote_line);
    }
    split
}

/// Tokenize one record into fields.
///
/// A quote outside a quoted field opens quoting. Inside one, a doubled quote
/// is a literal quote when `escape == quote`; otherwise `escape` followed by
/// a quote is the literal. Any other quote closes the field's quoting. The
/// delimiter splits fields only outside quotes.
pub fn parse_row(line: &str, delimiter: char, quote: char, escape: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if escape != quote && ch == escape && chars.peek() == Some(&quote) {
                current.push(quote);
                chars.next();
            } else if ch == quote {
                if escape == quote && chars.peek() == Some(&quote) {
                    current.push(quote);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
        } else if ch == quote {
            in_quotes = true;
        } else if ch == delimiter {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    fields.push(current);
    fields
}
