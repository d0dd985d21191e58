//! Lightweight tag scanning shared by the XML validation layers
//!
//! These helpers work on raw text and never build a tree, so they still
//! produce useful positions for documents the recursive descent rejects.

use regex::Regex;

use crate::{regex_util::static_regex, rules::LineIndex};

static_regex!(fn tag_pattern, r#"<(/?)([A-Za-z_][\w:.\-]*)((?:[^<>"']|"[^"]*"|'[^']*')*?)(/?)>"#);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Close,
    SelfClosing,
}

/// One start, end or empty-element tag found by [`scan_tags`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagToken<'a> {
    pub name: &'a str,
    pub kind: TagKind,
    /// Raw attribute text between the name and the closing `>`
    pub attributes: &'a str,
    /// Byte offset of `<`
    pub offset: usize,
    /// Byte offset just past `>`
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl TagToken<'_> {
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }
}

/// Replace comments, CDATA sections, processing instructions and DOCTYPE
/// declarations with spaces. Newlines are kept and every byte offset maps to
/// the same offset in the input.
pub fn mask_non_element_markup(content: &str) -> String {
    const CONSTRUCTS: [(&str, &str); 3] = [("<!--", "-->"), ("<![CDATA[", "]]>"), ("<?", "?>")];

    let bytes = content.as_bytes();
    let mut masked = bytes.to_vec();
    let mut pos = 0;

    while let Some(found) = content[pos..].find('<') {
        let start = pos + found;
        let rest = &content[start..];

        let end = if let Some((_, close)) = CONSTRUCTS.iter().find(|(open, _)| rest.starts_with(open)) {
            rest.find(close).map_or(content.len(), |i| start + i + close.len())
        } else if rest.starts_with("<!DOCTYPE") {
            start + doctype_len(rest)
        } else {
            pos = start + 1;
            continue;
        };

        for byte in &mut masked[start..end] {
            if *byte != b'\n' {
                *byte = b' ';
            }
        }
        pos = end;
    }

    // Only whole UTF-8 sequences were replaced, each by ASCII spaces.
    String::from_utf8(masked).unwrap_or_default()
}

fn doctype_len(rest: &str) -> usize {
    let mut depth = 0usize;
    for (idx, ch) in rest.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '>' if depth == 0 => return idx + 1,
            _ => {}
        }
    }
    rest.len()
}

/// Extract tags from masked text; positions come from `index`, which must be
/// built over the unmasked content.
pub(crate) fn scan_tags<'a>(masked: &'a str, index: &LineIndex<'_>) -> Vec<TagToken<'a>> {
    tag_pattern()
        .captures_iter(masked)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(2)?.as_str();
            let kind = if !caps[1].is_empty() {
                TagKind::Close
            } else if !caps[4].is_empty() {
                TagKind::SelfClosing
            } else {
                TagKind::Open
            };
            let (line, column) = index.position(whole.start());
            Some(TagToken {
                name,
                kind,
                attributes: caps.get(3).map_or("", |m| m.as_str()),
                offset: whole.start(),
                end: whole.end(),
                line,
                column,
            })
        })
        .collect()
}

/// Deepest element nesting reached by a tag walk, with the tag that reached it
pub fn max_depth<'t, 'a>(tags: &'t [TagToken<'a>]) -> Option<(usize, &'t TagToken<'a>)> {
    let mut depth = 0usize;
    let mut deepest: Option<(usize, &TagToken<'a>)> = None;
    for tag in tags {
        match tag.kind {
            TagKind::Open | TagKind::SelfClosing => {
                let reached = depth + 1;
                if deepest.map_or(true, |(d, _)| reached > d) {
                    deepest = Some((reached, tag));
                }
                if tag.kind == TagKind::Open {
                    depth = reached;
                }
            }
            TagKind::Close => depth = depth.saturating_sub(1),
        }
    }
    deepest
}
