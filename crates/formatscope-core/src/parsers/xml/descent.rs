//! Recursive-descent XML parser
//!
//! All state for one parse lives in a [`Context`] created per call, so the
//! parser is reentrant. Namespace scope is a map cloned on entry to each
//! element and restored when it closes.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use super::tree::{
    NodeId, XmlAttribute, XmlDeclaration, XmlDocument, XmlElement, XmlNode, XmlNodeKind,
};

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Longest entity reference body considered before `&` is taken literally
const MAX_ENTITY_LEN: usize = 32;

/// Hard ceiling on element depth, whatever the configured limit
pub const MAX_DESCENT_DEPTH: usize = 256;

/// A structural failure with the cursor position where it happened
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at line {line}, column {column}")]
pub struct XmlSyntaxError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

type DescentResult<T> = Result<T, XmlSyntaxError>;

/// Parse a complete document into an arena tree.
///
/// Elements nested deeper than `max_depth` (capped at [`MAX_DESCENT_DEPTH`])
/// fail the parse instead of recursing further.
pub fn parse_document(
    content: &str,
    preserve_whitespace: bool,
    max_depth: usize,
) -> DescentResult<XmlDocument> {
    let mut ctx = Context::new(content, preserve_whitespace, max_depth.min(MAX_DESCENT_DEPTH));
    ctx.document()
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn bump_str(&mut self, s: &str) {
        for _ in s.chars() {
            self.bump();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Consume up to (not including) `terminator`; `None` if it never appears
    fn take_until(&mut self, terminator: &str) -> Option<&'a str> {
        let idx = self.rest().find(terminator)?;
        let taken = &self.rest()[..idx];
        self.bump_str(taken);
        Some(taken)
    }
}

struct Context<'a> {
    cursor: Cursor<'a>,
    nodes: Vec<XmlNode>,
    scope: HashMap<String, String>,
    declared: BTreeMap<String, String>,
    preserve_whitespace: bool,
    depth: usize,
    max_depth: usize,
}

impl<'a> Context<'a> {
    fn new(src: &'a str, preserve_whitespace: bool, max_depth: usize) -> Self {
        Self {
            cursor: Cursor {
                src,
                pos: 0,
                line: 1,
                column: 1,
            },
            nodes: Vec::new(),
            scope: HashMap::new(),
            declared: BTreeMap::new(),
            preserve_whitespace,
            depth: 0,
            max_depth,
        }
    }

    fn error<T>(&self, message: impl Into<String>) -> DescentResult<T> {
        Err(XmlSyntaxError {
            message: message.into(),
            line: self.cursor.line,
            column: self.cursor.column,
        })
    }

    fn expect(&mut self, s: &str) -> DescentResult<()> {
        if self.cursor.starts_with(s) {
            self.cursor.bump_str(s);
            Ok(())
        } else {
            let found = self
                .cursor
                .peek()
                .map_or("end of input".to_string(), |c| format!("'{}'", c));
            self.error(format!("Expected '{}' but found {}", s, found))
        }
    }

    fn push_node(&mut self, kind: XmlNodeKind, parent: Option<NodeId>, line: usize, column: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(XmlNode {
            kind,
            parent,
            children: Vec::new(),
            line,
            column,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    fn document(&mut self) -> DescentResult<XmlDocument> {
        if self.cursor.starts_with("\u{FEFF}") {
            self.cursor.bump();
        }

        let declaration = if self.cursor.starts_with("<?xml")
            && self.cursor.rest()[5..].starts_with(|c: char| c.is_whitespace() || c == '?')
        {
            Some(self.declaration()?)
        } else {
            None
        };

        let mut doctype = None;
        let mut processing_instructions = Vec::new();
        let mut comments = Vec::new();

        loop {
            self.cursor.skip_whitespace();
            if self.cursor.starts_with("<!--") {
                comments.push(self.comment(None)?);
            } else if self.cursor.starts_with("<?") {
                processing_instructions.push(self.processing_instruction(None)?);
            } else if self.cursor.starts_with("<!DOCTYPE") {
                if doctype.is_some() {
                    return self.error("Only one DOCTYPE is allowed");
                }
                doctype = Some(self.doctype()?);
            } else {
                break;
            }
        }

        if self.cursor.at_end() {
            return self.error("Document has no root element");
        }
        if self.cursor.peek() != Some('<') {
            return self.error("Text is not allowed before the root element");
        }
        let root = self.element(None)?;

        loop {
            self.cursor.skip_whitespace();
            if self.cursor.at_end() {
                break;
            }
            if self.cursor.starts_with("<!--") {
                comments.push(self.comment(None)?);
            } else if self.cursor.starts_with("<?") {
                processing_instructions.push(self.processing_instruction(None)?);
            } else {
                return self.error("Content is not allowed after the root element");
            }
        }

        Ok(XmlDocument {
            declaration,
            doctype,
            root,
            nodes: std::mem::take(&mut self.nodes),
            namespaces: std::mem::take(&mut self.declared),
            processing_instructions,
            comments,
        })
    }

    fn declaration(&mut self) -> DescentResult<XmlDeclaration> {
        self.expect("<?xml")?;
        let attributes = self.raw_attributes("?>")?;
        self.expect("?>")?;

        let get = |name: &str| {
            attributes
                .iter()
                .find(|(n, _, _, _)| n == name)
                .map(|(_, v, _, _)| v.clone())
        };
        let standalone = match get("standalone").as_deref() {
            None => None,
            Some("yes") => Some(true),
            Some("no") => Some(false),
            Some(other) => {
                return self.error(format!("Invalid standalone value '{}'", other));
            }
        };
        Ok(XmlDeclaration {
            version: get("version").unwrap_or_else(|| "1.0".to_string()),
            encoding: get("encoding"),
            standalone,
        })
    }

    fn doctype(&mut self) -> DescentResult<String> {
        let start = self.cursor.pos;
        let mut depth = 0usize;
        while let Some(ch) = self.cursor.bump() {
            match ch {
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                '>' if depth == 0 => {
                    return Ok(self.cursor.src[start..self.cursor.pos].to_string());
                }
                _ => {}
            }
        }
        self.error("Unterminated DOCTYPE")
    }

    fn comment(&mut self, parent: Option<NodeId>) -> DescentResult<NodeId> {
        let (line, column) = (self.cursor.line, self.cursor.column);
        self.expect("<!--")?;
        let Some(value) = self.cursor.take_until("-->") else {
            return Err(XmlSyntaxError {
                message: "Unterminated comment".to_string(),
                line,
                column,
            });
        };
        self.expect("-->")?;
        Ok(self.push_node(
            XmlNodeKind::Comment {
                value: value.to_string(),
            },
            parent,
            line,
            column,
        ))
    }

    fn cdata(&mut self, parent: NodeId) -> DescentResult<NodeId> {
        let (line, column) = (self.cursor.line, self.cursor.column);
        self.expect("<![CDATA[")?;
        let Some(value) = self.cursor.take_until("]]>") else {
            return Err(XmlSyntaxError {
                message: "Unterminated CDATA section".to_string(),
                line,
                column,
            });
        };
        self.expect("]]>")?;
        Ok(self.push_node(
            XmlNodeKind::Cdata {
                value: value.to_string(),
            },
            Some(parent),
            line,
            column,
        ))
    }

    fn processing_instruction(&mut self, parent: Option<NodeId>) -> DescentResult<NodeId> {
        let (line, column) = (self.cursor.line, self.cursor.column);
        self.expect("<?")?;
        let target = self.name()?;
        if target.eq_ignore_ascii_case("xml") {
            return self.error("XML declaration is only allowed at the start of the document");
        }
        let Some(data) = self.cursor.take_until("?>") else {
            return Err(XmlSyntaxError {
                message: format!("Unterminated processing instruction '{}'", target),
                line,
                column,
            });
        };
        self.expect("?>")?;
        Ok(self.push_node(
            XmlNodeKind::ProcessingInstruction {
                target,
                data: data.trim().to_string(),
            },
            parent,
            line,
            column,
        ))
    }

    fn name(&mut self) -> DescentResult<String> {
        let start = self.cursor.pos;
        match self.cursor.peek() {
            Some(c) if c.is_alphabetic() || c == '_' || c == ':' => {
                self.cursor.bump();
            }
            _ => return self.error("Expected a name"),
        }
        while self
            .cursor
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
        {
            self.cursor.bump();
        }
        Ok(self.cursor.src[start..self.cursor.pos].to_string())
    }

    /// Attributes up to `>`/`/>` (or `terminator`), as
    /// `(name, decoded value, line, column)`
    fn raw_attributes(&mut self, terminator: &str) -> DescentResult<Vec<(String, String, usize, usize)>> {
        let mut attributes: Vec<(String, String, usize, usize)> = Vec::new();
        loop {
            let had_space = self.cursor.peek().is_some_and(char::is_whitespace);
            self.cursor.skip_whitespace();
            if self.cursor.at_end() {
                return self.error("Unexpected end of input inside a tag");
            }
            if self.cursor.starts_with(terminator)
                || self.cursor.starts_with(">")
                || self.cursor.starts_with("/>")
            {
                return Ok(attributes);
            }
            if !had_space {
                return self.error("Expected whitespace before attribute");
            }

            let (line, column) = (self.cursor.line, self.cursor.column);
            let name = self.name()?;
            self.cursor.skip_whitespace();
            if self.cursor.peek() != Some('=') {
                return self.error(format!("Attribute '{}' has no value", name));
            }
            self.cursor.bump();
            self.cursor.skip_whitespace();

            let quote = match self.cursor.peek() {
                Some(q @ ('"' | '\'')) => q,
                _ => return self.error(format!("Value of attribute '{}' must be quoted", name)),
            };
            self.cursor.bump();
            let mut value = String::new();
            loop {
                match self.cursor.peek() {
                    None | Some('<') => {
                        return Err(XmlSyntaxError {
                            message: format!("Unclosed quote in attribute '{}'", name),
                            line,
                            column,
                        })
                    }
                    Some(c) if c == quote => {
                        self.cursor.bump();
                        break;
                    }
                    Some('&') => value.push_str(&self.entity()),
                    Some(c) => {
                        value.push(c);
                        self.cursor.bump();
                    }
                }
            }

            if attributes.iter().any(|(n, _, _, _)| *n == name) {
                return Err(XmlSyntaxError {
                    message: format!("Duplicate attribute '{}'", name),
                    line,
                    column,
                });
            }
            attributes.push((name, value, line, column));
        }
    }

    /// Decode the entity reference at the cursor. Unknown named entities and
    /// malformed references are kept literally.
    fn entity(&mut self) -> String {
        let rest = self.cursor.rest();
        let body_end = rest
            .char_indices()
            .take(MAX_ENTITY_LEN + 2)
            .skip(1)
            .find(|(_, c)| *c == ';' || *c == '&' || *c == '<' || c.is_whitespace())
            .filter(|(_, c)| *c == ';')
            .map(|(i, _)| i);

        let Some(end) = body_end else {
            self.cursor.bump();
            return "&".to_string();
        };
        let reference = &rest[..=end];
        let body = &rest[1..end];
        let decoded = decode_entity(body).unwrap_or_else(|| reference.to_string());
        self.cursor.bump_str(reference);
        decoded
    }

    fn split_name(name: &str) -> (Option<String>, String) {
        match name.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => {
                (Some(prefix.to_string()), local.to_string())
            }
            _ => (None, name.to_string()),
        }
    }

    fn resolve(&self, prefix: Option<&str>) -> Option<String> {
        match prefix {
            Some("xml") => Some(XML_NAMESPACE.to_string()),
            Some("xmlns") => Some(XMLNS_NAMESPACE.to_string()),
            Some(p) => self.scope.get(p).cloned(),
            None => self.scope.get("").cloned(),
        }
    }

    fn element(&mut self, parent: Option<NodeId>) -> DescentResult<NodeId> {
        if self.depth >= self.max_depth {
            return self.error(format!("Nesting depth exceeds {}", self.max_depth));
        }
        self.depth += 1;
        let id = self.element_body(parent)?;
        self.depth -= 1;
        Ok(id)
    }

    fn element_body(&mut self, parent: Option<NodeId>) -> DescentResult<NodeId> {
        let (line, column) = (self.cursor.line, self.cursor.column);
        self.expect("<")?;
        let name = self.name()?;
        let raw = self.raw_attributes(">")?;

        let saved_scope = self.scope.clone();
        for (attr_name, value, _, _) in &raw {
            let declared_prefix = if attr_name == "xmlns" {
                Some(String::new())
            } else {
                attr_name.strip_prefix("xmlns:").map(str::to_string)
            };
            if let Some(prefix) = declared_prefix {
                self.declared
                    .entry(prefix.clone())
                    .or_insert_with(|| value.clone());
                self.scope.insert(prefix, value.clone());
            }
        }

        let attributes = raw
            .into_iter()
            .map(|(attr_name, value, _, _)| {
                let (prefix, local_name) = Self::split_name(&attr_name);
                let namespace = if attr_name == "xmlns" {
                    Some(XMLNS_NAMESPACE.to_string())
                } else {
                    self.resolve(prefix.as_deref())
                };
                XmlAttribute {
                    name: attr_name,
                    local_name,
                    prefix,
                    namespace,
                    value,
                }
            })
            .collect();

        let (prefix, local_name) = Self::split_name(&name);
        let namespace = self.resolve(prefix.as_deref());
        let id = self.push_node(
            XmlNodeKind::Element(XmlElement {
                name: name.clone(),
                local_name,
                prefix,
                namespace,
                attributes,
            }),
            parent,
            line,
            column,
        );

        if self.cursor.starts_with("/>") {
            self.cursor.bump_str("/>");
            self.scope = saved_scope;
            return Ok(id);
        }
        self.expect(">")?;
        self.content(id, &name)?;

        self.expect("</")?;
        let (close_line, close_column) = (self.cursor.line, self.cursor.column);
        let closing = self.name()?;
        if closing != name {
            return Err(XmlSyntaxError {
                message: format!(
                    "Mismatched end tag: expected </{}> but found </{}>",
                    name, closing
                ),
                line: close_line,
                column: close_column,
            });
        }
        self.cursor.skip_whitespace();
        self.expect(">")?;

        self.scope = saved_scope;
        Ok(id)
    }

    fn content(&mut self, parent: NodeId, name: &str) -> DescentResult<()> {
        let mut text = String::new();
        let mut text_start = (self.cursor.line, self.cursor.column);

        loop {
            if self.cursor.at_end() {
                return self.error(format!("Unexpected end of input: <{}> is not closed", name));
            }
            if self.cursor.starts_with("</") {
                break;
            }
            if self.cursor.peek() == Some('<') {
                self.flush_text(&mut text, parent, text_start);
                if self.cursor.starts_with("<!--") {
                    self.comment(Some(parent))?;
                } else if self.cursor.starts_with("<![CDATA[") {
                    self.cdata(parent)?;
                } else if self.cursor.starts_with("<?") {
                    self.processing_instruction(Some(parent))?;
                } else if self.cursor.starts_with("<!") {
                    return self.error("Markup declarations are not allowed inside elements");
                } else {
                    self.element(Some(parent))?;
                }
                text_start = (self.cursor.line, self.cursor.column);
                continue;
            }

            if text.is_empty() {
                text_start = (self.cursor.line, self.cursor.column);
            }
            if self.cursor.peek() == Some('&') {
                text.push_str(&self.entity());
            } else if let Some(c) = self.cursor.bump() {
                text.push(c);
            }
        }

        self.flush_text(&mut text, parent, text_start);
        Ok(())
    }

    fn flush_text(&mut self, text: &mut String, parent: NodeId, (line, column): (usize, usize)) {
        if text.is_empty() {
            return;
        }
        let value = std::mem::take(text);
        if !self.preserve_whitespace && value.trim().is_empty() {
            return;
        }
        self.push_node(XmlNodeKind::Text { value }, Some(parent), line, column);
    }
}

/// Decode the body of an entity reference (`lt`, `#65`, `#x41`)
pub fn decode_entity(body: &str) -> Option<String> {
    let named = match body {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    };
    if let Some(c) = named {
        return Some(c.to_string());
    }
    let code = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(dec) = body.strip_prefix('#') {
        dec.parse().ok()?
    } else {
        return None;
    };
    char::from_u32(code).map(|c| c.to_string())
}
