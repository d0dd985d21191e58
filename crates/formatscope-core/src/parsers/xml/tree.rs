//! Arena-backed XML document tree
//!
//! Nodes live in one `Vec` owned by the document. Children are listed by
//! id in their parent; `parent` is a plain id used only to walk upwards.

use serde::Serialize;
use std::collections::BTreeMap;

/// Index of a node in [`XmlDocument::nodes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XmlAttribute {
    /// Qualified name as written (`xlink:href`)
    pub name: String,
    pub local_name: String,
    pub prefix: Option<String>,
    pub namespace: Option<String>,
    /// Value with entity references decoded
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XmlElement {
    pub name: String,
    pub local_name: String,
    pub prefix: Option<String>,
    pub namespace: Option<String>,
    pub attributes: Vec<XmlAttribute>,
}

impl XmlElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum XmlNodeKind {
    Element(XmlElement),
    Text { value: String },
    Comment { value: String },
    Cdata { value: String },
    ProcessingInstruction { target: String, data: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XmlNode {
    pub kind: XmlNodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub line: usize,
    pub column: usize,
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&XmlElement> {
        match &self.kind {
            XmlNodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Text of a text, comment or CDATA node
    pub fn value(&self) -> Option<&str> {
        match &self.kind {
            XmlNodeKind::Text { value }
            | XmlNodeKind::Comment { value }
            | XmlNodeKind::Cdata { value } => Some(value),
            XmlNodeKind::ProcessingInstruction { data, .. } => Some(data),
            XmlNodeKind::Element(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XmlDocument {
    pub declaration: Option<XmlDeclaration>,
    /// Raw `<!DOCTYPE ...>` text; never resolved
    pub doctype: Option<String>,
    pub root: NodeId,
    pub nodes: Vec<XmlNode>,
    /// Every namespace declared in the document, prefix to URI. The default
    /// namespace uses the empty prefix; the first declaration of a prefix wins.
    pub namespaces: BTreeMap<String, String>,
    /// Processing instructions outside the root element
    pub processing_instructions: Vec<NodeId>,
    /// Comments outside the root element
    pub comments: Vec<NodeId>,
}

impl XmlDocument {
    pub fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id.0)
    }

    pub fn root_element(&self) -> Option<&XmlElement> {
        self.get(self.root).and_then(XmlNode::as_element)
    }

    pub fn element(&self, id: NodeId) -> Option<&XmlElement> {
        self.get(id).and_then(XmlNode::as_element)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &XmlNode)> {
        self.get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |child| (*child, self.node(*child)))
    }

    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &XmlElement)> {
        self.children(id)
            .filter_map(|(child, node)| node.as_element().map(|e| (child, e)))
    }

    /// Concatenated text and CDATA below `id`, in document order
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match &node.kind {
            XmlNodeKind::Text { value } | XmlNodeKind::Cdata { value } => out.push_str(value),
            XmlNodeKind::Element(_) => {
                for child in &node.children {
                    self.collect_text(*child, out);
                }
            }
            _ => {}
        }
    }

    pub fn element_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.as_element().is_some()).count()
    }

    /// Elements with the given local name, in document order
    pub fn find_all(&self, local_name: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.as_element().is_some_and(|e| e.local_name == local_name))
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    /// Element ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }
}
