//! In-memory HTML document model.
//!
//! # Responsibility
//! - Own the node arena shared by the parser, the selector engine and the
//!   component runtime.
//! - Provide the tree operations the connect sequence needs: detached
//!   fragment parsing, re-parenting, ancestor lookup, serialization.
//!
//! # Invariants
//! - A node has at most one parent; `append_child` re-parents.
//! - Detached nodes stay alive in the arena; the runtime decides when a
//!   subtree becomes part of the live document.
//! - Tag and attribute names are stored lowercase.

pub mod parser;
pub mod selector;

pub use selector::{Selector, SelectorError};

use std::collections::BTreeMap;

/// Arena index of one node. Only valid for the `Document` that created it.
pub type NodeId = usize;

/// Node payload variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Text(String),
    Comment(String),
}

/// One arena node with tree links.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Tag used for the document root and for detached fragment containers.
///
/// The leading `#` keeps container elements out of tag-selector matches.
pub const ROOT_TAG: &str = "#document";
const FRAGMENT_TAG: &str = "#fragment";

/// Arena-backed document tree.
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Creates an empty document with only the root container.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: 0,
        };
        doc.root = doc.push_node(Node::new(NodeKind::Element {
            tag: ROOT_TAG.to_string(),
            attributes: BTreeMap::new(),
        }));
        doc
    }

    /// Parses full HTML text as the children of a fresh document root.
    pub fn from_html(html: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root;
        parser::parse_into(&mut doc, root, html);
        doc
    }

    /// Parses HTML text into a detached container and returns the container.
    ///
    /// The container itself never becomes part of the live tree; callers move
    /// its children where they belong.
    pub fn parse_fragment(&mut self, html: &str) -> NodeId {
        let container = self.create_element(FRAGMENT_TAG);
        parser::parse_into(self, container, html);
        container
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    /// Creates a detached element node.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(Node::new(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
        }))
    }

    /// Creates a detached text node.
    pub fn create_text_node(&mut self, text: &str) -> NodeId {
        self.push_node(Node::new(NodeKind::Text(text.to_string())))
    }

    pub(crate) fn create_comment(&mut self, text: &str) -> NodeId {
        self.push_node(Node::new(NodeKind::Comment(text.to_string())))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    /// Returns the ordered child list of `id`.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(
            self.nodes.get(id).map(|node| &node.kind),
            Some(NodeKind::Element { .. })
        )
    }

    /// Returns the lowercase tag name of an element node.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id).map(|node| &node.kind) {
            Some(NodeKind::Element { tag, .. }) => Some(tag.as_str()),
            _ => None,
        }
    }

    /// Returns the attribute map of an element node.
    pub fn attributes(&self, id: NodeId) -> Option<&BTreeMap<String, String>> {
        match self.nodes.get(id).map(|node| &node.kind) {
            Some(NodeKind::Element { attributes, .. }) => Some(attributes),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .and_then(|attrs| attrs.get(&name.to_ascii_lowercase()))
            .map(String::as_str)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Sets one attribute on an element node. Ignored for non-elements.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(NodeKind::Element { attributes, .. }) =
            self.nodes.get_mut(id).map(|node| &mut node.kind)
        {
            attributes.insert(name.to_ascii_lowercase(), value.to_string());
        }
    }

    /// Removes `id` from its current parent without destroying the subtree.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|&child| child != id);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
        }
    }

    /// Appends `child` as the last child of `parent`, re-parenting if needed.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || parent >= self.nodes.len() || child >= self.nodes.len() {
            return;
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    /// Returns all descendants of `id` in document order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self
            .children(id)
            .into_iter()
            .rev()
            .collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            for &child in self
                .nodes
                .get(current)
                .map(|node| node.children.as_slice())
                .unwrap_or(&[])
                .iter()
                .rev()
            {
                stack.push(child);
            }
        }
        out
    }

    /// Concatenated text of all descendant text nodes, document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(NodeKind::Text(text)) = self.nodes.get(id).map(|node| &node.kind) {
            out.push_str(text);
        }
        for child in self.descendants(id) {
            if let Some(NodeKind::Text(text)) = self.nodes.get(child).map(|node| &node.kind) {
                out.push_str(text);
            }
        }
        out
    }

    /// Nearest ancestor-or-self element with the given tag name.
    pub fn closest(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        let wanted = tag.to_ascii_lowercase();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if self.tag(node_id) == Some(wanted.as_str()) {
                return Some(node_id);
            }
            current = self.parent(node_id);
        }
        None
    }

    /// First element under the root matching `selector`, document order.
    pub fn query_selector(&self, selector: &Selector) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&node| selector.matches(self, node))
    }

    /// Serializes the subtree rooted at `id` back to HTML text.
    ///
    /// Container elements (root, fragment containers) emit their children
    /// only. Attributes with an empty value serialize as bare flags; the
    /// parser stores `debug` and `debug=""` identically, so the two forms
    /// collapse on a round trip.
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    /// Serializes only the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_node(child, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Element { tag, attributes } => {
                if tag.starts_with('#') {
                    for &child in &node.children {
                        self.write_node(child, out);
                    }
                    return;
                }
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_attribute(value));
                        out.push('"');
                    }
                }
                out.push('>');
                if parser::is_void_element(tag) {
                    return;
                }
                if parser::is_raw_text_element(tag) {
                    // Raw text is stored verbatim; no entity escaping.
                    for &child in &node.children {
                        if let Some(NodeKind::Text(text)) =
                            self.nodes.get(child).map(|n| &n.kind)
                        {
                            out.push_str(text);
                        }
                    }
                } else {
                    for &child in &node.children {
                        self.write_node(child, out);
                    }
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
