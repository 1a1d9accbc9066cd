//! Owned document tree.
//!
//! # Responsibilities
//! - Parse an HTML byte buffer into a tree of [`DocumentNode`]s
//! - Give the rewrite rules exclusive, mutable access to every node
//!
//! # Design Decisions
//! - Parsing goes through `scraper` (html5ever), which recovers from any
//!   malformed markup the way a browser does
//! - The parsed arena is converted into a plain owned tree: a parent owns its
//!   children in a `Vec`, there are no back-references
//! - Conversion walks the arena with an explicit stack, not recursion

use html5ever::{namespace_url, ns, LocalName, QualName};
use scraper::{Html, Node};

/// A single attribute on an element, in source order.
///
/// The qualified name keeps the namespace, so `xlink:href` and `xml:lang`
/// survive the round trip through the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

impl Attribute {
    /// An attribute with no namespace, the common case in HTML.
    pub fn new(key: &str, value: impl Into<String>) -> Self {
        Self {
            name: QualName::new(None, ns!(), LocalName::from(key)),
            value: value.into(),
        }
    }

    /// Local part of the attribute name.
    pub fn key(&self) -> &str {
        &self.name.local
    }

    /// Whether the attribute is in no namespace.
    pub fn is_plain(&self) -> bool {
        self.name.ns == ns!()
    }
}

/// What a node represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
    },
    Text(String),
    Comment(String),
}

/// A node of the parsed document. Owns its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNode {
    pub kind: NodeKind,
    pub children: Vec<DocumentNode>,
}

impl DocumentNode {
    pub fn document(children: Vec<DocumentNode>) -> Self {
        Self {
            kind: NodeKind::Document,
            children,
        }
    }

    /// An element in the HTML namespace.
    pub fn element(name: &str, attrs: Vec<Attribute>, children: Vec<DocumentNode>) -> Self {
        Self {
            kind: NodeKind::Element {
                name: QualName::new(None, ns!(html), LocalName::from(name)),
                attrs,
            },
            children,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Text(text.into()),
            children: Vec::new(),
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Comment(text.into()),
            children: Vec::new(),
        }
    }

    /// Parse a complete HTML document from decoded text.
    ///
    /// The HTML parser never fails; malformed markup is recovered the way a
    /// browser recovers it.
    pub fn parse(source: &str) -> Self {
        let html = Html::parse_document(source);
        from_parsed(&html)
    }

    /// Local tag name, if this node is an element.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { name, .. } => Some(&name.local),
            _ => None,
        }
    }

    /// Whether this node is an element named `tag` (ASCII case-insensitive),
    /// in any namespace.
    pub fn is_element(&self, tag: &str) -> bool {
        self.tag_name().is_some_and(|name| name.eq_ignore_ascii_case(tag))
    }

    /// Value of the first namespace-less attribute named `key`.
    pub fn attr(&self, key: &str) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.is_plain() && a.key() == key)
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }

    /// Count of elements named `tag` in this subtree, including `self`.
    pub fn count_elements(&self, tag: &str) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += usize::from(node.is_element(tag));
            pending.extend(node.children.iter());
        }
        count
    }
}

impl Drop for DocumentNode {
    // Unlink descendants one level at a time; the derived drop would recurse
    // once per nesting level.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Convert the parser's arena into an owned tree.
fn from_parsed(html: &Html) -> DocumentNode {
    let root = html.tree.root();
    // (arena node, remaining children, converted children)
    let mut stack = vec![(root, root.children(), Vec::new())];

    loop {
        let Some(top) = stack.last_mut() else {
            return DocumentNode::document(Vec::new());
        };

        if let Some(child) = top.1.next() {
            stack.push((child, child.children(), Vec::new()));
            continue;
        }

        let Some((node, _, children)) = stack.pop() else {
            return DocumentNode::document(Vec::new());
        };
        let converted = convert(node.value(), children);

        match stack.last_mut() {
            Some(parent) => parent.2.extend(converted),
            None => return converted.unwrap_or_else(|| DocumentNode::document(Vec::new())),
        }
    }
}

/// Map one arena node to an owned node. Processing instructions are dropped.
fn convert(node: &Node, children: Vec<DocumentNode>) -> Option<DocumentNode> {
    let kind = match node {
        Node::Document | Node::Fragment => NodeKind::Document,
        Node::Doctype(doctype) => NodeKind::Doctype {
            name: doctype.name().to_string(),
            public_id: doctype.public_id().to_string(),
            system_id: doctype.system_id().to_string(),
        },
        Node::Element(element) => NodeKind::Element {
            name: element.name.clone(),
            attrs: element
                .attrs
                .iter()
                .map(|(name, value)| Attribute {
                    name: name.clone(),
                    value: value.to_string(),
                })
                .collect(),
        },
        Node::Text(text) => NodeKind::Text(text.text.to_string()),
        Node::Comment(comment) => NodeKind::Comment(comment.comment.to_string()),
        _ => return None,
    };
    Some(DocumentNode { kind, children })
}
