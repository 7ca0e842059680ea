//! Line-oriented model of the DR mapping document.
//!
//! The mapping files produced by the generate playbook look like YAML but are
//! edited by hand between runs, and the comments in them are the operator's
//! documentation. A full YAML library would drop or reorder those comments, so
//! the controller uses its own restricted model:
//!
//! - [`lexer`] turns each line into a [`Token`](lexer::Token)
//! - [`builder`] assembles tokens into a tree of [`Node`]s
//! - [`writer`] renders the tree back, byte-for-byte for untouched lines
//! - [`rewrite`] applies `path=value` edits
//!
//! Only the shapes that appear in generated mapping files are supported:
//! `key: value` scalars, nested mappings, block lists introduced by `- `,
//! and full-line comments. Flow collections such as `["a", "b"]` stay opaque
//! scalar text.
//!
//! # Example
//!
//! ```rust
//! use dr_controller::document::Document;
//!
//! let mut doc: Document = "---\nname: # example\nlist:\n- a: 1\n".parse().unwrap();
//! doc.activate_examples();
//! assert_eq!(doc.render(), "---\nname: example\nlist:\n- a: 1\n");
//! ```

pub mod builder;
pub mod error;
pub mod lexer;
pub mod rewrite;
pub mod writer;

pub use error::ParseError;
pub use rewrite::{Directive, PathSegment, RewriteAction};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Shape of a [`Node`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scalar,
    List,
    Dict,
    Comment,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scalar => "scalar",
            Self::List => "list",
            Self::Dict => "dict",
            Self::Comment => "comment",
        };
        f.write_str(name)
    }
}

/// Payload of a [`Node`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    /// Text after `key:`, with any leading `# ` removed when commented
    Scalar(String),
    /// Block list items, interleaved with comment lines
    List(Vec<Node>),
    /// Mapping entries, interleaved with comment lines
    Dict(Vec<Node>),
    /// A full-line comment or blank line, stored verbatim
    Comment(String),
}

/// One step in the path from the root to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Root,
    Key(String),
    Index(usize),
}

/// Back-link from a node to its ancestors, used for diagnostics only.
///
/// Nodes own their children; the location chain is shared, immutable and
/// never consulted when comparing or rendering nodes.
#[derive(Debug)]
pub struct Location {
    segment: Segment,
    parent: Option<Arc<Location>>,
}

impl Location {
    #[must_use]
    pub fn root() -> Arc<Self> {
        Arc::new(Self {
            segment: Segment::Root,
            parent: None,
        })
    }

    #[must_use]
    pub fn child(parent: &Arc<Self>, segment: Segment) -> Arc<Self> {
        Arc::new(Self {
            segment,
            parent: Some(Arc::clone(parent)),
        })
    }

    /// Dotted path such as `dr_import_storages[1].dr_domain_id`.
    #[must_use]
    pub fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut current = Some(self);
        while let Some(location) = current {
            segments.push(&location.segment);
            current = location.parent.as_deref();
        }

        let mut path = String::new();
        for segment in segments.into_iter().rev() {
            match segment {
                Segment::Root => {}
                Segment::Key(key) => {
                    if !path.is_empty() {
                        path.push('.');
                    }
                    path.push_str(key);
                }
                Segment::Index(index) => {
                    path.push_str(&format!("[{index}]"));
                }
            }
        }
        path
    }
}

/// A node of the mapping document.
#[derive(Debug, Clone)]
pub struct Node {
    /// Key text; empty for list items, comments and the root
    pub key: String,
    pub value: NodeValue,
    /// Scalar value was written as `key: # value`
    pub commented: bool,
    /// Node is skipped when rendering
    pub deleted: bool,
    /// Position among the parent's entries (list items count elements only)
    pub index: usize,
    /// Column of the key, counting a leading `- ` marker
    pub indent: usize,
    /// Source line, 1-based; 0 for the root and for appended nodes
    pub line: usize,
    /// The source line as read, without its newline; empty for synthetic nodes
    pub text: String,
    /// Written back in canonical form instead of [`Node::text`]
    pub modified: bool,
    location: Arc<Location>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.value == other.value
            && self.commented == other.commented
            && self.deleted == other.deleted
            && self.index == other.index
            && self.indent == other.indent
            && self.line == other.line
            && self.text == other.text
            && self.modified == other.modified
    }
}

impl Eq for Node {}

impl Node {
    pub(crate) fn new(
        key: impl Into<String>,
        value: NodeValue,
        indent: usize,
        line: usize,
        location: Arc<Location>,
    ) -> Self {
        Self {
            key: key.into(),
            value,
            commented: false,
            deleted: false,
            index: 0,
            indent,
            line,
            text: String::new(),
            modified: false,
            location,
        }
    }

    pub(crate) fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self.value {
            NodeValue::Scalar(_) => NodeKind::Scalar,
            NodeValue::List(_) => NodeKind::List,
            NodeValue::Dict(_) => NodeKind::Dict,
            NodeValue::Comment(_) => NodeKind::Comment,
        }
    }

    #[must_use]
    pub const fn is_comment(&self) -> bool {
        matches!(self.value, NodeValue::Comment(_))
    }

    /// Dotted path of this node, for diagnostics.
    #[must_use]
    pub fn path(&self) -> String {
        self.location.path()
    }

    pub(crate) fn location(&self) -> &Arc<Location> {
        &self.location
    }

    /// Scalar text, including commented example values.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Children of a list or dict, comment lines included.
    #[must_use]
    pub fn children(&self) -> Option<&[Node]> {
        match &self.value {
            NodeValue::List(children) | NodeValue::Dict(children) => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.value {
            NodeValue::List(children) | NodeValue::Dict(children) => Some(children),
            _ => None,
        }
    }

    /// Non-comment children in order.
    pub fn elements(&self) -> impl Iterator<Item = &Node> {
        self.children().unwrap_or_default().iter().filter(|n| !n.is_comment())
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.children_mut().map(|c| c.as_mut_slice()).unwrap_or_default().iter_mut().filter(|n| !n.is_comment())
    }

    /// First non-comment child of a dict with the given key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        match &self.value {
            NodeValue::Dict(children) => children.iter().find(|n| !n.is_comment() && n.key == key),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        match &mut self.value {
            NodeValue::Dict(children) => {
                children.iter_mut().find(|n| !n.is_comment() && n.key == key)
            }
            _ => None,
        }
    }

    /// Scalar value of a dict entry.
    #[must_use]
    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Node::as_scalar)
    }

    /// Replace this node's payload with an active scalar value.
    ///
    /// A commented node becomes uncommented and a deleted node is revived.
    pub fn set_scalar(&mut self, value: impl Into<String>) {
        self.value = NodeValue::Scalar(value.into());
        self.commented = false;
        self.deleted = false;
        self.modified = true;
    }

    /// Set `key` on a dict, appending a new entry when the key is missing.
    ///
    /// Returns `false` when this node is not a dict.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> bool {
        if let Some(existing) = self.get_mut(key) {
            existing.set_scalar(value);
            return true;
        }
        self.append_scalar(key, value)
    }

    fn append_scalar(&mut self, key: &str, value: impl Into<String>) -> bool {
        let indent = self.child_indent();
        let location = Location::child(&self.location, Segment::Key(key.to_string()));
        let NodeValue::Dict(children) = &mut self.value else {
            return false;
        };
        let mut node = Node::new(key, NodeValue::Scalar(value.into()), indent, 0, location);
        node.index = children.len();
        node.modified = true;
        children.push(node);
        true
    }

    /// Indent for a new entry of this dict: the indent of its existing
    /// entries, or one level below the dict itself.
    fn child_indent(&self) -> usize {
        if let Some(sibling) = self.elements().next() {
            return sibling.indent;
        }
        if matches!(self.location.segment, Segment::Root) {
            0
        } else {
            self.indent + 2
        }
    }

    /// Uncomment every commented scalar below this node.
    ///
    /// Returns the number of values that were activated.
    pub fn activate_examples(&mut self) -> usize {
        if self.commented && self.kind() == NodeKind::Scalar {
            self.commented = false;
            self.modified = true;
            return 1;
        }
        match &mut self.value {
            NodeValue::List(children) | NodeValue::Dict(children) => {
                children.iter_mut().map(Node::activate_examples).sum()
            }
            _ => 0,
        }
    }
}

/// A parsed mapping document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// The input started with a `---` line
    pub header: bool,
    /// The input ended with a newline
    pub trailing_newline: bool,
    /// Root dict; its children are the top-level entries
    pub root: Node,
}

impl Document {
    /// Parse a document from text.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let lexer = lexer::Lexer::new(text);
        let header = lexer.has_header();
        let tokens = lexer.collect::<Result<Vec<_>, _>>()?;
        let root = builder::TreeBuilder::new(tokens).build()?;
        Ok(Self {
            header,
            trailing_newline: text.is_empty() || text.ends_with('\n'),
            root,
        })
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.root.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.root.get_mut(key)
    }

    /// Uncomment every example value in the document.
    pub fn activate_examples(&mut self) -> usize {
        self.root.activate_examples()
    }
}

impl FromStr for Document {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
