//! Parse-node tree
//!
//! One node per matched grammar rule. Nodes store only their length; offsets
//! are computed while walking, so an unchanged subtree can be shared by an old
//! and a new tree after an incremental reparse (like rowan green nodes).
//!
//! ```text
//! ParseNode
//!   ├── Leaf      matched token text
//!   ├── Parent    children: nodes, raw text, empty slots
//!   ├── Error     text skipped by recovery (+ partial children)
//!   └── Formatted placeholder resolved by `format()`
//! ```

pub mod cst;
mod document;


use std::fmt;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::generate::FormatHint;
use crate::grammar::ParseletId;
use crate::parser::ErrorCode;
use crate::value::{ObjectRef, Value};

pub use document::ParsedDocument;

/// Shared handle to a parse node
pub type ParseNodeRef = Rc<ParseNode>;

/// One entry in a parent's child list.
#[derive(Debug, Clone)]
pub enum ParseElement {
    Node(ParseNodeRef),
    /// Text kept without a node (skip-merged literals, discarded matches)
    Text(SmolStr),
    /// A child rule that matched nothing (optional, lookahead, negated)
    Empty,
}

impl ParseElement {
    pub fn len(&self) -> usize {
        match self {
            ParseElement::Node(node) => node.len(),
            ParseElement::Text(text) => text.len(),
            ParseElement::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_node(&self) -> Option<&ParseNodeRef> {
        match self {
            ParseElement::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn value(&self) -> Value {
        match self {
            ParseElement::Node(node) => node.value().clone(),
            ParseElement::Text(text) => Value::Str(text.clone()),
            ParseElement::Empty => Value::Null,
        }
    }

    pub fn write_text(&self, out: &mut String) {
        match self {
            ParseElement::Node(node) => node.write_text(out),
            ParseElement::Text(text) => out.push_str(text),
            ParseElement::Empty => {}
        }
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }
}

/// Node payload
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Matched token text
    Leaf(SmolStr),
    /// Composite match
    Parent(Vec<ParseElement>),
    /// Text consumed by error recovery
    Error {
        children: Vec<ParseElement>,
        code: ErrorCode,
        message: SmolStr,
    },
    /// Derived content (spacing, indentation) produced by generation
    Formatted(FormatHint),
}

/// A node of the parse tree.
pub struct ParseNode {
    parselet: ParseletId,
    kind: NodeKind,
    value: Value,
    len: usize,
    /// subtree contains an error node
    errors: bool,
}

fn children_have_errors(children: &[ParseElement]) -> bool {
    children
        .iter()
        .filter_map(ParseElement::as_node)
        .any(|n| n.errors)
}

impl ParseNode {
    fn alloc(parselet: ParseletId, kind: NodeKind, value: Value, len: usize) -> ParseNodeRef {
        let errors = match &kind {
            NodeKind::Parent(children) => children_have_errors(children),
            NodeKind::Error { .. } => true,
            NodeKind::Leaf(_) | NodeKind::Formatted(_) => false,
        };
        let node = Rc::new(ParseNode {
            parselet,
            kind,
            value,
            len,
            errors,
        });
        node.value.bind_parse_node(&node);
        node
    }

    pub fn leaf(parselet: ParseletId, text: impl Into<SmolStr>, value: Value) -> ParseNodeRef {
        let text = text.into();
        let len = text.len();
        Self::alloc(parselet, NodeKind::Leaf(text), value, len)
    }

    pub fn parent(parselet: ParseletId, children: Vec<ParseElement>, value: Value) -> ParseNodeRef {
        let len = children.iter().map(ParseElement::len).sum();
        Self::alloc(parselet, NodeKind::Parent(children), value, len)
    }

    pub fn error(
        parselet: ParseletId,
        children: Vec<ParseElement>,
        code: ErrorCode,
        message: impl Into<SmolStr>,
    ) -> ParseNodeRef {
        let len = children.iter().map(ParseElement::len).sum();
        // An error node carries the value of its partial content, if any
        let value = children
            .iter()
            .filter_map(ParseElement::as_node)
            .map(|n| n.value().clone())
            .find(|v| !v.is_null())
            .unwrap_or_default();
        let kind = NodeKind::Error {
            children,
            code,
            message: message.into(),
        };
        // The partial content stays authoritative for its value
        Rc::new(ParseNode {
            parselet,
            kind,
            value,
            len,
            errors: true,
        })
    }

    pub fn formatted(parselet: ParseletId, hint: FormatHint) -> ParseNodeRef {
        Self::alloc(parselet, NodeKind::Formatted(hint), Value::Null, 0)
    }

    /// Same node content with a different value
    pub fn with_value(&self, value: Value) -> ParseNodeRef {
        Self::alloc(self.parselet, self.kind.clone(), value, self.len)
    }

    /// Same parselet and value, new children
    pub fn with_children(&self, children: Vec<ParseElement>) -> ParseNodeRef {
        match &self.kind {
            NodeKind::Error { code, message, .. } => {
                Self::error(self.parselet, children, *code, message.clone())
            }
            _ => Self::parent(self.parselet, children, self.value.clone()),
        }
    }

    pub fn parselet(&self) -> ParseletId {
        self.parselet
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Length in bytes of the text this node covers
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, NodeKind::Error { .. })
    }

    pub fn is_formatted(&self) -> bool {
        matches!(self.kind, NodeKind::Formatted(_))
    }

    pub fn children(&self) -> &[ParseElement] {
        match &self.kind {
            NodeKind::Parent(children) | NodeKind::Error { children, .. } => children,
            NodeKind::Leaf(_) | NodeKind::Formatted(_) => &[],
        }
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = &ParseNodeRef> {
        self.children().iter().filter_map(ParseElement::as_node)
    }

    pub fn write_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Leaf(text) => out.push_str(text),
            NodeKind::Parent(children) | NodeKind::Error { children, .. } => {
                for child in children {
                    child.write_text(out);
                }
            }
            NodeKind::Formatted(_) => {}
        }
    }

    /// The text covered by this node
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.len);
        self.write_text(&mut out);
        out
    }

    /// Number of nodes in this subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self.child_nodes().map(|c| c.node_count()).sum::<usize>()
    }

    /// True if this subtree contains error nodes
    pub fn has_errors(&self) -> bool {
        self.errors
    }

    /// True if this subtree contains unresolved format placeholders
    pub fn has_placeholders(&self) -> bool {
        self.is_formatted() || self.child_nodes().any(|c| c.has_placeholders())
    }

    /// Visit every leaf-like element (leaf nodes, raw text, placeholders and
    /// error text) in order with its start offset.
    ///
    /// The callback returns `false` to stop the walk.
    pub fn walk_tokens(&self, start: usize, visit: &mut dyn FnMut(usize, &str, &ParseNode) -> bool) -> bool {
        match &self.kind {
            NodeKind::Leaf(text) => visit(start, text, self),
            NodeKind::Formatted(_) => visit(start, "", self),
            NodeKind::Parent(children) | NodeKind::Error { children, .. } => {
                let mut offset = start;
                for child in children {
                    let keep_going = match child {
                        ParseElement::Node(node) => node.walk_tokens(offset, visit),
                        ParseElement::Text(text) => visit(offset, text, self),
                        ParseElement::Empty => true,
                    };
                    if !keep_going {
                        return false;
                    }
                    offset += child.len();
                }
                true
            }
        }
    }

    /// Child indexes leading from this node to the node whose value is `target`.
    ///
    /// The outermost node holding the object wins, matching the binding made
    /// when nodes are built.
    pub fn path_to_value(&self, target: &ObjectRef) -> Option<Vec<usize>> {
        if let Value::Object(obj) = &self.value {
            if obj.ptr_eq(target) {
                return Some(Vec::new());
            }
        }
        for (ix, child) in self.children().iter().enumerate() {
            if let ParseElement::Node(node) = child {
                if let Some(mut path) = node.path_to_value(target) {
                    path.insert(0, ix);
                    return Some(path);
                }
            }
        }
        None
    }

    /// Copy the path to `path`, replacing the node found there by `replacement`.
    ///
    /// Untouched siblings are shared with the original tree.
    pub fn replace_at(&self, path: &[usize], replacement: ParseNodeRef) -> ParseNodeRef {
        let Some((&first, rest)) = path.split_first() else {
            return replacement;
        };
        let mut children = self.children().to_vec();
        if let Some(ParseElement::Node(child)) = children.get(first) {
            let replaced = child.replace_at(rest, replacement);
            children[first] = ParseElement::Node(replaced);
        }
        self.with_children(children)
    }

    /// Re-point every object in this subtree at its node, outermost last.
    pub fn rebind_values(self: &Rc<Self>) {
        for child in self.child_nodes() {
            child.rebind_values();
        }
        self.value.bind_parse_node(self);
    }
}

impl fmt::Debug for ParseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Leaf(text) => write!(f, "Leaf#{}({:?})", self.parselet.index(), text.as_str()),
            NodeKind::Formatted(hint) => write!(f, "Formatted#{}({:?})", self.parselet.index(), hint),
            NodeKind::Parent(children) => f
                .debug_tuple(&format!("Parent#{}", self.parselet.index()))
                .field(children)
                .finish(),
            NodeKind::Error { children, code, .. } => f
                .debug_tuple(&format!("Error#{}[{}]", self.parselet.index(), code))
                .field(children)
                .finish(),
        }
    }
}
