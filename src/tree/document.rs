//! A parsed text together with its parse tree.

use rowan::GreenNode;

use super::cst::{self, SyntaxNode};
use super::ParseNodeRef;
use crate::parser::ParseStats;
use crate::value::Value;

/// Result of a successful parse or reparse.
///
/// Keeps the text the tree was built from so a later reparse can diff
/// against it.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    text: String,
    root: ParseNodeRef,
    stats: ParseStats,
}

impl ParsedDocument {
    pub(crate) fn new(text: String, root: ParseNodeRef, stats: ParseStats) -> Self {
        Self { text, root, stats }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &ParseNodeRef {
        &self.root
    }

    /// The semantic value of the whole document
    pub fn value(&self) -> &Value {
        self.root.value()
    }

    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Lossless rowan green tree of the parse tree
    pub fn to_green(&self) -> GreenNode {
        cst::to_green(&self.root)
    }

    /// Rowan syntax tree with parent pointers and offsets
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.to_green())
    }
}
