//! Export of a parse tree as a lossless rowan tree.
//!
//! Each parse node becomes a rowan node whose raw kind is the parselet index;
//! raw text elements become tokens of kind [`TEXT_KIND`] and error nodes use
//! [`ERROR_KIND`]. This gives tooling the usual rowan API (parent pointers,
//! offsets, `covering_element`) over any grammar.

use rowan::{GreenNode, GreenNodeBuilder};

use super::{NodeKind, ParseElement, ParseNode};

/// Raw kind of tokens that hold raw text without a parselet
pub const TEXT_KIND: u16 = u16::MAX;
/// Raw kind of error nodes
pub const ERROR_KIND: u16 = u16::MAX - 1;

/// Language definition for Rowan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GrammarLanguage {}

impl rowan::Language for GrammarLanguage {
    type Kind = rowan::SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind
    }
}

/// Type aliases for convenience
pub type SyntaxNode = rowan::SyntaxNode<GrammarLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<GrammarLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<GrammarLanguage>;

/// Build the green tree of `root`
pub fn to_green(root: &ParseNode) -> GreenNode {
    let mut builder = GreenNodeBuilder::new();
    build_node(root, &mut builder);
    builder.finish()
}

fn kind_of(node: &ParseNode) -> rowan::SyntaxKind {
    if node.is_error() {
        rowan::SyntaxKind(ERROR_KIND)
    } else {
        // Parselet indexes above the reserved kinds would alias them
        rowan::SyntaxKind(u16::try_from(node.parselet().index()).unwrap_or(ERROR_KIND - 1))
    }
}

fn build_node(node: &ParseNode, builder: &mut GreenNodeBuilder<'static>) {
    match node.kind() {
        NodeKind::Leaf(text) => {
            builder.start_node(kind_of(node));
            builder.token(kind_of(node), text);
            builder.finish_node();
        }
        NodeKind::Formatted(_) => {
            builder.start_node(kind_of(node));
            builder.finish_node();
        }
        NodeKind::Parent(children) | NodeKind::Error { children, .. } => {
            builder.start_node(kind_of(node));
            for child in children {
                match child {
                    ParseElement::Node(child) => build_node(child, builder),
                    ParseElement::Text(text) => builder.token(rowan::SyntaxKind(TEXT_KIND), text),
                    ParseElement::Empty => {}
                }
            }
            builder.finish_node();
        }
    }
}
