//! # parselets
//!
//! Bidirectional grammar engine: one grammar parses text into a semantic
//! value tree, incrementally reparses edited text, and regenerates text from
//! (possibly mutated) values.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! reparse   → diff of old/new text, reuse of unchanged subtrees
//! generate  → value → parse tree → formatted text
//!   ↓
//! parser    → top-down driver, memo table, error ranking, recovery
//!   ↓
//! grammar   → parselets (literal sets, sequences, choices), slot mappings
//!   ↓
//! tree      → persistent parse-node tree, rowan export
//!   ↓
//! value     → semantic values, declared type forest
//!   ↓
//! base      → TextRange, LineIndex
//! ```
//!
//! ```
//! use parselets::{GrammarBuilder, LiteralSet, Modifiers, Value};
//!
//! let mut b = GrammarBuilder::new("words");
//! let word = b.literal_set("word", LiteralSet::char_range('a', 'z'), Modifiers::new().repeat());
//! let space = b.literal("space", " ", Modifiers::new().optional());
//! let item = b.sequence("item(.,)", &[word, space], Modifiers::new());
//! let list = b.sequence("list([])", &[item], Modifiers::new().repeat());
//! b.set_root(list);
//! let grammar = b.build();
//!
//! let doc = grammar.parse("ab cd").unwrap();
//! assert_eq!(doc.value(), &Value::list([Value::str("ab"), Value::str("cd")]));
//! ```

// ============================================================================
// MODULES (dependency order: base → value → tree → grammar → parser → ...)
// ============================================================================

/// Foundation types: TextRange, LineIndex
pub mod base;

/// Semantic values and declared types
pub mod value;

/// Parse-node tree shared between parse, reparse and generate
pub mod tree;

/// Grammar model and builder
pub mod grammar;

/// Parser driver and syntax errors
pub mod parser;

/// Incremental reparse
pub mod reparse;

/// Generation and formatting
pub mod generate;

use thiserror::Error;

// Re-export commonly needed items
pub use base::{LineIndex, Position, Span, TextRange, TextSize};
pub use generate::{FormatHint, FormatOptions, GenerateError, Generator, format};
pub use grammar::{
    Grammar, GrammarBuilder, GrammarError, GrammarRegistry, LiteralSet, Modifiers, ParseletId, ParseletOptions,
    SlotKind,
};
pub use parser::{ErrorCode, ParseError, ParseOptions, ParseStats, Parser};
pub use tree::{ParseElement, ParseNode, ParseNodeRef, ParsedDocument};
pub use value::{Object, ObjectRef, SlotAccess, TypeId, TypeRegistry, Value, ValueType};

/// Any failure surfaced by the crate's entry points
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Input(#[from] parser::InputError),
}
