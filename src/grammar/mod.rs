//! Grammar model
//!
//! A grammar is an arena of parselets addressed by [`ParseletId`]. There are
//! three parselet kinds: literal sets, sequences and ordered choices. Rules
//! may refer to each other (and to themselves) freely since children are
//! ids, not owned values.
//!
//! ```text
//! GrammarBuilder ── build() ──> Grammar
//!                                 ├── parselets: Vec<Parselet>
//!                                 ├── types: TypeRegistry
//!                                 └── diagnostics: Vec<GrammarError>
//! ```

mod builder;
mod choice;
pub mod descriptor;
pub mod literal;
mod registry;
mod sequence;
pub mod slots;

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;

use crate::generate::{self, FormatHint, FormatOptions, GenerateError, Generator};
use crate::parser::{ParseError, ParseOptions, Parser};
use crate::reparse;
use crate::tree::{ParseNode, ParseNodeRef, ParsedDocument};
use crate::value::{TypeRegistry, Value, ValueType};

pub use builder::GrammarBuilder;
pub use descriptor::{Descriptor, DescriptorError, parse_descriptor};
pub use literal::LiteralSet;
pub use registry::GrammarRegistry;
pub use slots::{DeclaredType, SlotKind, SlotMapping, ValueShape};

pub(crate) use choice::parse as parse_choice;
pub(crate) use sequence::{OldNode, parse as parse_sequence, push_element};

/// Index of a parselet within its grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParseletId(pub(crate) u32);

impl ParseletId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Matching modifiers shared by every parselet kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modifiers {
    /// May match nothing
    pub optional: bool,
    /// Match one or more times (zero or more with `optional`)
    pub repeat: bool,
    /// Match without consuming input
    pub lookahead: bool,
    /// Succeed only where the parselet does not match
    pub negated: bool,
    /// Merge the match into the parent instead of keeping a node
    pub skip: bool,
    /// Keep the text but drop the node and its value
    pub discard: bool,
    /// Record failures in the diagnostics offered to the caller
    pub report_error: bool,
    /// Memoize results by position
    pub cacheable: bool,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        optional: false,
        repeat: false,
        lookahead: false,
        negated: false,
        skip: false,
        discard: false,
        report_error: true,
        cacheable: false,
    };

    pub fn new() -> Self {
        Self::NONE
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn repeat(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// `optional` + `repeat`
    pub fn many(self) -> Self {
        self.optional().repeat()
    }

    pub fn lookahead(mut self) -> Self {
        self.lookahead = true;
        self
    }

    pub fn negated(mut self) -> Self {
        self.negated = true;
        self
    }

    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn discard(mut self) -> Self {
        self.discard = true;
        self
    }

    pub fn silent(mut self) -> Self {
        self.report_error = false;
        self
    }

    pub fn cacheable(mut self) -> Self {
        self.cacheable = true;
        self
    }

    /// Whether the parselet can succeed without consuming anything
    pub fn matches_nothing(&self) -> bool {
        self.optional || self.lookahead || self.negated
    }
}

/// Semantic check run on a successful match: `(value, matched text)`.
pub type AcceptFn = Arc<dyn Fn(&Value, &str) -> Result<(), String> + Send + Sync>;

/// Per-parselet behavior beyond the modifiers.
#[derive(Clone, Default)]
pub struct ParseletOptions {
    /// Rejects a match after the fact (e.g. keywords used as identifiers)
    pub accept: Option<AcceptFn>,
    /// Spacing placeholder emitted by generation instead of text
    pub format: Option<FormatHint>,
    /// Allow a sequence of optional children to match nothing
    pub accept_no_content: bool,
    /// A match needs content at or after this child index
    pub min_content_slot: Option<usize>,
    /// Children from this index on may fail; the failure is skipped
    pub skip_on_error_slot: Option<usize>,
    /// Left-fold a repeated tail into the head through this property
    pub chain_slot: Option<SmolStr>,
    /// Consumes text a repeated choice could not match
    pub skip_on_error: Option<ParseletId>,
    /// Ends a repeated choice's error skipping
    pub exit: Option<ParseletId>,
}

impl fmt::Debug for ParseletOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseletOptions")
            .field("accept", &self.accept.is_some())
            .field("format", &self.format)
            .field("accept_no_content", &self.accept_no_content)
            .field("min_content_slot", &self.min_content_slot)
            .field("skip_on_error_slot", &self.skip_on_error_slot)
            .field("chain_slot", &self.chain_slot)
            .field("skip_on_error", &self.skip_on_error)
            .field("exit", &self.exit)
            .finish()
    }
}

impl ParseletOptions {
    pub fn accept(mut self, f: impl Fn(&Value, &str) -> Result<(), String> + Send + Sync + 'static) -> Self {
        self.accept = Some(Arc::new(f));
        self
    }

    pub fn format(mut self, hint: FormatHint) -> Self {
        self.format = Some(hint);
        self
    }
}

/// Children of a sequence or choice plus their slot mapping
#[derive(Debug, Clone, Default)]
pub struct Composite {
    pub(crate) children: Vec<ParseletId>,
    pub(crate) slots: SlotMapping,
    /// A child is a skip composite whose elements are spliced in
    pub(crate) splices: bool,
    /// Every child may match nothing
    pub(crate) all_optional: bool,
    /// For choices: parselets whose nodes an alternative may return
    pub(crate) alternatives_produce: Vec<ParseletId>,
}

impl Composite {
    pub fn children(&self) -> &[ParseletId] {
        &self.children
    }

    pub fn slots(&self) -> &SlotMapping {
        &self.slots
    }
}

#[derive(Debug, Clone)]
pub enum ParseletKind {
    Literal(LiteralSet),
    Sequence(Composite),
    Choice(Composite),
}

/// One grammar rule.
#[derive(Debug)]
pub struct Parselet {
    pub(crate) id: ParseletId,
    pub(crate) name: SmolStr,
    pub(crate) positional: bool,
    pub(crate) modifiers: Modifiers,
    pub(crate) kind: ParseletKind,
    pub(crate) options: ParseletOptions,
    pub(crate) declared: Option<DeclaredType>,
    pub(crate) shape: ValueShape,
    /// Parselets whose nodes this one may return (itself, or alternatives
    /// passed through by a choice)
    pub(crate) produces: Vec<ParseletId>,
    pub(crate) value_type: OnceCell<ValueType>,
}

impl Parselet {
    pub(crate) fn new(id: ParseletId, name: SmolStr, kind: ParseletKind, modifiers: Modifiers) -> Self {
        Self {
            id,
            name,
            positional: false,
            modifiers,
            kind,
            options: ParseletOptions::default(),
            declared: None,
            shape: ValueShape::Null,
            produces: vec![id],
            value_type: OnceCell::new(),
        }
    }

    pub fn id(&self) -> ParseletId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn kind(&self) -> &ParseletKind {
        &self.kind
    }

    pub fn options(&self) -> &ParseletOptions {
        &self.options
    }

    pub fn declared_type(&self) -> Option<&DeclaredType> {
        self.declared.as_ref()
    }

    pub fn shape(&self) -> ValueShape {
        self.shape
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ParseletKind::Literal(_))
    }

    pub fn composite(&self) -> Option<&Composite> {
        match &self.kind {
            ParseletKind::Sequence(c) | ParseletKind::Choice(c) => Some(c),
            ParseletKind::Literal(_) => None,
        }
    }

    /// Whether a node built by `other` can stand for a match of this parselet
    pub fn can_produce(&self, other: ParseletId) -> bool {
        self.produces.contains(&other)
    }

    /// Display name for messages: `<name>` for positional rules
    pub fn display_name(&self) -> String {
        if self.positional {
            format!("<{}>", self.name)
        } else if self.name.is_empty() {
            format!("#{}", self.id.index())
        } else {
            self.name.to_string()
        }
    }
}

/// Problems found while building a grammar. They are collected, not thrown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("'{rule}': malformed descriptor: {source}")]
    Descriptor {
        rule: String,
        #[source]
        source: DescriptorError,
    },
    #[error("'{rule}': {message}")]
    Slots { rule: String, message: String },
    #[error("'{rule}': alternatives '{first}' and '{second}' have no common type")]
    NoCommonType {
        rule: String,
        first: String,
        second: String,
    },
    #[error("type '{name}' redeclared with a different parent")]
    TypeConflict { name: String },
    #[error("'{rule}': unknown type '{name}'")]
    UnknownType { rule: String, name: String },
    #[error("'{rule}': excluded literal '{literal}' does not extend any literal")]
    Exclusion { rule: String, literal: String },
    #[error("'{rule}': {message}")]
    Structure { rule: String, message: String },
    #[error("grammar has no root rule")]
    NoRoot,
}

/// A built grammar: immutable, shareable across threads and parses.
#[derive(Debug)]
pub struct Grammar {
    pub(crate) name: SmolStr,
    pub(crate) parselets: Vec<Parselet>,
    pub(crate) root: Option<ParseletId>,
    pub(crate) types: TypeRegistry,
    pub(crate) diagnostics: Vec<GrammarError>,
    pub(crate) by_name: FxHashMap<SmolStr, ParseletId>,
}

impl Grammar {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parselet(&self, id: ParseletId) -> &Parselet {
        &self.parselets[id.index()]
    }

    pub fn parselets(&self) -> &[Parselet] {
        &self.parselets
    }

    /// Find a parselet by rule name
    pub fn lookup(&self, name: &str) -> Option<ParseletId> {
        self.by_name.get(name).copied()
    }

    pub fn root(&self) -> Option<ParseletId> {
        self.root
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Definition problems found by [`GrammarBuilder::build`]
    pub fn diagnostics(&self) -> &[GrammarError] {
        &self.diagnostics
    }

    /// Static type of the values a parselet produces
    pub fn value_type(&self, id: ParseletId) -> ValueType {
        let parselet = self.parselet(id);
        *parselet
            .value_type
            .get_or_init(|| builder::resolve_value_type(&self.parselets, &self.types, id).unwrap_or_default())
    }

    pub fn parse(&self, text: &str) -> Result<ParsedDocument, ParseError> {
        self.parse_with(text, ParseOptions::default())
    }

    pub fn parse_with(&self, text: &str, options: ParseOptions) -> Result<ParsedDocument, ParseError> {
        Parser::new(self, text, options).parse()
    }

    /// Parse `text` with a rule other than the root
    pub fn parse_rule(&self, id: ParseletId, text: &str, options: ParseOptions) -> Result<ParsedDocument, ParseError> {
        Parser::new(self, text, options).parse_parselet(id)
    }

    /// Parse input pulled lazily from a reader
    pub fn parse_reader(&self, reader: impl Read + 'static, options: ParseOptions) -> Result<ParsedDocument, crate::Error> {
        let mut parser = Parser::from_reader(self, reader, options);
        let result = parser.run_root();
        if let Some(err) = parser.take_input_error() {
            return Err(err.into());
        }
        result.map_err(Into::into)
    }

    /// Incrementally reparse `old` against its edited text
    pub fn reparse(&self, old: &ParsedDocument, new_text: &str, options: ParseOptions) -> Result<ParsedDocument, ParseError> {
        reparse::reparse(self, old, new_text, options)
    }

    /// Build a parse tree for `value` with the root rule
    pub fn generate(&self, value: &Value) -> Result<ParseNodeRef, GenerateError> {
        let root = self.root.ok_or(GenerateError::NoRoot)?;
        Generator::new(self).generate(root, value)
    }

    /// Generate and format `value` into text
    pub fn generate_text(&self, value: &Value) -> Result<String, GenerateError> {
        let node = self.generate(value)?;
        Ok(generate::format(&node, &FormatOptions::default()))
    }

    /// Resolve placeholders and print a tree
    pub fn format(&self, node: &ParseNode, options: &FormatOptions) -> String {
        generate::format(node, options)
    }
}
