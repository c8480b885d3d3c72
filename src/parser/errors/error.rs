//! Parse error type
//!
//! A [`ParseError`] carries:
//! - the originating parselet and an error code with arguments
//! - the `[start, end)` range in the parsed text
//! - an optional partial result (the best parse node reached)
//! - nested errors when several equally advanced failures are reported

use std::fmt;

use smol_str::SmolStr;
use thiserror::Error;

use super::codes::ErrorCode;
use crate::base::{LineIndex, TextRange, text_range};
use crate::grammar::ParseletId;
use crate::tree::ParseNodeRef;
use crate::value::Value;

/// A syntax error, possibly carrying the partial result reached.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message} at {range:?}")]
pub struct ParseError {
    /// Categorized error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Arguments the message was built from (e.g. expected literals)
    pub args: Vec<SmolStr>,
    /// Parselet that failed, if any
    pub parselet: Option<ParseletId>,
    /// Range in the parsed text
    pub range: TextRange,
    /// Best partial parse reached before the failure
    pub partial: Option<ParseNodeRef>,
    /// Nested errors (multi-error, or errors skipped by recovery)
    pub errors: Vec<ParseError>,
    /// The failure happened at end of input
    pub eof: bool,
    /// The partial result continues an optional rule that failed
    pub optional_continuation: bool,
}

impl ParseError {
    /// Create an error with the code's default message
    pub fn new(code: ErrorCode, start: usize, end: usize) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            args: Vec::new(),
            parselet: None,
            range: text_range(start, end),
            partial: None,
            errors: Vec::new(),
            eof: false,
            optional_continuation: false,
        }
    }

    /// Create a builder for more complex error construction
    pub fn builder(code: ErrorCode) -> ParseErrorBuilder {
        ParseErrorBuilder::new(code)
    }

    /// Bundle several equally advanced errors
    pub fn multiple(errors: Vec<ParseError>) -> Self {
        let start = errors.iter().map(|e| e.start()).min().unwrap_or(0);
        let end = errors.iter().map(|e| e.end()).max().unwrap_or(start);
        let mut multi = Self::new(ErrorCode::E0901, start, end);
        multi.eof = errors.iter().any(|e| e.eof);
        multi.message = errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        multi.errors = errors;
        multi
    }

    pub fn start(&self) -> usize {
        usize::from(self.range.start())
    }

    pub fn end(&self) -> usize {
        usize::from(self.range.end())
    }

    pub fn with_parselet(mut self, parselet: ParseletId) -> Self {
        self.parselet = Some(parselet);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_partial(mut self, partial: ParseNodeRef) -> Self {
        self.partial = Some(partial);
        self
    }

    pub fn with_eof(mut self, eof: bool) -> Self {
        self.eof = eof;
        self
    }

    /// Check if this error bundles several errors
    pub fn is_multiple(&self) -> bool {
        self.code == ErrorCode::E0901
    }

    /// The semantic value of the partial parse, if one was reached
    pub fn partial_value(&self) -> Option<Value> {
        self.partial.as_ref().map(|node| node.value().clone())
    }

    /// Length of text covered by the partial parse
    pub fn partial_len(&self) -> usize {
        self.partial.as_ref().map(|node| node.len()).unwrap_or(0)
    }

    /// This error and its nested errors, depth first
    pub fn flatten(&self) -> Vec<&ParseError> {
        let mut out = vec![self];
        for nested in &self.errors {
            out.extend(nested.flatten());
        }
        out
    }

    /// Render with a line/column position, e.g. `2:5: E0101: expected ';'`
    pub fn display_with(&self, index: &LineIndex) -> String {
        format!(
            "{}: {}: {}",
            index.position(self.start()),
            self.code,
            self.message
        )
    }
}

/// Builder for creating complex parse errors
pub struct ParseErrorBuilder {
    error: ParseError,
}

impl ParseErrorBuilder {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            error: ParseError::new(code, 0, 0),
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.error.message = message.into();
        self
    }

    pub fn arg(mut self, arg: impl Into<SmolStr>) -> Self {
        self.error.args.push(arg.into());
        self
    }

    pub fn range(mut self, start: usize, end: usize) -> Self {
        self.error.range = text_range(start, end);
        self
    }

    pub fn parselet(mut self, parselet: ParseletId) -> Self {
        self.error.parselet = Some(parselet);
        self
    }

    pub fn partial(mut self, partial: Option<ParseNodeRef>) -> Self {
        self.error.partial = partial;
        self
    }

    pub fn eof(mut self, eof: bool) -> Self {
        self.error.eof = eof;
        self
    }

    pub fn nested(mut self, errors: Vec<ParseError>) -> Self {
        self.error.errors = errors;
        self
    }

    pub fn build(self) -> ParseError {
        self.error
    }
}

/// Compact form used in logs: `E0101@3..4`
pub struct ShortError<'a>(pub &'a ParseError);

impl fmt::Display for ShortError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}..{}", self.0.code, self.0.start(), self.0.end())
    }
}
