//! Foundation types shared by every layer.
//!
//! - [`TextRange`], [`TextSize`] - byte offsets into parsed text
//! - [`LineIndex`], [`Position`], [`Span`] - line/column conversion for diagnostics
//!
//! This module has NO dependencies on other parselets modules.

mod position;

pub use position::{LineIndex, Position, Span, text_range};

pub use text_size::{self, TextRange, TextSize};
