//! Error code definitions for parse diagnostics
//!
//! Error codes follow a naming convention: E{category}{number}
//! - E01xx: Token-level errors (literals, negation, accept predicates)
//! - E02xx: Structural errors (sequences, choices, repeats)
//! - E03xx: Document-level errors (trailing input)
//! - E09xx: Generic/fallback errors

use std::fmt;

/// Error codes for parse diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // E01xx: Token-level errors
    // =========================================================================
    /// None of the expected literals is present
    E0101,
    /// Input skipped during error recovery
    E0102,
    /// A negated rule matched where it must not
    E0103,
    /// An accept predicate rejected the matched value
    E0104,

    // =========================================================================
    // E02xx: Structural errors
    // =========================================================================
    /// No alternative of a choice matched
    E0201,
    /// A repeated rule matched zero times
    E0203,
    /// A sequence matched but produced no content
    E0204,

    // =========================================================================
    // E03xx: Document-level errors
    // =========================================================================
    /// The root rule matched but input remains
    E0301,

    // =========================================================================
    // E09xx: Generic/fallback errors
    // =========================================================================
    /// Several equally advanced errors
    E0901,
    /// Internal parser error
    E0999,
}

impl ErrorCode {
    /// Get the string representation of the error code (e.g., "E0201")
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0102 => "E0102",
            Self::E0103 => "E0103",
            Self::E0104 => "E0104",
            Self::E0201 => "E0201",
            Self::E0203 => "E0203",
            Self::E0204 => "E0204",
            Self::E0301 => "E0301",
            Self::E0901 => "E0901",
            Self::E0999 => "E0999",
        }
    }

    /// Get a short description of the error category
    pub fn category_description(&self) -> &'static str {
        match self {
            Self::E0101 | Self::E0102 | Self::E0103 | Self::E0104 => "token error",
            Self::E0201 | Self::E0203 | Self::E0204 => "structural error",
            Self::E0301 => "document error",
            Self::E0901 | Self::E0999 => "syntax error",
        }
    }

    /// Get the default message template for this error code
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::E0101 => "expected literal",
            Self::E0102 => "unexpected input",
            Self::E0103 => "unexpected match",
            Self::E0104 => "value rejected",
            Self::E0201 => "no alternative matched",
            Self::E0203 => "expected at least one match",
            Self::E0204 => "no content",
            Self::E0301 => "unexpected trailing input",
            Self::E0901 => "multiple errors",
            Self::E0999 => "internal parser error",
        }
    }

    /// Check if this error stems from recovery skipping text
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::E0102)
    }

    /// Check if this is a recoverable error (parsing can continue)
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::E0999)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
