//! Parse error handling
//!
//! - Categorized error codes for filtering and documentation
//! - [`ParseError`] with ranges, partial results and nested errors
//! - Error ranking: only the most advanced failure is reported

mod codes;
mod error;
mod ranking;

pub use codes::ErrorCode;
pub use error::{ParseError, ParseErrorBuilder, ShortError};
pub use ranking::{ErrorSet, is_better_error};

#[cfg(test)]
mod tests;
