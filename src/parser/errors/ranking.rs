//! Ranking of competing parse errors.
//!
//! Only the most advanced errors are worth reporting: the one that diagnosed
//! the longest valid prefix. Equally advanced errors accumulate.

use tracing::trace;

use super::error::{ParseError, ShortError};

/// Errors spanning more than this many chars from offset 0 yield to an error
/// that starts at or after their end.
const LEADING_ERROR_MIN_LEN: usize = 2;

/// True if an error spanning `[new_start, new_end)` should replace the current
/// best error spanning `[cur_start, cur_end)`.
///
/// An error ending further into the input wins. On equal ends the error that
/// starts later wins, so `(2,5)` replaces `(0,5)`. When one error starts at
/// offset 0, is longer than two chars, and the other starts at or after its
/// end, the one further along wins even if it is shorter.
pub fn is_better_error(cur_start: usize, cur_end: usize, new_start: usize, new_end: usize) -> bool {
    if cur_start == 0 && cur_end - cur_start > LEADING_ERROR_MIN_LEN && new_start >= cur_end {
        return true;
    }
    if new_start == 0 && new_end - new_start > LEADING_ERROR_MIN_LEN && cur_start >= new_end {
        return false;
    }
    if new_end != cur_end {
        return new_end > cur_end;
    }
    new_start > cur_start
}

/// The set of most advanced errors seen so far in one parse.
#[derive(Debug, Default, Clone)]
pub struct ErrorSet {
    best: Vec<ParseError>,
}

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer an error; returns true if it was kept.
    pub fn offer(&mut self, error: &ParseError) -> bool {
        let Some(current) = self.best.first() else {
            self.best.push(error.clone());
            return true;
        };
        let (cs, ce) = (current.start(), current.end());
        let (ns, ne) = (error.start(), error.end());
        if (cs, ce) == (ns, ne) {
            let duplicate = self
                .best
                .iter()
                .any(|e| e.parselet == error.parselet && e.code == error.code);
            if !duplicate {
                self.best.push(error.clone());
            } else if error.partial_len() > self.partial_len() {
                // Same diagnosis, but this one carries a longer partial result
                if let Some(slot) = self
                    .best
                    .iter_mut()
                    .find(|e| e.parselet == error.parselet && e.code == error.code)
                {
                    *slot = error.clone();
                }
            }
            return !duplicate;
        }
        if is_better_error(cs, ce, ns, ne) {
            trace!(
                "[ERRORS] {} replaces {} error(s)",
                ShortError(error),
                self.best.len()
            );
            self.best.clear();
            self.best.push(error.clone());
            return true;
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_empty()
    }

    pub fn len(&self) -> usize {
        self.best.len()
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.best
    }

    fn partial_len(&self) -> usize {
        self.best.iter().map(|e| e.partial_len()).max().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.best.clear();
    }

    /// The single most advanced error, or a multi-error bundling ties
    pub fn to_error(&self) -> Option<ParseError> {
        match self.best.len() {
            0 => None,
            1 => self.best.first().cloned(),
            _ => Some(ParseError::multiple(self.best.clone())),
        }
    }
}
