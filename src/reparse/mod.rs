//! Incremental reparse
//!
//! A reparse diffs the old and new text, widens the changed range to whole
//! tokens of the old tree and drives the grammar again with the old tree as a
//! hint. Subtrees lying entirely outside the changed range are reused by
//! reference when they line up with the parse position.
//!
//! ```text
//! old:  let a = 1 ; let b = 2 ;
//!                ^^^              changed tokens (old coordinates)
//!       [ before ][changed][    after, shifted by diff_len    ]
//! ```


use tracing::debug;

use crate::grammar::Grammar;
use crate::parser::{ErrorCode, ParseError, ParseOptions, ParseStats, Parser};
use crate::tree::{ParseNode, ParsedDocument};

/// Where an old node lies relative to the changed range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Ends before the first changed token; offsets are unchanged
    Before,
    /// Starts after the last changed token; offsets shift by the diff length
    After,
    /// Overlaps the changed tokens
    Changed,
}

/// Old/new text bookkeeping for one reparse.
#[derive(Debug, Clone)]
pub struct DiffContext {
    /// First differing byte, in both texts
    start_change_old: usize,
    /// End of the differing bytes in the old text
    end_change_old: usize,
    /// End of the differing bytes in the new text
    end_change_new: usize,
    /// new length - old length
    diff_len: isize,
    /// Start of the first old token touching the change
    start_reparse_old: usize,
    /// End of the last old token touching the change
    end_reparse_old: usize,
    /// The parse is past the change and lined up with the old tree again
    pub(crate) same_again: bool,
    unchanged: bool,
}

impl DiffContext {
    pub fn new(old_text: &str, new_text: &str, old_root: &ParseNode) -> Self {
        let prefix = common_prefix(old_text, new_text);
        let suffix = common_suffix(&old_text[prefix..], &new_text[prefix..]);
        let end_change_old = old_text.len() - suffix;
        let end_change_new = new_text.len() - suffix;
        let unchanged = old_text == new_text;

        let mut start_reparse_old = prefix;
        let mut end_reparse_old = end_change_old;
        if !unchanged {
            // widen to the tokens touching the change: the last token starting
            // before it and the first token ending after it
            old_root.walk_tokens(0, &mut |start, text, _| {
                let end = start + text.len();
                if text.is_empty() {
                    return true;
                }
                if start < prefix {
                    start_reparse_old = start;
                }
                if end > end_change_old {
                    end_reparse_old = end;
                    return false;
                }
                true
            });
        }

        let diff = Self {
            start_change_old: prefix,
            end_change_old,
            end_change_new,
            diff_len: new_text.len() as isize - old_text.len() as isize,
            start_reparse_old,
            end_reparse_old,
            same_again: unchanged,
            unchanged,
        };
        debug!(
            change_old = ?(diff.start_change_old, diff.end_change_old),
            change_new = ?(diff.start_change_old, diff.end_change_new),
            reparse_old = ?(diff.start_reparse_old, diff.end_reparse_old),
            diff_len = diff.diff_len,
            "reparse region"
        );
        diff
    }

    /// Differing bytes in old-text coordinates
    pub fn changed_old(&self) -> (usize, usize) {
        (self.start_change_old, self.end_change_old)
    }

    /// Differing bytes in new-text coordinates
    pub fn changed_new(&self) -> (usize, usize) {
        (self.start_change_old, self.end_change_new)
    }

    /// Old range that must be matched again
    pub fn reparse_range_old(&self) -> (usize, usize) {
        (self.start_reparse_old, self.end_reparse_old)
    }

    pub fn diff_len(&self) -> isize {
        self.diff_len
    }

    pub fn is_unchanged(&self) -> bool {
        self.unchanged
    }

    pub fn same_again(&self) -> bool {
        self.same_again
    }

    /// New-text offset of old offset `old`, or `None` inside the change
    pub fn translate(&self, old: usize) -> Option<usize> {
        if self.unchanged || old <= self.start_reparse_old {
            Some(old)
        } else if old >= self.end_reparse_old {
            old.checked_add_signed(self.diff_len)
        } else {
            None
        }
    }

    /// Classify the old range `start..end`.
    ///
    /// A node ending right at the first changed token may have stopped
    /// because of what followed it, so it counts as changed.
    pub fn classify(&self, start: usize, end: usize) -> Region {
        if self.unchanged || end < self.start_reparse_old {
            Region::Before
        } else if start >= self.end_reparse_old {
            Region::After
        } else {
            Region::Changed
        }
    }
}

fn common_prefix(a: &str, b: &str) -> usize {
    let mut len = 0;
    for (x, y) in a.chars().zip(b.chars()) {
        if x != y {
            break;
        }
        len += x.len_utf8();
    }
    len
}

fn common_suffix(a: &str, b: &str) -> usize {
    let mut len = 0;
    for (x, y) in a.chars().rev().zip(b.chars().rev()) {
        if x != y {
            break;
        }
        len += x.len_utf8();
    }
    len
}

/// Parse `new_text`, reusing the unchanged parts of `old`.
pub fn reparse(
    grammar: &Grammar,
    old: &ParsedDocument,
    new_text: &str,
    options: ParseOptions,
) -> Result<ParsedDocument, ParseError> {
    let Some(root) = grammar.root() else {
        return Err(ParseError::new(ErrorCode::E0999, 0, 0).with_message("grammar has no root rule"));
    };
    if old.text() == new_text && !old.root().has_errors() {
        debug!(len = new_text.len(), "text unchanged, reusing tree");
        let stats = ParseStats {
            reused: 1,
            ..ParseStats::default()
        };
        return Ok(ParsedDocument::new(new_text.to_string(), old.root().clone(), stats));
    }

    let mut parser = Parser::new(grammar, new_text, options);
    parser.diff = Some(DiffContext::new(old.text(), new_text, old.root()));
    let result = parser.run(root, Some(old.root()));
    if let Some(diff) = &parser.diff {
        debug!(
            same_again = diff.same_again,
            reused = parser.stats().reused,
            reparsed = parser.stats().reparsed,
            "reparse finished"
        );
    }
    result
}
