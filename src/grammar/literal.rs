//! Literal-set parselets: match one of a fixed set of strings.
//!
//! Literals are indexed by their first `key_size` chars, where `key_size` is
//! the length of the shortest literal. Each prefix bucket is sorted
//! longest-first so the longest applicable literal wins. Two sentinels are
//! supported: the empty string (matches only at end of input) and a
//! wildcard that matches any single char.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::Parselet;
use crate::parser::{ErrorCode, MatchResult, Parser};
use crate::tree::ParseNode;
use crate::value::Value;

/// A set of literal strings with optional exclusions.
#[derive(Debug, Clone, Default)]
pub struct LiteralSet {
    literals: Vec<SmolStr>,
    key_size: usize,
    index: FxHashMap<SmolStr, Vec<usize>>,
    /// literal index -> suffixes that must not follow it
    exclusions: FxHashMap<usize, Vec<SmolStr>>,
    /// excluded strings that do not extend any literal
    unresolved: Vec<SmolStr>,
    eof: bool,
    any: bool,
    max_len: usize,
}

impl LiteralSet {
    /// Build a set from literals; `""` stands for end of input.
    pub fn new<I, S>(literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        let mut set = LiteralSet {
            literals: literals.into_iter().map(Into::into).collect(),
            ..LiteralSet::default()
        };
        set.reindex();
        set
    }

    pub fn single(text: impl Into<SmolStr>) -> Self {
        Self::new([text.into()])
    }

    /// Every char in `from..=to`
    pub fn char_range(from: char, to: char) -> Self {
        Self::new((from..=to).map(|c| SmolStr::new(c.encode_utf8(&mut [0; 4]))))
    }

    /// Matches any single char
    pub fn any_char() -> Self {
        Self::new(std::iter::empty::<SmolStr>()).with_any()
    }

    /// Matches only at end of input
    pub fn end_of_input() -> Self {
        Self::new([""])
    }

    /// Also match any single char when no literal applies
    pub fn with_any(mut self) -> Self {
        self.any = true;
        self.reindex();
        self
    }

    /// Reject a literal when it is the prefix of one of `excluded`.
    ///
    /// For `{"%"}` excluding `"%>"`, input `"%>"` does not match `"%"`.
    pub fn excluding<I, S>(mut self, excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        for text in excluded {
            let text: SmolStr = text.into();
            let extended = self
                .literals
                .iter()
                .enumerate()
                .filter(|(_, lit)| !lit.is_empty() && text.len() > lit.len() && text.starts_with(lit.as_str()))
                .max_by_key(|(_, lit)| lit.len())
                .map(|(ix, lit)| (ix, lit.len()));
            match extended {
                Some((ix, len)) => self
                    .exclusions
                    .entry(ix)
                    .or_default()
                    .push(SmolStr::new(&text[len..])),
                None => self.unresolved.push(text),
            }
        }
        self.max_len = self.compute_max_len();
        self
    }

    fn reindex(&mut self) {
        self.eof = self.literals.iter().any(|l| l.is_empty());
        let shortest = self
            .literals
            .iter()
            .filter(|l| !l.is_empty())
            .map(|l| l.chars().count())
            .min();
        self.key_size = match shortest {
            _ if self.eof || self.any => 1,
            Some(n) => n,
            None => 1,
        };
        self.index.clear();
        for (ix, lit) in self.literals.iter().enumerate() {
            if lit.is_empty() {
                continue;
            }
            let key = prefix_key(lit, self.key_size);
            self.index.entry(SmolStr::new(key)).or_default().push(ix);
        }
        for bucket in self.index.values_mut() {
            // stable: equal lengths keep declaration order
            bucket.sort_by_key(|&ix| std::cmp::Reverse(self.literals[ix].len()));
        }
        self.max_len = self.compute_max_len();
    }

    fn compute_max_len(&self) -> usize {
        let longest = self.literals.iter().map(|l| l.len()).max().unwrap_or(0);
        let suffix = self
            .exclusions
            .values()
            .flatten()
            .map(|s| s.len())
            .max()
            .unwrap_or(0);
        (longest + suffix).max(4)
    }

    pub fn literals(&self) -> &[SmolStr] {
        &self.literals
    }

    /// Length in chars of the prefix used to index literals
    pub fn key_size(&self) -> usize {
        self.key_size
    }

    /// Bytes of input needed to decide a match
    pub fn lookahead_len(&self) -> usize {
        self.max_len
    }

    pub fn matches_end_of_input(&self) -> bool {
        self.eof
    }

    pub fn matches_any(&self) -> bool {
        self.any
    }

    pub fn unresolved_exclusions(&self) -> &[SmolStr] {
        &self.unresolved
    }

    /// Literal emitted when generating without a value
    pub fn default_literal(&self) -> Option<&str> {
        self.literals
            .iter()
            .find(|l| !l.is_empty())
            .map(|l| l.as_str())
    }

    /// Length of the literal matching at the start of `rest`, if any.
    ///
    /// `rest` must hold all remaining input or at least
    /// [`lookahead_len`](Self::lookahead_len) bytes of it.
    pub fn match_at(&self, rest: &str) -> Option<usize> {
        if rest.is_empty() {
            return self.eof.then_some(0);
        }
        let key = prefix_key(rest, self.key_size);
        if key.chars().count() == self.key_size {
            if let Some(bucket) = self.index.get(key) {
                for &ix in bucket {
                    let lit = &self.literals[ix];
                    if rest.starts_with(lit.as_str()) && !self.is_excluded(ix, &rest[lit.len()..]) {
                        return Some(lit.len());
                    }
                }
            }
        }
        if self.any {
            return rest.chars().next().map(char::len_utf8);
        }
        None
    }

    fn is_excluded(&self, ix: usize, after: &str) -> bool {
        self.exclusions
            .get(&ix)
            .is_some_and(|suffixes| suffixes.iter().any(|s| after.starts_with(s.as_str())))
    }

    /// True if `text` is exactly one literal, or (when `repeat`) a
    /// concatenation of literals
    pub fn accepts(&self, text: &str, repeat: bool) -> bool {
        let mut rest = text;
        loop {
            match self.match_at(rest) {
                Some(0) => return rest.is_empty(),
                Some(len) => {
                    rest = &rest[len..];
                    if rest.is_empty() {
                        return true;
                    }
                    if !repeat {
                        return false;
                    }
                }
                None => return false,
            }
        }
    }

    /// Human readable list for error messages
    pub fn describe(&self) -> String {
        let mut parts: Vec<String> = self
            .literals
            .iter()
            .take(6)
            .map(|l| {
                if l.is_empty() {
                    "end of input".to_string()
                } else {
                    format!("'{}'", l.escape_debug())
                }
            })
            .collect();
        if self.literals.len() > 6 {
            parts.push("...".to_string());
        }
        if self.any {
            parts.push("any character".to_string());
        }
        parts.join(", ")
    }
}

fn prefix_key(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Match a literal-set parselet at the current position.
///
/// A negated set consumes one char wherever none of its literals match; with
/// `repeat` it consumes up to the next literal, e.g. a comment body up to `*/`.
pub(crate) fn parse<'g>(parser: &mut Parser<'g>, parselet: &'g Parselet, set: &'g LiteralSet) -> MatchResult {
    let start = parser.pos();
    let negated = parselet.modifiers.negated;
    let mut end = start;
    let mut matched = false;
    loop {
        let step = if negated {
            match parser.match_literals(set, end) {
                Some(_) => None,
                None => parser.char_len_at(end),
            }
        } else {
            parser.match_literals(set, end)
        };
        match step {
            Some(len) => {
                end += len;
                matched = true;
                if !parselet.modifiers.repeat || len == 0 {
                    break;
                }
            }
            None => break,
        }
    }

    if !matched {
        let fail_end = start + parser.char_len_at(start).unwrap_or(0);
        let (code, message) = if negated {
            (ErrorCode::E0103, format!("unexpected {}", set.describe()))
        } else {
            (ErrorCode::E0101, format!("expected {}", set.describe()))
        };
        return Err(parser.fail(parselet, code, start, fail_end, message));
    }

    parser.set_pos(end);
    let text = parser.slice(start, end);
    let value = Value::str(text);
    Ok(Some(ParseNode::leaf(parselet.id, text, value)))
}
