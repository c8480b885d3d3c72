//! Parser driver
//!
//! Walks a [`Grammar`] top-down over the input with backtracking. Each
//! parselet kind lives with its grammar module; this module owns the
//! cross-cutting parts:
//!
//! - the input buffer and position
//! - generic modifiers (optional, lookahead, negated composites, accept)
//! - the memo table and error ranking
//! - error recovery state and node reuse during a reparse
//!
//! ```text
//! match_parselet(id)
//!   ├── memo hit?        → cached node (accept re-checked)
//!   ├── literal / sequence / choice
//!   ├── negate, accept, lookahead
//!   └── optional failure → None (+ continuation for the parent)
//! ```

mod errors;
mod input;
mod memo;

use std::io::Read;

use tracing::{debug, trace};

pub use errors::{ErrorCode, ErrorSet, ParseError, ParseErrorBuilder, ShortError, is_better_error};
pub use input::{InputBuffer, InputError};

use self::memo::{MemoEntry, MemoKey, MemoTable};
use crate::grammar::{
    Grammar, LiteralSet, OldNode, Parselet, ParseletId, ParseletKind, literal, parse_choice, parse_sequence,
};
use crate::reparse::{DiffContext, Region};
use crate::tree::{ParseElement, ParseNode, ParseNodeRef, ParsedDocument};
use crate::value::Value;

/// Result of matching one parselet: a node, nothing (optional or lookahead
/// match), or the failure.
pub type MatchResult = Result<Option<ParseNodeRef>, Box<ParseError>>;

/// Parser configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Report partial values with errors and recover from errors
    pub enable_partial_values: bool,
    /// Memoize every composite, not only `cacheable` ones
    pub memoize_all: bool,
    /// Most bytes a single recovery may skip
    pub max_recovery_skip: usize,
    /// Keep [`ParseStats`] on the resulting document
    pub record_stats: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            enable_partial_values: false,
            memoize_all: false,
            max_recovery_skip: 1024,
            record_stats: true,
        }
    }
}

impl ParseOptions {
    /// Defaults plus partial values and error recovery
    pub fn partial() -> Self {
        Self {
            enable_partial_values: true,
            ..Self::default()
        }
    }
}

/// Counters collected during a parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Parselet matches attempted
    pub matched: usize,
    /// Composites re-derived from an old node during a reparse
    pub reparsed: usize,
    /// Old nodes reused as is during a reparse
    pub reused: usize,
    pub cache_hits: usize,
    /// Errors skipped by recovery
    pub recoveries: usize,
}

/// An optional child's failure kept for its parent, in case the text after
/// it fails too and the failed child got further.
struct Continuation {
    parselet: ParseletId,
    start: usize,
    error: Box<ParseError>,
}

/// Top-down parser over one input.
pub struct Parser<'g> {
    grammar: &'g Grammar,
    input: InputBuffer,
    pos: usize,
    options: ParseOptions,
    memo: MemoTable,
    errors: ErrorSet,
    skipped: Vec<ParseError>,
    continuation: Option<Continuation>,
    /// (child, parselet that follows it) for the child about to be matched
    exit_hint: Option<(ParseletId, ParseletId)>,
    current_exit: Option<ParseletId>,
    recovering: bool,
    negated_depth: u32,
    stats: ParseStats,
    pub(crate) diff: Option<DiffContext>,
}

impl<'g> Parser<'g> {
    pub fn new(grammar: &'g Grammar, text: &str, options: ParseOptions) -> Self {
        Self::with_input(grammar, InputBuffer::from_text(text), options)
    }

    /// Parse input pulled from `reader` as needed
    pub fn from_reader(grammar: &'g Grammar, reader: impl Read + 'static, options: ParseOptions) -> Self {
        Self::with_input(grammar, InputBuffer::from_reader(reader), options)
    }

    fn with_input(grammar: &'g Grammar, input: InputBuffer, options: ParseOptions) -> Self {
        Self {
            grammar,
            input,
            pos: 0,
            options,
            memo: MemoTable::default(),
            errors: ErrorSet::new(),
            skipped: Vec::new(),
            continuation: None,
            exit_hint: None,
            current_exit: None,
            recovering: false,
            negated_depth: 0,
            stats: ParseStats::default(),
            diff: None,
        }
    }

    /// Parse the whole input with the grammar's root rule
    pub fn parse(mut self) -> Result<ParsedDocument, ParseError> {
        self.run_root()
    }

    /// Parse the whole input with `id`
    pub fn parse_parselet(mut self, id: ParseletId) -> Result<ParsedDocument, ParseError> {
        self.run(id, None)
    }

    pub(crate) fn run_root(&mut self) -> Result<ParsedDocument, ParseError> {
        let Some(root) = self.grammar.root() else {
            return Err(ParseError::new(ErrorCode::E0999, 0, 0).with_message("grammar has no root rule"));
        };
        self.run(root, None)
    }

    /// Match `id` against the whole input, reusing `old` (the previous root)
    /// when reparsing.
    pub(crate) fn run(&mut self, id: ParseletId, old: Option<&ParseNodeRef>) -> Result<ParsedDocument, ParseError> {
        self.recovering = self.options.enable_partial_values;
        let result = match old {
            Some(old) => self.reparse_parselet(id, old, 0),
            None => self.match_parselet(id),
        };
        self.complete(id, result)
    }

    fn complete(&mut self, id: ParseletId, result: MatchResult) -> Result<ParsedDocument, ParseError> {
        let partial = self.options.enable_partial_values;
        let node = match result {
            Ok(node) => node.unwrap_or_else(|| ParseNode::parent(id, Vec::new(), Value::Null)),
            Err(err) => {
                let err = *err;
                let mut reported = self.errors.to_error().unwrap_or_else(|| err.clone());
                if partial {
                    reported.partial = err.partial;
                }
                debug!(error = %ShortError(&reported), matched = self.stats.matched, "parse failed");
                return Err(reported);
            }
        };

        if !self.input.at_end(self.pos) {
            let end = self.input.load_all().len();
            let grammar = self.grammar;
            let trailing = self.fail(
                grammar.parselet(id),
                ErrorCode::E0301,
                self.pos,
                end,
                "unexpected input after the end of the document",
            );
            let mut reported = self.errors.to_error().unwrap_or(*trailing);
            if partial {
                reported.partial = Some(node);
            }
            debug!(error = %ShortError(&reported), "trailing input");
            return Err(reported);
        }

        if partial && !self.skipped.is_empty() {
            let skipped = std::mem::take(&mut self.skipped);
            let mut reported = match skipped.as_slice() {
                [single] => single.clone(),
                _ => ParseError::multiple(skipped),
            };
            reported.partial = Some(node);
            debug!(errors = reported.flatten().len(), "parse recovered from errors");
            return Err(reported);
        }

        debug!(
            matched = self.stats.matched,
            reparsed = self.stats.reparsed,
            reused = self.stats.reused,
            cache_hits = self.stats.cache_hits,
            memo = self.memo.len(),
            "parse complete"
        );
        let stats = if self.options.record_stats {
            self.stats
        } else {
            ParseStats::default()
        };
        let text = self.input.load_all().to_string();
        Ok(ParsedDocument::new(text, node, stats))
    }

    pub fn current_position(&self) -> usize {
        self.pos
    }

    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Read failure of reader input, if any
    pub fn take_input_error(&mut self) -> Option<InputError> {
        self.input.take_error()
    }

    pub(crate) fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub(crate) fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub(crate) fn partial_mode(&self) -> bool {
        self.options.enable_partial_values
    }

    /// Whether a failure here may be repaired by skipping text
    pub(crate) fn can_recover(&self) -> bool {
        self.options.enable_partial_values && self.recovering && self.negated_depth == 0
    }

    /// Set the recovery flag, returning the previous value
    pub(crate) fn set_recovering(&mut self, recovering: bool) -> bool {
        std::mem::replace(&mut self.recovering, recovering)
    }

    // ---- input -----------------------------------------------------------

    /// Length of the literal of `set` matching at `at`
    pub(crate) fn match_literals(&mut self, set: &LiteralSet, at: usize) -> Option<usize> {
        self.input.ensure(at + set.lookahead_len());
        let rest = self.input.text().get(at..).unwrap_or("");
        set.match_at(rest)
    }

    /// Byte length of the char at `at`; `None` at end of input
    pub(crate) fn char_len_at(&mut self, at: usize) -> Option<usize> {
        self.input.ensure(at + 4);
        self.input.text().get(at..)?.chars().next().map(char::len_utf8)
    }

    pub(crate) fn at_end(&mut self, at: usize) -> bool {
        self.input.at_end(at)
    }

    pub(crate) fn slice(&self, start: usize, end: usize) -> &str {
        self.input.text().get(start..end).unwrap_or("")
    }

    // ---- matching --------------------------------------------------------

    pub(crate) fn match_parselet(&mut self, id: ParseletId) -> MatchResult {
        self.dispatch(id, None)
    }

    /// Match `id` where a reparse hint is available for the child
    pub(crate) fn match_child(&mut self, id: ParseletId, hint: Option<(usize, &ParseElement)>) -> MatchResult {
        match hint {
            Some((start, ParseElement::Node(node))) if self.diff.is_some() => self.reparse_parselet(id, node, start),
            _ => self.match_parselet(id),
        }
    }

    /// Match `id` given the node it produced at `old_start` in the old text:
    /// reuse it whole, descend into it, or match from scratch.
    pub(crate) fn reparse_parselet(&mut self, id: ParseletId, old: &ParseNodeRef, old_start: usize) -> MatchResult {
        let grammar = self.grammar;
        let parselet = grammar.parselet(id);
        if parselet.modifiers.lookahead || parselet.modifiers.negated {
            return self.match_parselet(id);
        }
        if let Some(node) = self.try_reuse(&parselet.produces, old, old_start) {
            return Ok(Some(node));
        }
        let descend = !parselet.is_literal()
            && !old.is_leaf()
            && !old.is_formatted()
            && parselet.can_produce(old.parselet())
            && self.translate_old(old_start) == Some(self.pos);
        if !descend {
            return self.match_parselet(id);
        }
        self.stats.reparsed += 1;
        self.dispatch(
            id,
            Some(OldNode {
                node: old,
                start: old_start,
            }),
        )
    }

    fn dispatch(&mut self, id: ParseletId, old: Option<OldNode<'_>>) -> MatchResult {
        let grammar = self.grammar;
        let parselet = grammar.parselet(id);
        let start = self.pos;
        let exit = self.exit_hint.take().filter(|(child, _)| *child == id).map(|(_, exit)| exit);

        let key = self.memo_key(parselet, start);
        if let Some(key) = key {
            if let Some(hit) = self.memo_lookup(parselet, key) {
                return hit;
            }
        }
        self.stats.matched += 1;

        let negate = parselet.modifiers.negated && !parselet.is_literal();
        if negate {
            self.negated_depth += 1;
        }
        let result = match &parselet.kind {
            ParseletKind::Literal(set) => literal::parse(self, parselet, set),
            ParseletKind::Sequence(seq) => parse_sequence(self, parselet, seq, old),
            ParseletKind::Choice(choice) => {
                self.current_exit = exit;
                parse_choice(self, parselet, choice, old)
            }
        };
        let result = if negate {
            self.negated_depth -= 1;
            self.negate(parselet, start, result)
        } else {
            result
        };
        let result = self.finish_match(parselet, start, result);

        if let Some(key) = key {
            self.memo.insert(
                key,
                MemoEntry {
                    result: result.clone(),
                    end: self.pos,
                },
            );
        }
        result
    }

    fn memo_key(&self, parselet: &Parselet, pos: usize) -> Option<MemoKey> {
        let memoize = parselet.modifiers.cacheable || (self.options.memoize_all && !parselet.is_literal());
        memoize.then_some(MemoKey {
            pos,
            parselet: parselet.id,
            recovering: self.can_recover(),
        })
    }

    fn memo_lookup(&mut self, parselet: &Parselet, key: MemoKey) -> Option<MatchResult> {
        let entry = self.memo.get(&key)?.clone();
        if let Ok(Some(node)) = &entry.result {
            if let Some(accept) = &parselet.options.accept {
                if accept(node.value(), self.slice(key.pos, entry.end)).is_err() {
                    self.memo.remove(&key);
                    return None;
                }
            }
            node.value().bind_parse_node(node);
        }
        self.stats.cache_hits += 1;
        self.pos = entry.end;
        trace!(rule = %parselet.name, pos = key.pos, "memo hit");
        Some(entry.result)
    }

    /// Negated composites succeed, without consuming, exactly when they fail
    fn negate(&mut self, parselet: &Parselet, start: usize, result: MatchResult) -> MatchResult {
        self.pos = start;
        match result {
            Ok(_) => {
                let end = start + self.char_len_at(start).unwrap_or(0);
                Err(self.fail(
                    parselet,
                    ErrorCode::E0103,
                    start,
                    end,
                    format!("unexpected {}", parselet.display_name()),
                ))
            }
            Err(_) => Ok(None),
        }
    }

    fn finish_match(&mut self, parselet: &Parselet, start: usize, result: MatchResult) -> MatchResult {
        match result {
            Ok(Some(node)) => {
                if let Some(accept) = &parselet.options.accept {
                    if let Err(reason) = accept(node.value(), self.slice(start, self.pos)) {
                        let end = self.pos;
                        self.pos = start;
                        let err = self.fail(parselet, ErrorCode::E0104, start, end, reason);
                        return self.fail_optional(parselet, start, err);
                    }
                }
                if parselet.modifiers.lookahead {
                    self.pos = start;
                    return Ok(None);
                }
                Ok(Some(node))
            }
            Ok(None) => {
                if parselet.modifiers.lookahead {
                    self.pos = start;
                }
                Ok(None)
            }
            Err(err) => {
                self.pos = start;
                self.fail_optional(parselet, start, err)
            }
        }
    }

    fn fail_optional(&mut self, parselet: &Parselet, start: usize, err: Box<ParseError>) -> MatchResult {
        if !parselet.modifiers.optional {
            return Err(err);
        }
        if self.options.enable_partial_values && err.partial_len() > 0 {
            self.set_continuation(parselet.id, start, err);
        }
        Ok(None)
    }

    // ---- errors ----------------------------------------------------------

    /// Create an error and offer it for reporting
    pub(crate) fn fail(
        &mut self,
        parselet: &Parselet,
        code: ErrorCode,
        start: usize,
        end: usize,
        message: impl Into<String>,
    ) -> Box<ParseError> {
        let eof = self.input.at_end(start);
        let err = ParseError::builder(code)
            .message(message)
            .range(start, end)
            .parselet(parselet.id)
            .eof(eof)
            .build();
        if parselet.modifiers.report_error {
            self.offer_error(&err);
        }
        Box::new(err)
    }

    pub(crate) fn offer_error(&mut self, err: &ParseError) {
        if self.negated_depth == 0 {
            self.errors.offer(err);
        }
    }

    /// Keep an error repaired by recovery
    pub(crate) fn record_skipped(&mut self, err: ParseError) {
        self.stats.recoveries += 1;
        self.offer_error(&err);
        self.skipped.push(err);
    }

    pub(crate) fn set_continuation(&mut self, parselet: ParseletId, start: usize, error: Box<ParseError>) {
        self.continuation = Some(Continuation { parselet, start, error });
    }

    /// Continuation left by `parselet` matched at `start`; any other pending
    /// continuation is dropped.
    pub(crate) fn take_continuation(&mut self, parselet: ParseletId, start: usize) -> Option<Box<ParseError>> {
        match self.continuation.take() {
            Some(c) if c.parselet == parselet && c.start == start => Some(c.error),
            _ => None,
        }
    }

    // ---- recovery --------------------------------------------------------

    /// Run `f` with `exit` recorded as the parselet following `child`
    pub(crate) fn with_exit_hint<R>(
        &mut self,
        child: ParseletId,
        exit: Option<ParseletId>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let saved = std::mem::replace(&mut self.exit_hint, exit.map(|e| (child, e)));
        let result = f(self);
        self.exit_hint = saved;
        result
    }

    /// Exit parselet of a repeated choice: its own, or the one following it
    /// in the enclosing sequence
    pub(crate) fn take_exit(&mut self, parselet: &Parselet) -> Option<ParseletId> {
        let dynamic = self.current_exit.take();
        parselet.options.exit.or(dynamic)
    }

    /// End offset if `id` matches at `at`. Nothing is consumed or reported.
    pub(crate) fn probe(&mut self, id: ParseletId, at: usize) -> Option<usize> {
        let saved_pos = self.pos;
        let saved_recovering = self.set_recovering(false);
        let saved_continuation = self.continuation.take();
        self.pos = at;
        self.negated_depth += 1;
        let result = self.match_parselet(id);
        let end = self.pos;
        self.negated_depth -= 1;
        self.pos = saved_pos;
        self.recovering = saved_recovering;
        self.continuation = saved_continuation;
        result.ok().map(|_| end)
    }

    /// First offset in `from..=from + limit` where `id` matches, with the
    /// end of that match. Offsets other than the current position must
    /// start a token.
    pub(crate) fn scan_for(&mut self, id: ParseletId, from: usize, limit: usize) -> Option<(usize, usize)> {
        let mut at = from;
        loop {
            if at == self.pos || self.is_token_start(at) {
                if let Some(end) = self.probe(id, at) {
                    return Some((at, end));
                }
            }
            if at - from >= limit {
                return None;
            }
            at += self.char_len_at(at)?;
        }
    }

    /// False inside a run of word chars: `rint` in `print` is no restart point
    pub(crate) fn is_token_start(&mut self, at: usize) -> bool {
        let is_word = |c: char| c.is_alphanumeric() || c == '_';
        self.input.ensure(at + 4);
        let text = self.input.text();
        let Some(current) = text.get(at..).and_then(|rest| rest.chars().next()) else {
            return true;
        };
        let previous = text.get(..at).and_then(|before| before.chars().next_back());
        !(previous.is_some_and(is_word) && is_word(current))
    }

    // ---- reuse -----------------------------------------------------------

    /// Position in the new text of an old offset; `None` inside the change
    pub(crate) fn translate_old(&self, old: usize) -> Option<usize> {
        match &self.diff {
            Some(diff) => diff.translate(old),
            None => Some(old),
        }
    }

    /// Next old entry (by start offset) that lines up with the current
    /// position; entries left behind are skipped.
    pub(crate) fn find_old<'a, T>(&self, old: &'a [(usize, T)], cursor: &mut usize) -> Option<&'a (usize, T)> {
        self.diff.as_ref()?;
        while let Some(entry) = old.get(*cursor) {
            match self.translate_old(entry.0) {
                Some(start) if start == self.pos => {
                    *cursor += 1;
                    return Some(entry);
                }
                Some(start) if start > self.pos => return None,
                _ => *cursor += 1,
            }
        }
        None
    }

    /// Reuse `old` unchanged if it lies outside the change, starts at the
    /// current position and came from one of `expected`.
    pub(crate) fn try_reuse(
        &mut self,
        expected: &[ParseletId],
        old: &ParseNodeRef,
        old_start: usize,
    ) -> Option<ParseNodeRef> {
        let diff = self.diff.as_mut()?;
        if old.has_errors() || old.is_formatted() || !expected.contains(&old.parselet()) {
            return None;
        }
        let region = diff.classify(old_start, old_start + old.len());
        let new_start = match region {
            Region::Before => old_start,
            Region::After => diff.translate(old_start)?,
            Region::Changed => return None,
        };
        if new_start != self.pos {
            if region == Region::After {
                diff.same_again = false;
            }
            return None;
        }
        if region == Region::After {
            diff.same_again = true;
        }
        self.pos += old.len();
        self.stats.reused += 1;
        trace!(
            parselet = old.parselet().index(),
            start = new_start,
            len = old.len(),
            "reused node"
        );
        Some(old.clone())
    }
}
