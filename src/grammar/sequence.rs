//! Sequence parselets: every child in order.
//!
//! With partial values enabled a failed sequence still reports what it
//! matched: the error carries a partial node whose unmatched slots are null.
//! Inside a recovering parse a sequence that has already consumed input
//! tries to resynchronize by skipping text instead of failing.

use std::cmp::Ordering;

use smol_str::SmolStr;
use tracing::trace;

use super::slots::{SlotKind, ValueBuilder};
use super::{Composite, Parselet};
use crate::parser::{ErrorCode, MatchResult, ParseError, Parser, is_better_error};
use crate::tree::{ParseElement, ParseNode, ParseNodeRef};
use crate::value::Value;

/// A node from the previous parse, with its start offset in the old text
#[derive(Clone, Copy)]
pub(crate) struct OldNode<'a> {
    pub node: &'a ParseNodeRef,
    pub start: usize,
}

impl<'a> OldNode<'a> {
    /// Child elements paired with their old start offsets
    pub fn elements(&self) -> Vec<(usize, &'a ParseElement)> {
        let mut offset = self.start;
        self.node
            .children()
            .iter()
            .map(|element| {
                let start = offset;
                offset += element.len();
                (start, element)
            })
            .collect()
    }
}

type OldChild<'a> = (usize, &'a ParseElement);

#[derive(Default)]
struct ChildValue {
    value: Value,
    text: SmolStr,
}

/// Children matched so far by one pass over a sequence
struct SequenceState {
    elements: Vec<ParseElement>,
    values: Vec<ChildValue>,
    /// Highest child index that consumed input
    last_content: Option<usize>,
}

impl SequenceState {
    fn new(children: usize) -> Self {
        Self {
            elements: Vec::with_capacity(children),
            values: Vec::with_capacity(children),
            last_content: None,
        }
    }

    fn push(&mut self, child: &Parselet, slot: &SlotKind, index: usize, node: Option<ParseNodeRef>) {
        let Some(node) = node else {
            self.push_empty();
            return;
        };
        if !node.is_empty() {
            self.last_content = Some(index);
        }
        let modifiers = child.modifiers;
        let text = if matches!(slot, SlotKind::Str) && !modifiers.discard {
            SmolStr::from(node.text())
        } else {
            SmolStr::default()
        };
        let value = if modifiers.discard { Value::Null } else { node.value().clone() };
        self.values.push(ChildValue { value, text });

        push_element(child, node, &mut self.elements);
    }

    fn push_empty(&mut self) {
        self.elements.push(ParseElement::Empty);
        self.values.push(ChildValue::default());
    }

    fn committed(&self) -> bool {
        self.last_content.is_some()
    }

    fn len(&self) -> usize {
        self.elements.iter().map(ParseElement::len).sum()
    }

    fn into_parts(self, parselet: &Parselet, seq: &Composite) -> (Vec<ParseElement>, Value) {
        let value = assemble(parselet, seq, self.values);
        (self.elements, value)
    }

    fn into_node(self, parselet: &Parselet, seq: &Composite) -> ParseNodeRef {
        let (elements, value) = self.into_parts(parselet, seq);
        ParseNode::parent(parselet.id, elements, value)
    }
}

/// Add a matched child to a parent's elements: as a node, as raw text
/// (discarded or skipped literals) or spliced in (skipped composites).
pub(crate) fn push_element(child: &Parselet, node: ParseNodeRef, elements: &mut Vec<ParseElement>) {
    let modifiers = child.modifiers;
    if modifiers.discard || (modifiers.skip && child.is_literal()) {
        elements.push(ParseElement::Text(SmolStr::from(node.text())));
    } else if modifiers.skip {
        elements.extend(node.children().iter().cloned());
    } else {
        elements.push(ParseElement::Node(node));
    }
}

fn assemble(parselet: &Parselet, seq: &Composite, values: Vec<ChildValue>) -> Value {
    if let Some(slot) = &parselet.options.chain_slot {
        return chain(values, slot);
    }
    let mut builder = ValueBuilder::new(parselet.shape, parselet.declared.as_ref());
    for (ix, child) in values.into_iter().enumerate() {
        builder.add(seq.slots.slot(ix), child.value, &child.text);
    }
    builder.finish()
}

/// Left-fold `head tail*` so each tail object holds the previous result.
///
/// `a.b.c` with `chain_slot = "target"` yields `c { target: b { target: a } }`.
fn chain(values: Vec<ChildValue>, slot: &str) -> Value {
    let mut values = values.into_iter();
    let mut acc = values.next().map(|c| c.value).unwrap_or_default();
    let tail = values.next().map(|c| c.value).unwrap_or_default();
    let items = match tail {
        Value::List(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    };
    for item in items {
        if let Value::Object(obj) = &item {
            obj.set(slot, acc);
            acc = item;
        }
    }
    acc
}

/// Match a sequence, reusing `old` where the reparse allows it.
pub(crate) fn parse<'g>(
    parser: &mut Parser<'g>,
    parselet: &'g Parselet,
    seq: &'g Composite,
    old: Option<OldNode<'_>>,
) -> MatchResult {
    if parselet.modifiers.repeat {
        return parse_repeat(parser, parselet, seq, old);
    }
    let hints = old
        .filter(|o| !seq.splices && !o.node.is_error() && o.node.children().len() == seq.children.len())
        .map(|o| o.elements());
    let state = match_children(parser, parselet, seq, hints.as_deref())?;
    Ok(Some(state.into_node(parselet, seq)))
}

fn parse_repeat<'g>(
    parser: &mut Parser<'g>,
    parselet: &'g Parselet,
    seq: &'g Composite,
    old: Option<OldNode<'_>>,
) -> MatchResult {
    let start = parser.pos();
    let width = seq.children.len().max(1);
    let old_iterations: Vec<(usize, Vec<OldChild<'_>>)> = old
        .filter(|o| !seq.splices && !o.node.is_error() && o.node.children().len() % width == 0)
        .map(|o| {
            o.elements()
                .chunks(width)
                .map(|chunk| (chunk[0].0, chunk.to_vec()))
                .collect()
        })
        .unwrap_or_default();
    let mut cursor = 0;

    let mut elements = Vec::new();
    let mut values = Vec::new();
    let mut last_error = None;
    loop {
        let iteration_start = parser.pos();
        let hints = parser
            .find_old(&old_iterations, &mut cursor)
            .map(|(_, children)| children.as_slice());
        match match_children(parser, parselet, seq, hints) {
            Ok(state) if parser.pos() > iteration_start => {
                let (iteration, value) = state.into_parts(parselet, seq);
                elements.extend(iteration);
                values.push(value);
            }
            Ok(_) => {
                parser.set_pos(iteration_start);
                break;
            }
            Err(err) => {
                parser.set_pos(iteration_start);
                last_error = Some(err);
                break;
            }
        }
    }

    if values.is_empty() {
        return Err(match last_error {
            Some(err) => err,
            None => parser.fail(
                parselet,
                ErrorCode::E0203,
                start,
                start,
                format!("expected at least one {}", parselet.display_name()),
            ),
        });
    }

    let partial_iteration = last_error.filter(|e| parser.partial_mode() && e.partial.is_some());
    let Some(mut err) = partial_iteration else {
        return Ok(Some(ParseNode::parent(parselet.id, elements, collect_iterations(parselet, values))));
    };
    // the loop stopped on a half-matched iteration; offer it to the parent
    let node = ParseNode::parent(parselet.id, elements.clone(), collect_iterations(parselet, values.clone()));
    if let Some(partial) = err.partial.take() {
        elements.extend(partial.children().iter().cloned());
        values.push(partial.value().clone());
        err.partial = Some(ParseNode::parent(parselet.id, elements, collect_iterations(parselet, values)));
    }
    parser.set_continuation(parselet.id, start, err);
    Ok(Some(node))
}

/// Value of a repeated sequence from its per-iteration values
fn collect_iterations(parselet: &Parselet, values: Vec<Value>) -> Value {
    match parselet.shape {
        super::ValueShape::String => {
            let mut text = String::new();
            for value in &values {
                if let Value::Str(s) = value {
                    text.push_str(s);
                }
            }
            Value::Str(SmolStr::from(text))
        }
        super::ValueShape::List => Value::List(
            values
                .into_iter()
                .flat_map(|v| match v {
                    Value::List(items) => items,
                    Value::Null => Vec::new(),
                    other => vec![other],
                })
                .collect(),
        ),
        _ => Value::List(values.into_iter().filter(|v| !v.is_null()).collect()),
    }
}

/// One pass over the children.
fn match_children<'g>(
    parser: &mut Parser<'g>,
    parselet: &'g Parselet,
    seq: &'g Composite,
    hints: Option<&[OldChild<'_>]>,
) -> Result<SequenceState, Box<ParseError>> {
    let grammar = parser.grammar();
    let start = parser.pos();
    let count = seq.children.len();
    let mut state = SequenceState::new(count);
    let mut continuation: Option<(usize, Box<ParseError>)> = None;

    let mut ix = 0;
    while ix < count {
        let child_id = seq.children[ix];
        let child = grammar.parselet(child_id);
        let slot = seq.slots.slot(ix);
        let child_start = parser.pos();
        let hint = hints.and_then(|h| h.get(ix)).copied();
        let exit = seq.children.get(ix + 1).copied();

        match parser.with_exit_hint(child_id, exit, |p| p.match_child(child_id, hint)) {
            Ok(node) => {
                continuation = parser.take_continuation(child_id, child_start).map(|e| (ix, e));
                state.push(child, slot, ix, node);
                ix += 1;
            }
            Err(err) => {
                if parser.partial_mode() && parselet.options.skip_on_error_slot.is_some_and(|from| ix >= from) {
                    trace!(rule = %parselet.name, child = ix, "skipping failed child");
                    let partial = err.partial.clone();
                    parser.record_skipped(*err);
                    state.push(child, slot, ix, partial);
                    ix += 1;
                    continue;
                }
                // an optional sequence that fails just matches nothing
                if parser.can_recover() && state.committed() && !parselet.modifiers.optional {
                    if let Some(next) = recover(parser, parselet, seq, &mut state, ix, child_start, &err) {
                        ix = next;
                        continue;
                    }
                }
                parser.set_pos(start);
                return Err(partial_failure(parser, parselet, seq, state, ix, err, continuation));
            }
        }
    }

    let needs_content = parselet.options.min_content_slot.or_else(|| {
        (seq.all_optional && !parselet.options.accept_no_content).then_some(0)
    });
    if let Some(from) = needs_content {
        if !state.last_content.is_some_and(|last| last >= from) {
            let end = parser.pos();
            parser.set_pos(start);
            return Err(parser.fail(
                parselet,
                ErrorCode::E0204,
                start,
                end,
                format!("{} matched no content", parselet.display_name()),
            ));
        }
    }
    Ok(state)
}

/// Build the error returned for a failure at child `ix`, with a partial node
/// when partial values are enabled.
fn partial_failure(
    parser: &mut Parser<'_>,
    parselet: &Parselet,
    seq: &Composite,
    mut state: SequenceState,
    ix: usize,
    mut err: Box<ParseError>,
    continuation: Option<(usize, Box<ParseError>)>,
) -> Box<ParseError> {
    if !parser.partial_mode() {
        return err;
    }
    let grammar = parser.grammar();
    let mut failed_partial = err.partial.take();

    // an optional child right before the failure may have gotten further
    if let Some((prev, cont)) = continuation {
        if prev + 1 == ix && !seq.splices && is_better_error(err.start(), err.end(), cont.start(), cont.end()) {
            let mut cont = cont;
            let cont_partial = cont.partial.take();
            state.elements.pop();
            state.values.pop();
            let prev_child = grammar.parselet(seq.children[prev]);
            state.push(prev_child, seq.slots.slot(prev), prev, cont_partial);
            cont.optional_continuation = true;
            err = cont;
            // both partials would start at the same offset
            failed_partial = None;
        }
    }

    let child = grammar.parselet(seq.children[ix]);
    state.push(child, seq.slots.slot(ix), ix, failed_partial);
    for _ in ix + 1..seq.children.len() {
        state.push_empty();
    }
    if state.len() > 0 {
        let node = state.into_node(parselet, seq);
        err.partial = Some(node);
        parser.offer_error(&err);
    }
    err
}

/// Resynchronize after child `ix` failed. Returns the child index to
/// continue from.
///
/// Two repairs are tried: the previous child absorbs text until child `ix`
/// matches, or child `ix` is replaced by skipped text until child `ix + 1`
/// matches.
fn recover(
    parser: &mut Parser<'_>,
    parselet: &Parselet,
    seq: &Composite,
    state: &mut SequenceState,
    ix: usize,
    child_start: usize,
    err: &ParseError,
) -> Option<usize> {
    let grammar = parser.grammar();
    let limit = parser.options().max_recovery_skip;
    let child_id = seq.children[ix];

    let extend_previous = if ix > 0 && !seq.splices && matches!(state.elements.last(), Some(ParseElement::Node(_))) {
        parser
            .char_len_at(child_start)
            .and_then(|len| parser.scan_for(child_id, child_start + len, limit))
    } else {
        None
    };
    let skip_child = match seq.children.get(ix + 1) {
        Some(&next) if !grammar.parselet(next).modifiers.matches_nothing() => {
            parser.scan_for(next, child_start + err.partial_len(), limit)
        }
        _ => None,
    };

    // the repair skipping less text wins; at equal skips the further match
    let use_previous = match (extend_previous, skip_child) {
        (Some((resume_a, end_a)), Some((resume_b, end_b))) => match resume_a.cmp(&resume_b) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => end_a >= end_b,
        },
        (Some(_), None) => true,
        (None, Some(_)) => false,
        (None, None) => return None,
    };

    if use_previous {
        let (resume, _) = extend_previous?;
        let Some(ParseElement::Node(previous)) = state.elements.last().cloned() else {
            return None;
        };
        let skipped = SmolStr::from(parser.slice(child_start, resume));
        parser.set_pos(resume);
        let matched = match parser.match_parselet(child_id) {
            Ok(node) => node,
            Err(_) => {
                parser.set_pos(child_start);
                return None;
            }
        };
        let message = format!("unexpected input before {}", grammar.parselet(child_id).display_name());
        let repaired = ParseNode::error(
            previous.parselet(),
            vec![ParseElement::Node(previous), ParseElement::Text(skipped)],
            ErrorCode::E0102,
            message.as_str(),
        );
        if let Some(last) = state.elements.last_mut() {
            *last = ParseElement::Node(repaired);
        }
        let skip_error = ParseError::builder(ErrorCode::E0102)
            .message(message)
            .range(child_start, resume)
            .parselet(parselet.id)
            .build();
        parser.record_skipped(skip_error);
        trace!(rule = %parselet.name, child = ix, skipped = resume - child_start, "recovered by extending previous child");
        state.push(grammar.parselet(child_id), seq.slots.slot(ix), ix, matched);
        Some(ix + 1)
    } else {
        let (resume, _) = skip_child?;
        let mut children = Vec::new();
        let mut skip_from = child_start;
        if let Some(partial) = &err.partial {
            skip_from += partial.len();
            children.push(ParseElement::Node(partial.clone()));
        }
        if resume > skip_from {
            children.push(ParseElement::Text(SmolStr::from(parser.slice(skip_from, resume))));
        }
        let repaired = ParseNode::error(child_id, children, err.code, err.message.as_str());
        parser.set_pos(resume);
        let mut skip_error = err.clone();
        skip_error.partial = None;
        skip_error.parselet = Some(child_id);
        parser.record_skipped(skip_error);
        trace!(rule = %parselet.name, child = ix, skipped = resume - child_start, "recovered by skipping child");
        state.push(grammar.parselet(child_id), seq.slots.slot(ix), ix, Some(repaired));
        Some(ix + 1)
    }
}
