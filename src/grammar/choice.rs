//! Ordered choices: the first alternative that matches wins.
//!
//! A plain choice hands back the winning alternative's node unchanged. A
//! repeated choice collects one element per iteration and, given a skip
//! parselet and an exit, skips text it cannot match instead of stopping.

use smol_str::SmolStr;
use tracing::trace;

use super::sequence::{OldNode, push_element};
use super::slots::{SlotKind, ValueBuilder};
use super::{Composite, Parselet, ParseletId};
use crate::parser::{ErrorCode, MatchResult, ParseError, Parser, is_better_error};
use crate::tree::{ParseElement, ParseNode, ParseNodeRef};
use crate::value::Value;

pub(crate) fn parse<'g>(
    parser: &mut Parser<'g>,
    parselet: &'g Parselet,
    choice: &'g Composite,
    old: Option<OldNode<'_>>,
) -> MatchResult {
    if parselet.modifiers.repeat {
        return parse_repeat(parser, parselet, choice, old);
    }
    let old = old.map(|o| unwrap_old(parselet, o));
    let (_, node) = match_alternatives(parser, parselet, choice, old)?;
    Ok(node.map(|node| wrap(parselet, node)))
}

/// A typed choice whose alternative produced no value gets a node of its
/// own to carry a fresh object.
fn wrap(parselet: &Parselet, node: ParseNodeRef) -> ParseNodeRef {
    match &parselet.declared {
        Some(declared) if node.value().is_null() => ParseNode::parent(
            parselet.id,
            vec![ParseElement::Node(node)],
            Value::Object(declared.instantiate()),
        ),
        _ => node,
    }
}

fn unwrap_old<'a>(parselet: &Parselet, old: OldNode<'a>) -> OldNode<'a> {
    if old.node.parselet() == parselet.id {
        if let Some(ParseElement::Node(inner)) = old.node.children().first() {
            return OldNode {
                node: inner,
                start: old.start,
            };
        }
    }
    old
}

fn try_alternative(parser: &mut Parser<'_>, alt: ParseletId, old: Option<OldNode<'_>>) -> MatchResult {
    match old {
        Some(o) if parser.grammar().parselet(alt).can_produce(o.node.parselet()) => {
            parser.reparse_parselet(alt, o.node, o.start)
        }
        _ => parser.match_parselet(alt),
    }
}

/// Try each alternative in order with recovery off. When all fail inside a
/// recovering parse, the alternative that got furthest is tried again with
/// recovery on, so a broken statement does not steal input from a later
/// alternative that would have matched cleanly.
fn match_alternatives<'g>(
    parser: &mut Parser<'g>,
    parselet: &'g Parselet,
    choice: &'g Composite,
    old: Option<OldNode<'_>>,
) -> Result<(usize, Option<ParseNodeRef>), Box<ParseError>> {
    let start = parser.pos();
    let recovering = parser.set_recovering(false);
    let mut best: Option<(usize, Box<ParseError>)> = None;

    for (ix, &alt) in choice.children.iter().enumerate() {
        match try_alternative(parser, alt, old) {
            Ok(node) => {
                parser.set_recovering(recovering);
                return Ok((ix, node));
            }
            Err(err) => {
                parser.set_pos(start);
                if best
                    .as_ref()
                    .is_none_or(|(_, b)| is_better_error(b.start(), b.end(), err.start(), err.end()))
                {
                    best = Some((ix, err));
                }
            }
        }
    }
    parser.set_recovering(recovering);

    if recovering && parser.can_recover() {
        if let Some(ix) = best.as_ref().filter(|(_, e)| e.partial_len() > 0).map(|(ix, _)| *ix) {
            trace!(rule = %parselet.name, alternative = ix, "retrying alternative with recovery");
            match try_alternative(parser, choice.children[ix], old) {
                Ok(node) => return Ok((ix, node)),
                Err(err) => {
                    parser.set_pos(start);
                    if best
                        .as_ref()
                        .is_none_or(|(_, b)| is_better_error(b.start(), b.end(), err.start(), err.end()))
                    {
                        best = Some((ix, err));
                    }
                }
            }
        }
    }
    Err(choice_error(parser, parselet, choice, start, best.map(|(_, e)| e)))
}

/// Keep an alternative's error if it got past the choice's first char;
/// otherwise report the choice itself as expected.
fn choice_error(
    parser: &mut Parser<'_>,
    parselet: &Parselet,
    choice: &Composite,
    start: usize,
    best: Option<Box<ParseError>>,
) -> Box<ParseError> {
    let end = match best {
        Some(err) if err.partial_len() > 0 || err.start() > start => return err,
        Some(err) => err.end().max(start),
        None => start,
    };
    let grammar = parser.grammar();
    let names: Vec<SmolStr> = choice
        .children
        .iter()
        .map(|&alt| SmolStr::from(grammar.parselet(alt).display_name()))
        .collect();
    let message = if parselet.name.is_empty() {
        format!("expected one of {}", names.join(", "))
    } else {
        format!("expected {}", parselet.display_name())
    };
    let mut err = parser.fail(parselet, ErrorCode::E0201, start, end, message);
    err.args = names;
    err
}

fn parse_repeat<'g>(
    parser: &mut Parser<'g>,
    parselet: &'g Parselet,
    choice: &'g Composite,
    old: Option<OldNode<'_>>,
) -> MatchResult {
    let grammar = parser.grammar();
    let start = parser.pos();
    let exit = parser.take_exit(parselet);
    let old_items: Vec<(usize, &ParseElement)> = old
        .filter(|o| o.node.parselet() == parselet.id && !o.node.is_error())
        .map(|o| o.elements())
        .unwrap_or_default();
    let mut cursor = 0;

    let mut builder = ValueBuilder::new(parselet.shape, None);
    let mut elements = Vec::new();
    let mut last_error = None;
    loop {
        let iteration_start = parser.pos();
        let hint = parser
            .find_old(&old_items, &mut cursor)
            .and_then(|&(start, element)| element.as_node().map(|node| OldNode { node, start }));
        let reused = hint.and_then(|o| parser.try_reuse(&choice.alternatives_produce, o.node, o.start));
        let result = match reused {
            Some(node) => {
                let ix = choice
                    .children
                    .iter()
                    .position(|&alt| grammar.parselet(alt).can_produce(node.parselet()))
                    .unwrap_or(0);
                Ok((ix, Some(node)))
            }
            None => match_alternatives(parser, parselet, choice, hint),
        };

        match result {
            Ok((ix, Some(node))) if !node.is_empty() => {
                let alt = grammar.parselet(choice.children[ix]);
                let slot = choice.slots.slot(ix);
                if !alt.modifiers.discard {
                    let text = if matches!(slot, SlotKind::Str) { node.text() } else { String::new() };
                    builder.add(slot, node.value().clone(), &text);
                }
                push_element(alt, node, &mut elements);
            }
            Ok(_) => {
                parser.set_pos(iteration_start);
                break;
            }
            Err(err) => {
                parser.set_pos(iteration_start);
                if let Some(skipped) = skip_unmatched(parser, parselet, exit, &err) {
                    elements.push(ParseElement::Node(skipped));
                    continue;
                }
                last_error = Some(err);
                break;
            }
        }
    }

    if elements.is_empty() {
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

    let value = builder.finish();
    if let Some(mut err) = last_error.filter(|e| parser.partial_mode() && e.partial.is_some()) {
        if let Some(partial) = err.partial.take() {
            let mut with_partial = elements.clone();
            with_partial.push(ParseElement::Node(partial));
            err.partial = Some(ParseNode::parent(parselet.id, with_partial, value.clone()));
        }
        parser.set_continuation(parselet.id, start, err);
    }
    Ok(Some(ParseNode::parent(parselet.id, elements, value)))
}

/// Consume text no alternative matched, unless the exit matches here.
fn skip_unmatched(
    parser: &mut Parser<'_>,
    parselet: &Parselet,
    exit: Option<ParseletId>,
    err: &ParseError,
) -> Option<ParseNodeRef> {
    let skip = parselet.options.skip_on_error?;
    let exit = exit?;
    let start = parser.pos();
    if !parser.can_recover() || parser.at_end(start) || parser.probe(exit, start).is_some() {
        return None;
    }

    let mut children = Vec::new();
    if let Some(partial) = &err.partial {
        children.push(ParseElement::Node(partial.clone()));
        parser.set_pos(start + partial.len());
    }
    let skip_start = parser.pos();
    match parser.match_parselet(skip) {
        Ok(Some(node)) if !node.is_empty() => children.push(ParseElement::Node(node)),
        _ => parser.set_pos(skip_start),
    }
    let end = parser.pos();
    if end == start {
        return None;
    }

    let mut skipped = err.clone();
    skipped.partial = None;
    skipped.range = crate::base::text_range(start, end);
    parser.record_skipped(skipped);
    trace!(rule = %parselet.name, start, end, "skipped unmatched input");
    Some(ParseNode::error(parselet.id, children, err.code, err.message.as_str()))
}
