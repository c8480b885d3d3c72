//! Generation: from a semantic value back to a parse tree
//!
//! Generation mirrors parsing. A sequence hands each child the part of the
//! value its slot maps, a choice picks the first alternative whose value type
//! fits, and repeated rules consume list items until none fit. A string value
//! reaching a literal or a string-shaped rule is parsed with that rule, so
//! the tree holds real tokens. Rules with a [`FormatHint`] become placeholders that
//! [`format`] resolves once the tree is complete.
//!
//! ```text
//! Value ── Generator::generate ──> ParseNode tree ── format ──> text
//! ```

mod format;

#[cfg(test)]
mod tests;

use thiserror::Error;
use tracing::{debug, trace};

pub use format::{FormatContext, FormatHint, FormatOptions, format};

use crate::grammar::{Composite, Grammar, Parselet, ParseletId, ParseletKind, SlotKind, ValueShape, push_element};
use crate::parser::{ParseOptions, Parser};
use crate::tree::{ParseElement, ParseNode, ParseNodeRef, ParsedDocument};
use crate::value::{ObjectRef, Value};

/// A value that the grammar cannot express
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("'{rule}': no alternative can generate {value}")]
    NoAlternative { rule: String, value: String },
    #[error("'{rule}': cannot generate {value}: {reason}")]
    Mismatch {
        rule: String,
        value: String,
        reason: String,
    },
    #[error("'{rule}': {remaining} list item(s) left over")]
    Unconsumed { rule: String, remaining: usize },
    #[error("'{rule}': expected a value of type {expected}, found {found}")]
    TypeMismatch {
        rule: String,
        expected: String,
        found: String,
    },
    #[error("object is not part of the document")]
    NotInDocument,
    #[error("grammar has no root rule")]
    NoRoot,
}

type GenResult<T> = Result<T, GenerateError>;

/// Builds parse trees from values for one grammar.
pub struct Generator<'g> {
    grammar: &'g Grammar,
}

impl<'g> Generator<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    /// Generate a tree for `value` with rule `id`
    pub fn generate(&self, id: ParseletId, value: &Value) -> GenResult<ParseNodeRef> {
        let element = self.element(id, value)?;
        Ok(match element {
            ParseElement::Node(node) => node,
            other => ParseNode::parent(id, vec![other], value.clone()),
        })
    }

    /// Regenerate the part of `doc` owned by `object` after it was mutated.
    ///
    /// Only the node holding the object is rebuilt; its ancestors are copied
    /// along the path and every other subtree is shared with `doc`.
    pub fn regenerate(&self, doc: &ParsedDocument, object: &ObjectRef) -> GenResult<ParseNodeRef> {
        let root = doc.root();
        let path = root.path_to_value(object).ok_or(GenerateError::NotInDocument)?;
        let mut target = root;
        for &ix in &path {
            target = target
                .children()
                .get(ix)
                .and_then(ParseElement::as_node)
                .ok_or(GenerateError::NotInDocument)?;
        }
        let replacement = self.generate(target.parselet(), &Value::Object(object.clone()))?;
        debug!(depth = path.len(), rule = target.parselet().index(), "regenerated subtree");
        let regenerated = root.replace_at(&path, replacement);
        regenerated.rebind_values();
        Ok(regenerated)
    }

    fn parselet(&self, id: ParseletId) -> &'g Parselet {
        self.grammar.parselet(id)
    }

    fn describe(value: &Value) -> String {
        let mut text = format!("{value:?}");
        if text.len() > 60 {
            let mut cut = 57;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
            text.push_str("...");
        }
        text
    }

    fn mismatch(parselet: &Parselet, value: &Value, reason: impl Into<String>) -> GenerateError {
        GenerateError::Mismatch {
            rule: parselet.display_name(),
            value: Self::describe(value),
            reason: reason.into(),
        }
    }

    /// Element for one value, honoring the rule's modifiers
    fn element(&self, id: ParseletId, value: &Value) -> GenResult<ParseElement> {
        let parselet = self.parselet(id);
        let modifiers = parselet.modifiers;
        if modifiers.lookahead || modifiers.negated {
            return Ok(ParseElement::Empty);
        }
        if let Some(hint) = parselet.options.format {
            return Ok(ParseElement::Node(ParseNode::formatted(id, hint)));
        }
        if modifiers.optional && value.is_empty() {
            return Ok(ParseElement::Empty);
        }
        if modifiers.repeat {
            if let Value::List(items) = value {
                let (element, used) = self.items(id, items)?;
                if used < items.len() {
                    return Err(GenerateError::Unconsumed {
                        rule: parselet.display_name(),
                        remaining: items.len() - used,
                    });
                }
                return Ok(element);
            }
        }
        if let Value::Str(text) = value {
            if parselet.is_literal() || parselet.shape == ValueShape::String {
                match self.parse_text(parselet, text) {
                    Ok(node) => return Ok(ParseElement::Node(node)),
                    Err(err) if parselet.is_literal() => return Err(err),
                    Err(_) => {}
                }
            }
        }
        match &parselet.kind {
            ParseletKind::Literal(set) => match set.default_literal() {
                Some(text) => Ok(ParseElement::Node(ParseNode::leaf(id, text, Value::str(text)))),
                None if set.matches_end_of_input() => Ok(ParseElement::Empty),
                None => Err(Self::mismatch(parselet, value, "literal has no default text")),
            },
            ParseletKind::Sequence(seq) => self.sequence(parselet, seq, value).map(ParseElement::Node),
            ParseletKind::Choice(choice) => self.choice(parselet, choice, value),
        }
    }

    fn parse_text(&self, parselet: &Parselet, text: &str) -> GenResult<ParseNodeRef> {
        let doc = Parser::new(self.grammar, text, ParseOptions::default())
            .parse_parselet(parselet.id)
            .map_err(|err| Self::mismatch(parselet, &Value::str(text), err.message))?;
        trace!(rule = %parselet.name, text, "generated by parsing");
        Ok(doc.root().clone())
    }

    fn node_value(parselet: &Parselet, value: &Value) -> Value {
        if parselet.shape == ValueShape::Null && parselet.declared.is_none() {
            Value::Null
        } else {
            value.clone()
        }
    }

    /// A typed rule takes objects of its type (or a subtype) and null
    fn check_type(&self, parselet: &Parselet, value: &Value) -> GenResult<()> {
        let Some(declared) = &parselet.declared else {
            return Ok(());
        };
        let types = self.grammar.types();
        let found = match value {
            Value::Null => return Ok(()),
            Value::Object(obj) => match obj.borrow().type_id() {
                Some(actual) if !types.is_assignable(declared.id, actual) => types.name(actual).to_string(),
                _ => return Ok(()),
            },
            Value::Str(_) => "string".to_string(),
            Value::List(_) => "list".to_string(),
        };
        Err(GenerateError::TypeMismatch {
            rule: parselet.display_name(),
            expected: declared.name.to_string(),
            found,
        })
    }

    fn push(&self, child: &Parselet, element: ParseElement, elements: &mut Vec<ParseElement>) {
        match element {
            ParseElement::Node(node) if node.is_formatted() => elements.push(ParseElement::Node(node)),
            ParseElement::Node(node) => push_element(child, node, elements),
            other => elements.push(other),
        }
    }

    fn sequence(&self, parselet: &Parselet, seq: &Composite, value: &Value) -> GenResult<ParseNodeRef> {
        self.check_type(parselet, value)?;
        if let Some(slot) = &parselet.options.chain_slot {
            return self.chain(parselet, seq, value, slot);
        }
        // a list reaching a propagating sequence belongs to the child it propagates to
        let list: &[Value] = match value.as_list() {
            Some(items) if seq.slots.count(|s| matches!(s, SlotKind::Array)) > 0 => items,
            _ => &[],
        };
        let (elements, used) = self.sequence_children(parselet, seq, value, list)?;
        if used < list.len() {
            return Err(GenerateError::Unconsumed {
                rule: parselet.display_name(),
                remaining: list.len() - used,
            });
        }
        Ok(ParseNode::parent(parselet.id, elements, Self::node_value(parselet, value)))
    }

    /// Children of one sequence match. Array slots take items from `list`;
    /// returns how many were used.
    fn sequence_children(
        &self,
        parselet: &Parselet,
        seq: &Composite,
        value: &Value,
        list: &[Value],
    ) -> GenResult<(Vec<ParseElement>, usize)> {
        let single_string = seq.slots.count(|s| matches!(s, SlotKind::Str)) == 1;
        let mut elements = Vec::with_capacity(seq.children.len());
        let mut used = 0;
        for (ix, &child_id) in seq.children.iter().enumerate() {
            let child = self.parselet(child_id);
            let element = match seq.slots.generate_slot(ix) {
                SlotKind::Skip => self.element(child_id, &Value::Null)?,
                SlotKind::Propagate | SlotKind::Inherit => self.element(child_id, value)?,
                SlotKind::Str if single_string && matches!(value, Value::Str(_)) => self.element(child_id, value)?,
                SlotKind::Str => self.element(child_id, &Value::Null)?,
                SlotKind::Array => {
                    let (element, n) = self.items(child_id, &list[used..])?;
                    used += n;
                    element
                }
                SlotKind::Named(name) => self.element(child_id, &value.get(name))?,
            };
            self.push(child, element, &mut elements);
        }
        trace!(rule = %parselet.name, used, "generated sequence");
        Ok((elements, used))
    }

    /// Unfold `c { target: b { target: a } }` back into `a b c`.
    fn chain(&self, parselet: &Parselet, seq: &Composite, value: &Value, slot: &str) -> GenResult<ParseNodeRef> {
        let mut links = Vec::new();
        let mut head = value.clone();
        loop {
            let previous = head.get(slot);
            if previous.is_null() {
                break;
            }
            links.push(std::mem::replace(&mut head, previous));
        }
        links.reverse();

        let mut elements = Vec::new();
        let mut children = seq.children.iter();
        if let Some(&first) = children.next() {
            let element = self.element(first, &head)?;
            self.push(self.parselet(first), element, &mut elements);
        }
        if let Some(&tail) = children.next() {
            let (element, used) = self.items(tail, &links)?;
            if used < links.len() {
                return Err(GenerateError::Unconsumed {
                    rule: parselet.display_name(),
                    remaining: links.len() - used,
                });
            }
            self.push(self.parselet(tail), element, &mut elements);
        }
        Ok(ParseNode::parent(parselet.id, elements, value.clone()))
    }

    /// First alternative whose value type fits `value` and that generates it
    fn choice(&self, parselet: &Parselet, choice: &Composite, value: &Value) -> GenResult<ParseElement> {
        self.check_type(parselet, value)?;
        let types = self.grammar.types();
        let mut first_error = None;
        for (ix, &alt) in choice.children.iter().enumerate() {
            let slot = choice.slots.generate_slot(ix);
            let alt_value = match slot {
                SlotKind::Skip if !value.is_empty() && !is_bare_object(value) => continue,
                SlotKind::Skip => Value::Null,
                SlotKind::Named(name) => value.get(name),
                _ => value.clone(),
            };
            if !alt_value.is_null() && !types.accepts(self.grammar.value_type(alt), alt_value.value_type()) {
                continue;
            }
            match self.element(alt, &alt_value) {
                Ok(element) => {
                    trace!(rule = %parselet.name, alternative = ix, "generated choice");
                    return Ok(self.wrap(parselet, element, value));
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        Err(first_error.unwrap_or_else(|| GenerateError::NoAlternative {
            rule: parselet.display_name(),
            value: Self::describe(value),
        }))
    }

    /// A typed choice whose alternative carries no value keeps the object on a
    /// node of its own, as parsing does.
    fn wrap(&self, parselet: &Parselet, element: ParseElement, value: &Value) -> ParseElement {
        let carries_value = element.as_node().is_some_and(|n| n.value().same_instance(value));
        if parselet.declared.is_some() && value.as_object().is_some() && !carries_value {
            ParseElement::Node(ParseNode::parent(parselet.id, vec![element], value.clone()))
        } else {
            element
        }
    }

    /// Element for rule `id` consuming a prefix of `items`; returns how many
    /// items were used.
    fn items(&self, id: ParseletId, items: &[Value]) -> GenResult<(ParseElement, usize)> {
        let parselet = self.parselet(id);
        let modifiers = parselet.modifiers;
        if modifiers.lookahead || modifiers.negated {
            return Ok((ParseElement::Empty, 0));
        }
        if let Some(hint) = parselet.options.format {
            return Ok((ParseElement::Node(ParseNode::formatted(id, hint)), 0));
        }

        if modifiers.repeat {
            let mut elements = Vec::new();
            let mut used = 0;
            while used < items.len() {
                match self.iteration(parselet, &items[used..]) {
                    Ok((iteration, n)) if n > 0 => {
                        elements.extend(iteration);
                        used += n;
                    }
                    Ok(_) => break,
                    Err(err) if used == 0 && !modifiers.optional => return Err(err),
                    Err(_) => break,
                }
            }
            if used == 0 {
                return if modifiers.optional {
                    Ok((ParseElement::Empty, 0))
                } else {
                    Err(Self::mismatch(parselet, &Value::List(Vec::new()), "nothing to repeat"))
                };
            }
            let value = Value::list(items[..used].iter().cloned());
            return Ok((ParseElement::Node(ParseNode::parent(id, elements, value)), used));
        }

        if parselet.shape == ValueShape::List {
            match &parselet.kind {
                ParseletKind::Sequence(seq) => {
                    let value = Value::list(items.iter().cloned());
                    let (elements, used) = self.sequence_children(parselet, seq, &value, items)?;
                    let value = Value::list(items[..used].iter().cloned());
                    return Ok((ParseElement::Node(ParseNode::parent(id, elements, value)), used));
                }
                ParseletKind::Choice(choice) => return self.choice_items(parselet, choice, items),
                ParseletKind::Literal(_) => {}
            }
        }

        match items.first() {
            None if modifiers.optional => Ok((ParseElement::Empty, 0)),
            None => Err(Self::mismatch(parselet, &Value::Null, "list ended early")),
            Some(item) => match self.element(id, item) {
                Ok(element) => Ok((element, 1)),
                Err(_) if modifiers.optional => Ok((ParseElement::Empty, 0)),
                Err(err) => Err(err),
            },
        }
    }

    /// One iteration of a repeated rule
    fn iteration(&self, parselet: &Parselet, items: &[Value]) -> GenResult<(Vec<ParseElement>, usize)> {
        match &parselet.kind {
            ParseletKind::Sequence(seq) if parselet.shape == ValueShape::List => {
                let value = Value::list(items.iter().cloned());
                self.sequence_children(parselet, seq, &value, items)
            }
            ParseletKind::Sequence(seq) => {
                let node = self.sequence(parselet, seq, &items[0])?;
                Ok((node.children().to_vec(), 1))
            }
            ParseletKind::Choice(choice) => {
                let (element, used) = self.choice_items(parselet, choice, items)?;
                let mut elements = Vec::new();
                if let ParseElement::Node(node) = &element {
                    if let Some(alt) = choice.children.iter().find(|&&alt| self.parselet(alt).can_produce(node.parselet())) {
                        self.push(self.parselet(*alt), element, &mut elements);
                        return Ok((elements, used));
                    }
                }
                elements.push(element);
                Ok((elements, used))
            }
            ParseletKind::Literal(_) => {
                let text = items[0]
                    .as_str()
                    .ok_or_else(|| Self::mismatch(parselet, &items[0], "expected a string"))?;
                let node = ParseNode::leaf(parselet.id, text, Value::str(text));
                Ok((vec![ParseElement::Node(node)], 1))
            }
        }
    }

    /// Alternative that consumes the most items; the first wins ties.
    fn choice_items(&self, parselet: &Parselet, choice: &Composite, items: &[Value]) -> GenResult<(ParseElement, usize)> {
        let mut best: Option<(ParseElement, usize)> = None;
        let mut first_error = None;
        for (ix, &alt) in choice.children.iter().enumerate() {
            let attempt = match choice.slots.generate_slot(ix) {
                SlotKind::Skip => continue,
                SlotKind::Array => self.items(alt, items),
                _ => match items.first() {
                    Some(item) if self.grammar.types().accepts(self.grammar.value_type(alt), item.value_type()) => {
                        self.element(alt, item).map(|element| (element, 1))
                    }
                    _ => continue,
                },
            };
            match attempt {
                Ok((element, used)) if used > best.as_ref().map_or(0, |(_, n)| *n) => best = Some((element, used)),
                Ok(_) => {}
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match best {
            Some(best) => Ok(best),
            None if parselet.modifiers.optional => Ok((ParseElement::Empty, 0)),
            None => Err(first_error.unwrap_or_else(|| GenerateError::NoAlternative {
                rule: parselet.display_name(),
                value: Self::describe(&Value::list(items.iter().cloned())),
            })),
        }
    }
}

/// An object with no properties, as produced by a typed keyword alternative
fn is_bare_object(value: &Value) -> bool {
    value.as_object().is_some_and(|obj| obj.borrow().property_count() == 0)
}
