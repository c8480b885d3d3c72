//! Grammar construction and build-time analysis.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::{debug, warn};

use super::descriptor::parse_descriptor;
use super::slots::{DeclaredType, SlotKind, SlotMapping, ValueShape};
use super::{
    Composite, Grammar, GrammarError, LiteralSet, Modifiers, Parselet, ParseletId, ParseletKind, ParseletOptions,
};
use crate::value::{TypeId, TypeRegistry, ValueType};

/// Builds a [`Grammar`] rule by rule.
///
/// Composites are created from a descriptor such as `"Binary(lhs,,rhs)"`;
/// children can be supplied up front or later with
/// [`set_children`](Self::set_children) to close recursive cycles.
///
/// ```
/// use parselets::grammar::{GrammarBuilder, Modifiers};
///
/// let mut g = GrammarBuilder::new("greeting");
/// g.declare_type("Greeting", None);
/// let hello = g.literal("hello", "hello", Modifiers::NONE);
/// let space = g.literal("space", " ", Modifiers::NONE);
/// let name = g.literal_set("name", parselets::grammar::LiteralSet::char_range('a', 'z'), Modifiers::new().repeat());
/// let greeting = g.sequence("Greeting(,,who)", &[hello, space, name], Modifiers::NONE);
/// g.set_root(greeting);
/// let grammar = g.build();
/// let doc = grammar.parse("hello world").unwrap();
/// assert_eq!(doc.value().get("who").as_str(), Some("world"));
/// ```
#[derive(Debug)]
pub struct GrammarBuilder {
    name: SmolStr,
    parselets: Vec<Parselet>,
    result_types: FxHashMap<ParseletId, SmolStr>,
    types: TypeRegistry,
    diagnostics: Vec<GrammarError>,
    root: Option<ParseletId>,
}

impl GrammarBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: SmolStr::new(name),
            parselets: Vec::new(),
            result_types: FxHashMap::default(),
            types: TypeRegistry::new(),
            diagnostics: Vec::new(),
            root: None,
        }
    }

    /// Declare a result type, optionally extending `parent`.
    ///
    /// An unknown parent is declared as a root type on the fly.
    pub fn declare_type(&mut self, name: &str, parent: Option<&str>) -> TypeId {
        let parent = parent.map(|p| match self.types.lookup(p) {
            Some(id) => id,
            None => self.declare_type(p, None),
        });
        match self.types.declare(name, parent) {
            Ok(id) => id,
            Err(id) => {
                self.diagnostics.push(GrammarError::TypeConflict { name: name.to_string() });
                id
            }
        }
    }

    fn push(&mut self, name: SmolStr, positional: bool, kind: ParseletKind, modifiers: Modifiers) -> ParseletId {
        let id = ParseletId(self.parselets.len() as u32);
        let mut parselet = Parselet::new(id, name, kind, modifiers);
        parselet.positional = positional;
        self.parselets.push(parselet);
        id
    }

    /// A single literal string
    pub fn literal(&mut self, name: &str, text: &str, modifiers: Modifiers) -> ParseletId {
        self.literal_set(name, LiteralSet::single(text), modifiers)
    }

    pub fn literal_set(&mut self, name: &str, set: LiteralSet, modifiers: Modifiers) -> ParseletId {
        self.push(SmolStr::new(name), false, ParseletKind::Literal(set), modifiers)
    }

    /// All children in order
    pub fn sequence(&mut self, descriptor: &str, children: &[ParseletId], modifiers: Modifiers) -> ParseletId {
        let (name, positional, composite) = self.composite(descriptor, children);
        self.push(name, positional, ParseletKind::Sequence(composite), modifiers)
    }

    /// First child that matches
    pub fn choice(&mut self, descriptor: &str, children: &[ParseletId], modifiers: Modifiers) -> ParseletId {
        let (name, positional, composite) = self.composite(descriptor, children);
        self.push(name, positional, ParseletKind::Choice(composite), modifiers)
    }

    fn composite(&mut self, descriptor: &str, children: &[ParseletId]) -> (SmolStr, bool, Composite) {
        let (name, positional, slots) = match parse_descriptor(descriptor) {
            Ok(d) => {
                let slots = match d.slots {
                    Some(slots) => SlotMapping::new(slots, d.generate_slots),
                    None => SlotMapping::implicit(),
                };
                (d.name, d.positional, slots)
            }
            Err(source) => {
                self.diagnostics.push(GrammarError::Descriptor {
                    rule: descriptor.to_string(),
                    source,
                });
                (SmolStr::new(descriptor), false, SlotMapping::implicit())
            }
        };
        let composite = Composite {
            children: children.to_vec(),
            slots,
            ..Composite::default()
        };
        (name, positional, composite)
    }

    fn composite_mut(&mut self, id: ParseletId) -> Option<&mut Composite> {
        match &mut self.parselets[id.index()].kind {
            ParseletKind::Sequence(c) | ParseletKind::Choice(c) => Some(c),
            ParseletKind::Literal(_) => None,
        }
    }

    /// Replace a composite's children
    pub fn set_children(&mut self, id: ParseletId, children: &[ParseletId]) {
        match self.composite_mut(id) {
            Some(c) => c.children = children.to_vec(),
            None => self.literal_has_no_children(id),
        }
    }

    pub fn add_child(&mut self, id: ParseletId, child: ParseletId) {
        match self.composite_mut(id) {
            Some(c) => c.children.push(child),
            None => self.literal_has_no_children(id),
        }
    }

    fn literal_has_no_children(&mut self, id: ParseletId) {
        let rule = self.parselets[id.index()].display_name();
        self.diagnostics.push(GrammarError::Structure {
            rule,
            message: "literal parselets have no children".to_string(),
        });
    }

    /// Declare the type of object this composite produces
    pub fn set_result_type(&mut self, id: ParseletId, type_name: &str) {
        self.result_types.insert(id, SmolStr::new(type_name));
    }

    pub fn options_mut(&mut self, id: ParseletId) -> &mut ParseletOptions {
        &mut self.parselets[id.index()].options
    }

    pub fn modifiers_mut(&mut self, id: ParseletId) -> &mut Modifiers {
        &mut self.parselets[id.index()].modifiers
    }

    pub fn set_root(&mut self, id: ParseletId) {
        self.root = Some(id);
    }

    pub fn lookup(&self, name: &str) -> Option<ParseletId> {
        self.parselets.iter().find(|p| p.name == name).map(|p| p.id)
    }

    /// Resolve slots, shapes and types, and report definition problems.
    pub fn build(self) -> Grammar {
        let GrammarBuilder {
            name,
            mut parselets,
            result_types,
            types,
            mut diagnostics,
            root,
        } = self;

        assign_declared_types(&mut parselets, &result_types, &types, &mut diagnostics);
        resolve_slots(&mut parselets, &mut diagnostics);
        resolve_produces(&mut parselets);

        let mut resolution = TypeResolution::default();
        for ix in 0..parselets.len() {
            let id = ParseletId(ix as u32);
            let resolved = resolve_value_type_with(&parselets, &types, id, &mut resolution).unwrap_or_default();
            // the cell is fresh; a second set cannot happen
            let _ = parselets[ix].value_type.set(resolved);
        }
        diagnostics.extend(resolution.problems);

        if root.is_none() {
            diagnostics.push(GrammarError::NoRoot);
        }

        let mut deduped: Vec<GrammarError> = Vec::with_capacity(diagnostics.len());
        for diagnostic in diagnostics {
            if !deduped.contains(&diagnostic) {
                deduped.push(diagnostic);
            }
        }
        for diagnostic in &deduped {
            warn!(grammar = %name, "{diagnostic}");
        }

        let mut by_name = FxHashMap::default();
        for parselet in &parselets {
            if !parselet.name.is_empty() {
                by_name.entry(parselet.name.clone()).or_insert(parselet.id);
            }
        }
        debug!(grammar = %name, parselets = parselets.len(), types = types.len(), "grammar built");

        Grammar {
            name,
            parselets,
            root,
            types,
            diagnostics: deduped,
            by_name,
        }
    }
}

/// Explicit result types, then names that match a declared type.
fn assign_declared_types(
    parselets: &mut [Parselet],
    result_types: &FxHashMap<ParseletId, SmolStr>,
    types: &TypeRegistry,
    diagnostics: &mut Vec<GrammarError>,
) {
    for parselet in parselets.iter_mut() {
        if parselet.is_literal() {
            continue;
        }
        let explicit = result_types.get(&parselet.id).cloned();
        let implied = (!parselet.positional && !parselet.name.is_empty() && types.lookup(&parselet.name).is_some())
            .then(|| parselet.name.clone());
        let Some(type_name) = explicit.or(implied) else {
            continue;
        };
        match types.lookup(&type_name) {
            Some(id) => parselet.declared = Some(DeclaredType { id, name: type_name }),
            None => diagnostics.push(GrammarError::UnknownType {
                rule: parselet.display_name(),
                name: type_name.to_string(),
            }),
        }
    }
}

fn resolve_slots(parselets: &mut [Parselet], diagnostics: &mut Vec<GrammarError>) {
    let splices_into_parent: Vec<bool> = parselets
        .iter()
        .map(|p| p.modifiers.skip && !p.is_literal())
        .collect();
    let matches_nothing: Vec<bool> = parselets.iter().map(|p| p.modifiers.matches_nothing()).collect();
    let count = parselets.len();

    for parselet in parselets.iter_mut() {
        let rule = parselet.display_name();
        let declared = parselet.declared.is_some();
        let repeat = parselet.modifiers.repeat;
        let mut structure = Vec::new();
        let mut exclusions = Vec::new();

        if parselet.options.chain_slot.is_some()
            && !matches!(&parselet.kind, ParseletKind::Sequence(c) if c.children.len() == 2)
        {
            structure.push("a chained rule needs a sequence of exactly two children".to_string());
        }
        if parselet.options.skip_on_error.is_some() && !(repeat && matches!(parselet.kind, ParseletKind::Choice(_))) {
            structure.push("error skipping needs a repeated choice".to_string());
        }

        let (shape, problems) = match &mut parselet.kind {
            ParseletKind::Literal(set) => {
                exclusions.extend(set.unresolved_exclusions().iter().map(|l| l.to_string()));
                if set.literals().is_empty() && !set.matches_any() {
                    structure.push("literal set is empty".to_string());
                }
                (ValueShape::String, Vec::new())
            }
            ParseletKind::Sequence(c) | ParseletKind::Choice(c) if c.children.is_empty() => {
                structure.push("composite has no children".to_string());
                (ValueShape::Null, Vec::new())
            }
            ParseletKind::Sequence(c) => {
                let n = c.children.len();
                if c.children.iter().any(|child| child.index() >= count) {
                    structure.push("child refers to an unknown parselet".to_string());
                }
                if c.slots.is_explicit() && c.slots.slots().len() > n {
                    structure.push(format!("{} slots for {} children", c.slots.slots().len(), n));
                }
                c.slots.fill_defaults(n, if declared { SlotKind::Skip } else { SlotKind::Str });
                c.splices = c
                    .children
                    .iter()
                    .any(|child| splices_into_parent.get(child.index()).copied().unwrap_or(false));
                c.all_optional = c
                    .children
                    .iter()
                    .all(|child| matches_nothing.get(child.index()).copied().unwrap_or(false));
                c.slots.shape(declared)
            }
            ParseletKind::Choice(c) => {
                let n = c.children.len();
                if c.children.iter().any(|child| child.index() >= count) {
                    structure.push("child refers to an unknown parselet".to_string());
                }
                if repeat {
                    c.slots.fill_defaults(n, SlotKind::Array);
                    let (shape, problems) = c.slots.shape(false);
                    let shape = if shape == ValueShape::String { ValueShape::String } else { ValueShape::List };
                    (shape, problems)
                } else {
                    let mut problems = Vec::new();
                    if let Some(slot) = c.slots.slots().iter().find(|s| !matches!(s, SlotKind::Propagate | SlotKind::Skip)) {
                        problems.push(format!(
                            "slot '{}' on a choice that is not repeated; its value is the alternative's value",
                            slot.descriptor()
                        ));
                    }
                    c.slots.fill_defaults(n, SlotKind::Propagate);
                    (ValueShape::Propagate, problems)
                }
            }
        };
        diagnostics.extend(structure.into_iter().map(|message| GrammarError::Structure {
            rule: rule.clone(),
            message,
        }));
        diagnostics.extend(exclusions.into_iter().map(|literal| GrammarError::Exclusion {
            rule: rule.clone(),
            literal,
        }));
        diagnostics.extend(problems.into_iter().map(|message| GrammarError::Slots {
            rule: rule.clone(),
            message,
        }));
        parselet.shape = shape;
    }
}

/// Non-repeated choices hand back their alternative's node, so a node may
/// stand for any choice that can reach its parselet through choices alone.
fn resolve_produces(parselets: &mut [Parselet]) {
    fn collect(parselets: &[Parselet], id: ParseletId, out: &mut Vec<ParseletId>) {
        if out.contains(&id) || id.index() >= parselets.len() {
            return;
        }
        out.push(id);
        let parselet = &parselets[id.index()];
        if let ParseletKind::Choice(c) = &parselet.kind {
            if !parselet.modifiers.repeat {
                for &alt in &c.children {
                    collect(parselets, alt, out);
                }
            }
        }
    }

    let mut produces = Vec::with_capacity(parselets.len());
    let mut alternatives = Vec::with_capacity(parselets.len());
    for parselet in parselets.iter() {
        let mut own = Vec::new();
        collect(parselets, parselet.id, &mut own);
        own.sort();
        produces.push(own);

        let mut alts = Vec::new();
        if let ParseletKind::Choice(c) = &parselet.kind {
            for &alt in &c.children {
                collect(parselets, alt, &mut alts);
            }
            alts.sort();
        }
        alternatives.push(alts);
    }
    for ((parselet, own), alts) in parselets.iter_mut().zip(produces).zip(alternatives) {
        parselet.produces = own;
        if let ParseletKind::Choice(c) = &mut parselet.kind {
            c.alternatives_produce = alts;
        }
    }
}

#[derive(Default)]
pub(crate) struct TypeResolution {
    visiting: Vec<ParseletId>,
    resolved: FxHashMap<ParseletId, ValueType>,
    problems: Vec<GrammarError>,
}

pub(crate) fn resolve_value_type(parselets: &[Parselet], types: &TypeRegistry, id: ParseletId) -> Option<ValueType> {
    resolve_value_type_with(parselets, types, id, &mut TypeResolution::default())
}

/// Static value type of a parselet; `None` while a recursive reference to
/// it is still being resolved.
fn resolve_value_type_with(
    parselets: &[Parselet],
    types: &TypeRegistry,
    id: ParseletId,
    state: &mut TypeResolution,
) -> Option<ValueType> {
    let parselet = parselets.get(id.index())?;
    if let Some(resolved) = parselet.value_type.get().or_else(|| state.resolved.get(&id)) {
        return Some(*resolved);
    }
    if state.visiting.contains(&id) {
        return None;
    }
    state.visiting.push(id);
    let declared = parselet.declared.as_ref().map(|d| ValueType::Object(d.id));

    let resolved = match &parselet.kind {
        ParseletKind::Literal(_) => Some(ValueType::String),
        ParseletKind::Sequence(c) if parselet.options.chain_slot.is_some() => {
            let head = c
                .children
                .first()
                .and_then(|&child| resolve_value_type_with(parselets, types, child, state));
            let tail = c
                .children
                .get(1)
                .and_then(|&child| parselets.get(child.index()))
                .and_then(|tail| tail.declared.as_ref())
                .map(|d| ValueType::Object(d.id));
            match (head, tail) {
                (Some(h), Some(t)) => Some(types.join(h, t).unwrap_or(ValueType::Any)),
                (h, t) => h.or(t),
            }
        }
        ParseletKind::Sequence(_) | ParseletKind::Choice(_) if parselet.modifiers.repeat => {
            Some(if parselet.shape == ValueShape::String { ValueType::String } else { ValueType::List })
        }
        ParseletKind::Sequence(c) => match parselet.shape {
            ValueShape::Object => Some(declared.unwrap_or(ValueType::Any)),
            ValueShape::List => Some(ValueType::List),
            ValueShape::String => Some(ValueType::String),
            ValueShape::Null => Some(ValueType::Any),
            ValueShape::Propagate => declared.or_else(|| {
                c.slots
                    .slots()
                    .iter()
                    .position(|s| matches!(s, SlotKind::Propagate))
                    .and_then(|ix| c.children.get(ix))
                    .and_then(|&child| resolve_value_type_with(parselets, types, child, state))
            }),
        },
        ParseletKind::Choice(c) => declared.or_else(|| {
            let mut joined: Option<(ValueType, ParseletId)> = None;
            for &alt in &c.children {
                let Some(alt_type) = resolve_value_type_with(parselets, types, alt, state) else {
                    continue;
                };
                joined = Some(match joined {
                    None => (alt_type, alt),
                    Some((acc, first)) => match types.join(acc, alt_type) {
                        Ok(t) => (t, first),
                        Err(_) => {
                            state.problems.push(GrammarError::NoCommonType {
                                rule: parselet.display_name(),
                                first: parselets[first.index()].display_name(),
                                second: parselets[alt.index()].display_name(),
                            });
                            (ValueType::Any, first)
                        }
                    },
                });
            }
            joined.map(|(t, _)| t)
        }),
    };

    state.visiting.pop();
    if let Some(resolved) = resolved {
        state.resolved.insert(id, resolved);
    }
    resolved
}
