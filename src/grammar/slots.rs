//! Slot mappings: how child results assemble into a composite's value.
//!
//! Each child position of a sequence or choice has a [`SlotKind`]. The kinds
//! present decide the static [`ValueShape`] of the composite, and a
//! [`ValueBuilder`] applies them to the children matched at parse time.

use smol_str::SmolStr;

use crate::value::{Object, ObjectRef, SlotAccess, TypeId, Value};

/// Mapping of one child position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Contributes nothing (descriptor: empty)
    Skip,
    /// Becomes the whole node's value (descriptor: `.`)
    Propagate,
    /// Text is appended to a running string value (descriptor: `''`)
    Str,
    /// Elements accumulate into a list value (descriptor: `[]`)
    Array,
    /// The child's own mappings apply to this node's value (descriptor: `*`)
    Inherit,
    /// Written into a named property (descriptor: identifier)
    Named(SmolStr),
}

impl SlotKind {
    pub fn is_skip(&self) -> bool {
        matches!(self, SlotKind::Skip)
    }

    /// Descriptor spelling of this kind
    pub fn descriptor(&self) -> &str {
        match self {
            SlotKind::Skip => "",
            SlotKind::Propagate => ".",
            SlotKind::Str => "''",
            SlotKind::Array => "[]",
            SlotKind::Inherit => "*",
            SlotKind::Named(name) => name,
        }
    }
}

/// The kind of value a composite produces, fixed at grammar build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueShape {
    /// No value (all slots skipped, no declared type)
    #[default]
    Null,
    /// One child's value passes through
    Propagate,
    /// Concatenated text
    String,
    /// Ordered list of child values
    List,
    /// An object with named properties
    Object,
}

/// Slot kinds of a composite plus its optional generation overrides.
#[derive(Debug, Clone, Default)]
pub struct SlotMapping {
    slots: Vec<SlotKind>,
    generate: Option<Vec<SlotKind>>,
    /// Declared by a descriptor rather than defaulted
    explicit: bool,
}

impl SlotMapping {
    pub fn new(slots: Vec<SlotKind>, generate: Option<Vec<SlotKind>>) -> Self {
        Self {
            slots,
            generate,
            explicit: true,
        }
    }

    /// A mapping with no descriptor; slots get defaulted at build time
    pub fn implicit() -> Self {
        Self::default()
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn slots(&self) -> &[SlotKind] {
        &self.slots
    }

    /// Slot used to parse child `index`
    pub fn slot(&self, index: usize) -> &SlotKind {
        self.slots.get(index).unwrap_or(&SlotKind::Skip)
    }

    /// Slot used to generate child `index`
    pub fn generate_slot(&self, index: usize) -> &SlotKind {
        self.generate
            .as_ref()
            .and_then(|g| g.get(index))
            .unwrap_or_else(|| self.slot(index))
    }

    pub fn has_generate_overrides(&self) -> bool {
        self.generate.is_some()
    }

    pub(crate) fn fill_defaults(&mut self, count: usize, default: SlotKind) {
        if !self.explicit {
            self.slots = vec![default; count];
        } else if self.slots.len() < count {
            self.slots.resize(count, SlotKind::Skip);
        }
    }

    pub fn count(&self, pred: impl Fn(&SlotKind) -> bool) -> usize {
        self.slots.iter().filter(|s| pred(s)).count()
    }

    /// Compute the value shape, returning problems found along the way.
    pub fn shape(&self, has_declared_type: bool) -> (ValueShape, Vec<String>) {
        let mut problems = Vec::new();
        let propagate = self.count(|s| matches!(s, SlotKind::Propagate));
        let strings = self.count(|s| matches!(s, SlotKind::Str));
        let arrays = self.count(|s| matches!(s, SlotKind::Array));
        let objects = self.count(|s| matches!(s, SlotKind::Named(_) | SlotKind::Inherit));

        if propagate > 1 {
            problems.push(format!("{propagate} propagate slots; at most one is allowed"));
        }
        if strings > 0 && (propagate + arrays + objects) > 0 {
            problems.push("string slots cannot be mixed with other value slots".to_string());
            return (ValueShape::String, problems);
        }
        if arrays > 0 {
            if objects > 0 || has_declared_type {
                problems.push("array slots need a list value; use a named slot on typed rules".to_string());
            }
            return (ValueShape::List, problems);
        }
        if objects > 0 || (has_declared_type && propagate == 0) {
            return (ValueShape::Object, problems);
        }
        if propagate > 0 {
            return (ValueShape::Propagate, problems);
        }
        if strings > 0 {
            return (ValueShape::String, problems);
        }
        (ValueShape::Null, problems)
    }
}

/// Declared result type of a composite, with its name for display
#[derive(Debug, Clone)]
pub struct DeclaredType {
    pub id: TypeId,
    pub name: SmolStr,
}

impl DeclaredType {
    pub fn instantiate(&self) -> ObjectRef {
        ObjectRef::new(Object::new(Some(self.id), Some(self.name.clone())))
    }
}

/// Assembles one composite match's value from its children.
///
/// Objects are only instantiated in [`ValueBuilder::finish`], once, and only
/// if a propagated child did not already supply one.
pub(crate) struct ValueBuilder<'a> {
    shape: ValueShape,
    declared: Option<&'a DeclaredType>,
    propagated: Option<Value>,
    string: String,
    list: Vec<Value>,
    assignments: Vec<(SmolStr, Value)>,
    inherited: Vec<ObjectRef>,
}

impl<'a> ValueBuilder<'a> {
    pub fn new(shape: ValueShape, declared: Option<&'a DeclaredType>) -> Self {
        Self {
            shape,
            declared,
            propagated: None,
            string: String::new(),
            list: Vec::new(),
            assignments: Vec::new(),
            inherited: Vec::new(),
        }
    }

    /// Apply one child's result through its slot.
    pub fn add(&mut self, slot: &SlotKind, value: Value, text: &str) {
        match slot {
            SlotKind::Skip => {}
            SlotKind::Propagate => self.propagated = Some(value),
            SlotKind::Str => self.string.push_str(text),
            SlotKind::Array => match value {
                Value::List(items) => self.list.extend(items),
                Value::Null => {}
                other => self.list.push(other),
            },
            SlotKind::Inherit => match value {
                Value::Object(obj) => self.inherited.push(obj),
                Value::List(items) => self.list.extend(items),
                Value::Str(s) => self.string.push_str(&s),
                Value::Null => {}
            },
            SlotKind::Named(name) => {
                if !value.is_null() {
                    self.assignments.push((name.clone(), value));
                }
            }
        }
    }

    pub fn finish(self) -> Value {
        match self.shape {
            ValueShape::Null => match self.declared {
                Some(declared) => Value::Object(declared.instantiate()),
                None => Value::Null,
            },
            ValueShape::String => Value::Str(SmolStr::from(self.string)),
            ValueShape::List => {
                let mut items = match self.propagated {
                    Some(Value::List(items)) => items,
                    Some(Value::Null) | None => Vec::new(),
                    Some(other) => vec![other],
                };
                items.extend(self.list);
                Value::List(items)
            }
            ValueShape::Propagate => match self.propagated {
                Some(value) if !value.is_null() => value,
                _ => self
                    .declared
                    .map(|d| Value::Object(d.instantiate()))
                    .unwrap_or(Value::Null),
            },
            ValueShape::Object => {
                let target = match self.propagated {
                    Some(Value::Object(obj)) => obj,
                    _ => match self.declared {
                        Some(declared) => declared.instantiate(),
                        None => ObjectRef::new(Object::anonymous()),
                    },
                };
                {
                    let mut target_mut = target.borrow_mut();
                    for inherited in &self.inherited {
                        if inherited.ptr_eq(&target) {
                            continue;
                        }
                        let source = inherited.borrow();
                        target_mut.adopt_type(
                            source.type_id(),
                            source.type_name().map(SmolStr::new),
                        );
                        for (key, value) in source.properties() {
                            target_mut.set_slot(key, value.clone());
                        }
                    }
                    for (name, value) in self.assignments {
                        target_mut.set_slot(&name, value);
                    }
                }
                Value::Object(target)
            }
        }
    }
}
