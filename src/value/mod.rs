//! Semantic values produced by grammar rules.
//!
//! A parse yields a tree of [`Value`]s alongside the parse-node tree. Objects
//! are shared (`Rc<RefCell<..>>`) so a program can mutate them and ask the
//! generator to write the changes back as text. Each object keeps a weak
//! handle to the one parse node currently authoritative for it; the parse
//! tree owns the strong references.

mod types;

#[cfg(test)]
mod tests;

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::tree::{ParseNode, ParseNodeRef};
pub use types::{TypeId, TypeRegistry, ValueType};

/// Named property access on a semantic object.
///
/// This is the only way the engine reads or writes `NAMED_SLOT` mappings.
pub trait SlotAccess {
    /// Current value of `slot`, `Value::Null` when unset
    fn get_slot(&self, slot: &str) -> Value;

    fn set_slot(&mut self, slot: &str, value: Value);

    /// Declared type, if any
    fn slot_type(&self) -> Option<TypeId>;
}

/// A semantic value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Str(SmolStr),
    List(Vec<Value>),
    Object(ObjectRef),
}

impl Value {
    pub fn str(text: impl Into<SmolStr>) -> Self {
        Value::Str(text.into())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Property of an object value, `Null` for anything else
    pub fn get(&self, slot: &str) -> Value {
        match self {
            Value::Object(obj) => obj.borrow().get_slot(slot),
            _ => Value::Null,
        }
    }

    /// The runtime type of this value, for generation compatibility checks.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Any,
            Value::Str(_) => ValueType::String,
            Value::List(_) => ValueType::List,
            Value::Object(obj) => obj
                .borrow()
                .type_id()
                .map(ValueType::Object)
                .unwrap_or(ValueType::Any),
        }
    }

    /// True if the value carries no content (null, empty string or list)
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Str(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Object(_) => false,
        }
    }

    /// Identity for objects, structural equality otherwise
    pub fn same_instance(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => self == other,
        }
    }

    /// Record `node` as the authoritative parse node of this value (objects only)
    pub(crate) fn bind_parse_node(&self, node: &ParseNodeRef) {
        if let Value::Object(obj) = self {
            obj.borrow_mut().parse_node = Some(Rc::downgrade(node));
        }
    }
}

/// Structural equality: types and properties, ignoring parse-node handles.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                a.ptr_eq(b) || {
                    let (a, b) = (a.borrow(), b.borrow());
                    a.type_id == b.type_id && a.props == b.props
                }
            }
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Str(SmolStr::new(text))
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Str(SmolStr::from(text))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Str(s) => write!(f, "{:?}", s.as_str()),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Object(obj) => {
                let obj = obj.borrow();
                let mut map = f.debug_map();
                if let Some(name) = &obj.type_name {
                    map.entry(&"@type", &name.as_str());
                }
                for (key, value) in &obj.props {
                    map.entry(&key.as_str(), value);
                }
                map.finish()
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A semantic object: a declared type plus ordered named properties.
#[derive(Default)]
pub struct Object {
    type_id: Option<TypeId>,
    type_name: Option<SmolStr>,
    props: IndexMap<SmolStr, Value>,
    parse_node: Option<Weak<ParseNode>>,
}

impl Object {
    pub fn new(type_id: Option<TypeId>, type_name: Option<SmolStr>) -> Self {
        Self {
            type_id,
            type_name,
            ..Self::default()
        }
    }

    /// An object without a declared type
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn type_id(&self) -> Option<TypeId> {
        self.type_id
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn get(&self, slot: &str) -> Value {
        self.props.get(slot).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, slot: &str, value: impl Into<Value>) {
        self.props.insert(SmolStr::new(slot), value.into());
    }

    pub fn remove(&mut self, slot: &str) -> Option<Value> {
        self.props.shift_remove(slot)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn property_count(&self) -> usize {
        self.props.len()
    }

    /// The parse node currently authoritative for this object, if still alive
    pub fn parse_node(&self) -> Option<ParseNodeRef> {
        self.parse_node.as_ref().and_then(Weak::upgrade)
    }

    /// Adopt the declared type of another object when this one has none
    pub(crate) fn adopt_type(&mut self, type_id: Option<TypeId>, type_name: Option<SmolStr>) {
        if self.type_id.is_none() {
            self.type_id = type_id;
            self.type_name = type_name;
        }
    }
}

impl SlotAccess for Object {
    fn get_slot(&self, slot: &str) -> Value {
        self.get(slot)
    }

    fn set_slot(&mut self, slot: &str, value: Value) {
        self.set(slot, value);
    }

    fn slot_type(&self) -> Option<TypeId> {
        self.type_id
    }
}

/// Shared, mutable handle to an [`Object`]
#[derive(Clone, Default)]
pub struct ObjectRef(Rc<RefCell<Object>>);

impl ObjectRef {
    pub fn new(object: Object) -> Self {
        Self(Rc::new(RefCell::new(object)))
    }

    pub fn borrow(&self) -> Ref<'_, Object> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Object> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Shorthand for `borrow().get(slot)`
    pub fn get(&self, slot: &str) -> Value {
        self.0.borrow().get(slot)
    }

    /// Shorthand for `borrow_mut().set(slot, value)`
    pub fn set(&self, slot: &str, value: impl Into<Value>) {
        self.0.borrow_mut().set(slot, value);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&Value::Object(self.clone()), f)
    }
}
