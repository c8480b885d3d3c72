//! Closed set of value types declared by a grammar.
//!
//! Types form a forest: each declared type may name a parent (its enclosing
//! variant group). Assignability and common-supertype queries walk these
//! lineages; there is no runtime reflection.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// Index of a type declared in a [`TypeRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct TypeDecl {
    name: SmolStr,
    parent: Option<TypeId>,
}

/// The value type a parselet produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    /// Not statically known; compatible with everything
    #[default]
    Any,
    /// Token text or concatenated string slots
    String,
    /// Ordered list (array slots, repeat results)
    List,
    /// An object of a declared type (or one of its descendants)
    Object(TypeId),
}

/// Registry of grammar-declared value types.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    decls: Vec<TypeDecl>,
    by_name: FxHashMap<SmolStr, TypeId>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a type, or return the existing id if the name is taken.
    ///
    /// Re-declaring with a different parent keeps the first declaration and
    /// returns `Err` with the existing id so the caller can report it.
    pub fn declare(&mut self, name: &str, parent: Option<TypeId>) -> Result<TypeId, TypeId> {
        if let Some(&existing) = self.by_name.get(name) {
            if self.decls[existing.index()].parent != parent && parent.is_some() {
                return Err(existing);
            }
            return Ok(existing);
        }
        let id = TypeId(self.decls.len() as u32);
        self.decls.push(TypeDecl {
            name: SmolStr::new(name),
            parent,
        });
        self.by_name.insert(SmolStr::new(name), id);
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: TypeId) -> &str {
        self.decls
            .get(id.index())
            .map(|d| d.name.as_str())
            .unwrap_or("<unknown>")
    }

    pub fn parent(&self, id: TypeId) -> Option<TypeId> {
        self.decls.get(id.index()).and_then(|d| d.parent)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// `id` followed by each of its ancestors, nearest first
    pub fn lineage(&self, id: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        let mut next = Some(id);
        std::iter::from_fn(move || {
            let current = next?;
            next = self.parent(current);
            // Guard against a parent chain that loops back on itself
            if next == Some(id) {
                next = None;
            }
            Some(current)
        })
    }

    /// True if a value of type `from` may be used where `target` is expected
    pub fn is_assignable(&self, target: TypeId, from: TypeId) -> bool {
        self.lineage(from).any(|t| t == target)
    }

    /// Smallest declared type both `a` and `b` are assignable to.
    pub fn common_super_type(&self, a: TypeId, b: TypeId) -> Option<TypeId> {
        self.lineage(a).find(|&candidate| self.is_assignable(candidate, b))
    }

    /// Join two parselet value types the way a choice does for its alternatives.
    ///
    /// Returns `Err` when both are object types without a common ancestor.
    pub fn join(&self, a: ValueType, b: ValueType) -> Result<ValueType, (TypeId, TypeId)> {
        match (a, b) {
            (ValueType::Any, _) | (_, ValueType::Any) => Ok(ValueType::Any),
            (ValueType::Object(x), ValueType::Object(y)) => self
                .common_super_type(x, y)
                .map(ValueType::Object)
                .ok_or((x, y)),
            (x, y) if x == y => Ok(x),
            _ => Ok(ValueType::Any),
        }
    }

    /// True if a value described by `actual` fits a slot typed `expected`.
    pub fn accepts(&self, expected: ValueType, actual: ValueType) -> bool {
        match (expected, actual) {
            (ValueType::Any, _) | (_, ValueType::Any) => true,
            (ValueType::Object(target), ValueType::Object(from)) => self.is_assignable(target, from),
            (x, y) => x == y,
        }
    }
}
