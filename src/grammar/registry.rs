//! Named grammars, looked up by name or file extension.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use smol_str::SmolStr;
use tracing::debug;

use super::Grammar;

#[derive(Default)]
struct Entries {
    /// Registration order is kept for listing
    by_name: IndexMap<SmolStr, Arc<Grammar>>,
    /// Extension (without the dot) -> grammar name
    by_extension: IndexMap<SmolStr, SmolStr>,
}

/// Shared registry of built grammars.
///
/// Grammars are registered under their own name. A later registration with
/// the same name replaces the earlier one.
#[derive(Default)]
pub struct GrammarRegistry {
    entries: RwLock<Entries>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `grammar` for the given file extensions (`"calc"` or `".calc"`).
    pub fn register(&self, grammar: Grammar, extensions: &[&str]) -> Arc<Grammar> {
        let name = SmolStr::from(grammar.name());
        let grammar = Arc::new(grammar);
        let mut entries = self.entries.write();
        if entries.by_name.insert(name.clone(), grammar.clone()).is_some() {
            debug!(grammar = %name, "replacing registered grammar");
            entries.by_extension.retain(|_, owner| *owner != name);
        }
        for ext in extensions {
            let ext = SmolStr::from(ext.trim_start_matches('.'));
            entries.by_extension.insert(ext, name.clone());
        }
        grammar
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<Grammar>> {
        self.entries.read().by_name.get(name).cloned()
    }

    /// Grammar registered for a file extension, with or without the dot
    pub fn for_extension(&self, extension: &str) -> Option<Arc<Grammar>> {
        let entries = self.entries.read();
        let name = entries.by_extension.get(extension.trim_start_matches('.'))?;
        entries.by_name.get(name).cloned()
    }

    /// Names of the registered grammars, in registration order
    pub fn names(&self) -> Vec<SmolStr> {
        self.entries.read().by_name.keys().cloned().collect()
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<Grammar>> {
        let mut entries = self.entries.write();
        let removed = entries.by_name.shift_remove(name)?;
        entries.by_extension.retain(|_, owner| owner.as_str() != name);
        Some(removed)
    }

    /// Drop every grammar
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.by_name.clear();
        entries.by_extension.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
