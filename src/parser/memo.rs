//! Position-keyed memo table for parselet results.

use rustc_hash::FxHashMap;

use super::MatchResult;
use crate::grammar::ParseletId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MemoKey {
    pub pos: usize,
    pub parselet: ParseletId,
    /// Results differ with error recovery on
    pub recovering: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct MemoEntry {
    pub result: MatchResult,
    pub end: usize,
}

#[derive(Debug, Default)]
pub(crate) struct MemoTable {
    entries: FxHashMap<MemoKey, MemoEntry>,
}

impl MemoTable {
    pub fn get(&self, key: &MemoKey) -> Option<&MemoEntry> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: MemoKey, entry: MemoEntry) {
        self.entries.insert(key, entry);
    }

    pub fn remove(&mut self, key: &MemoKey) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
