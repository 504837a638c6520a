//! Execution cache keyed by program identity

use super::Execution;
use rustc_hash::FxHashMap;

/// Cache of execution records, keyed by program identity.
///
/// Owned by a single engine; entries are discarded explicitly when the
/// owning round releases its seed.
#[derive(Debug, Default)]
pub struct ExecutionCache {
    entries: FxHashMap<u64, Execution>,
}

impl ExecutionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        ExecutionCache {
            entries: FxHashMap::default(),
        }
    }

    /// Store an execution for the given program identity.
    pub fn insert(&mut self, program_id: u64, execution: Execution) {
        self.entries.insert(program_id, execution);
    }

    /// Look up an execution by program identity.
    pub fn get(&self, program_id: u64) -> Option<&Execution> {
        self.entries.get(&program_id)
    }

    /// Discard the entry for the given program identity.
    pub fn remove(&mut self, program_id: u64) -> Option<Execution> {
        self.entries.remove(&program_id)
    }

    /// Discard all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
