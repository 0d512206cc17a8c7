//! Append-only per-path store backing stateful routes.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

/// Bodies recorded by stateful mutations, keyed by normalized request path.
///
/// Owned by one server instance and never cleared by a reload.
#[derive(Debug, Default)]
pub struct StateStore {
    entries: Mutex<HashMap<String, Vec<Value>>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a body to a path's log, creating it if absent.
    ///
    /// Returns the log length after the append.
    pub fn append(&self, path: &str, body: Value) -> usize {
        let mut entries = self.entries.lock();
        let log = entries.entry(path.to_string()).or_default();
        log.push(body);
        log.len()
    }

    /// Copy of a path's log, if anything has been recorded for it.
    pub fn snapshot(&self, path: &str) -> Option<Vec<Value>> {
        self.entries.lock().get(path).cloned()
    }

    /// Number of paths with recorded state.
    #[cfg(test)]
    pub(crate) fn path_count(&self) -> usize {
        self.entries.lock().len()
    }
}
