// ABOUTME: Prefix-keyed registry of unsolicited result code (URC) handlers
// ABOUTME: Every matching entry fires, in registration order, outside the registry lock

use std::sync::{Arc, PoisonError, RwLock};

/// Callback invoked with the full unsolicited line
pub type UnsolicitedHandler = Arc<dyn Fn(&str) + Send + Sync>;

struct Entry {
    prefix: String,
    handler: UnsolicitedHandler,
}

#[derive(Default)]
pub struct UnsolicitedRegistry {
    entries: RwLock<Vec<Entry>>,
}

impl UnsolicitedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for lines starting with `prefix` (literal match)
    pub fn register(&self, prefix: impl Into<String>, handler: UnsolicitedHandler) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Entry {
                prefix: prefix.into(),
                handler,
            });
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handlers whose prefix matches `line`, in registration order
    pub fn matching(&self, line: &str) -> Vec<UnsolicitedHandler> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| line.starts_with(&entry.prefix))
            .map(|entry| entry.handler.clone())
            .collect()
    }

    /// Invoke every matching handler; returns how many fired.
    ///
    /// The lock is released before the first call, so a handler may register
    /// further handlers or issue commands on the channel.
    pub fn dispatch(&self, line: &str) -> usize {
        let handlers = self.matching(line);
        for handler in &handlers {
            handler(line);
        }
        handlers.len()
    }
}

impl std::fmt::Debug for UnsolicitedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_list()
            .entries(entries.iter().map(|entry| &entry.prefix))
            .finish()
    }
}
