//! Shared mapping from report message id to running process group.
//!
//! The registry is the only state shared between concurrent executions and
//! the dispatcher's cancellation path. Every operation takes the lock just
//! for the map access itself; callers must not perform I/O while holding it.
//! The registry is built once at startup and handed around by `Arc` rather
//! than living in a process-wide global.

use crate::{launcher::ProcessGroup, messenger::MessageId};
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

#[derive(Debug, Default)]
pub struct ProcessRegistry {
    entries: Mutex<HashMap<MessageId, ProcessGroup>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<MessageId, ProcessGroup>> {
        // Held only for map operations; recover the map if a holder panicked.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert an entry. Silently overwrites if `id` is already present; the
    /// platform guarantees message ids are unique, so that should not occur.
    pub fn register(&self, id: MessageId, group: ProcessGroup) {
        self.entries().insert(id, group);
    }

    pub fn lookup(&self, id: &str) -> Option<ProcessGroup> {
        self.entries().get(id).copied()
    }

    /// Remove an entry; a no-op for unknown ids.
    pub fn unregister(&self, id: &str) {
        self.entries().remove(id);
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_lookup_unregister() {
        let registry = ProcessRegistry::new();
        assert!(registry.is_empty());

        registry.register("1700.000001".to_string(), ProcessGroup(41));
        registry.register("1700.000002".to_string(), ProcessGroup(41));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("1700.000001"), Some(ProcessGroup(41)));
        assert_eq!(registry.lookup("1700.999999"), None);

        registry.unregister("1700.000001");
        assert_eq!(registry.lookup("1700.000001"), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_unknown_id_is_noop() {
        let registry = ProcessRegistry::new();
        registry.register("1700.000001".to_string(), ProcessGroup(7));
        registry.unregister("not-registered");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_overwrites_silently() {
        let registry = ProcessRegistry::new();
        registry.register("1700.000001".to_string(), ProcessGroup(1));
        registry.register("1700.000001".to_string(), ProcessGroup(2));
        assert_eq!(registry.lookup("1700.000001"), Some(ProcessGroup(2)));
        assert_eq!(registry.len(), 1);
    }
}
