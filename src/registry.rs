//! Keyed store of live server-held resources.
//!
//! Each registry owns one `HashMap` behind a single lock. Every operation takes
//! the lock exactly once, so a lookup racing an eviction sees the resource
//! either fully live or gone.

use crate::error::{ResourceKind, ToolError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Opaque, unguessable identifier for a registered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(Uuid);

impl Handle {
    fn mint() -> Self {
        Handle(Uuid::new_v4())
    }

    /// Parse a caller-supplied handle. Anything that is not a UUID can never
    /// name a live resource, so it is reported as not found.
    pub fn parse(kind: ResourceKind, raw: &str) -> Result<Self, ToolError> {
        Uuid::parse_str(raw.trim())
            .map(Handle)
            .map_err(|_| ToolError::handle_not_found(kind, raw))
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Thread-safe registry of resources of one kind.
pub struct ResourceRegistry<T> {
    kind: ResourceKind,
    entries: RwLock<HashMap<Handle, Arc<T>>>,
}

impl<T> ResourceRegistry<T> {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Handle, Arc<T>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Handle, Arc<T>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a resource under a freshly minted handle.
    pub fn register(&self, resource: T) -> Handle {
        self.register_with(|_| resource)
    }

    /// Store a resource that needs to know its own handle.
    ///
    /// `build` runs while the registry lock is held, so it must not touch
    /// this registry.
    pub fn register_with(&self, build: impl FnOnce(Handle) -> T) -> Handle {
        let mut entries = self.write();
        let mut handle = Handle::mint();
        while entries.contains_key(&handle) {
            handle = Handle::mint();
        }
        entries.insert(handle, Arc::new(build(handle)));
        handle
    }

    pub fn lookup(&self, handle: &Handle) -> Result<Arc<T>, ToolError> {
        self.read()
            .get(handle)
            .cloned()
            .ok_or_else(|| ToolError::handle_not_found(self.kind, handle.to_string()))
    }

    /// Remove an entry. Absent handles are a no-op so teardown can repeat.
    pub fn evict(&self, handle: &Handle) -> Option<Arc<T>> {
        self.write().remove(handle)
    }

    /// Remove several entries under one lock acquisition.
    pub fn evict_all(&self, handles: &[Handle]) -> Vec<Arc<T>> {
        let mut entries = self.write();
        handles.iter().filter_map(|h| entries.remove(h)).collect()
    }

    pub fn list_where(&self, predicate: impl Fn(&T) -> bool) -> Vec<Handle> {
        self.read()
            .iter()
            .filter(|(_, resource)| predicate(resource))
            .map(|(handle, _)| *handle)
            .collect()
    }

    pub fn handles(&self) -> Vec<Handle> {
        self.read().keys().copied().collect()
    }

    pub fn values(&self) -> Vec<Arc<T>> {
        self.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashSet;

    #[test]
    fn register_then_lookup_returns_same_resource() {
        let registry = ResourceRegistry::new(ResourceKind::Driver);
        let handle = registry.register("first".to_string());
        let a = registry.lookup(&handle).expect("registered");
        let b = registry.lookup(&handle).expect("still registered");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*a, "first");
    }

    #[test]
    fn lookup_after_evict_fails() {
        let registry = ResourceRegistry::new(ResourceKind::Area);
        let handle = registry.register(1u32);
        assert!(registry.evict(&handle).is_some());
        let err = registry.lookup(&handle).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandleNotFound);
        assert!(registry.is_empty());
    }

    #[test]
    fn double_evict_is_a_noop() {
        let registry = ResourceRegistry::new(ResourceKind::Area);
        let handle = registry.register(1u32);
        assert!(registry.evict(&handle).is_some());
        assert!(registry.evict(&handle).is_none());
    }

    #[test]
    fn register_with_sees_its_handle() {
        let registry = ResourceRegistry::new(ResourceKind::Driver);
        let handle = registry.register_with(|h| h);
        assert_eq!(*registry.lookup(&handle).unwrap(), handle);
    }

    #[test]
    fn list_where_filters_by_predicate() {
        let registry = ResourceRegistry::new(ResourceKind::Area);
        let even = registry.register(2u32);
        let _odd = registry.register(3u32);
        let also_even = registry.register(4u32);
        let found: HashSet<_> = registry.list_where(|v| v % 2 == 0).into_iter().collect();
        assert_eq!(found, HashSet::from([even, also_even]));
    }

    #[test]
    fn parse_rejects_garbage_as_not_found() {
        let err = Handle::parse(ResourceKind::Driver, "not-a-handle").unwrap_err();
        assert_eq!(
            err,
            ToolError::handle_not_found(ResourceKind::Driver, "not-a-handle")
        );
    }

    #[test]
    fn handle_round_trips_through_display() {
        let registry = ResourceRegistry::new(ResourceKind::Driver);
        let handle = registry.register(());
        let parsed = Handle::parse(ResourceKind::Driver, &handle.to_string()).unwrap();
        assert_eq!(parsed, handle);
    }

    #[test]
    fn concurrent_registration_loses_nothing() {
        let registry = Arc::new(ResourceRegistry::new(ResourceKind::Area));
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    (0..50).map(|i| registry.register(t * 100 + i)).collect::<Vec<_>>()
                })
            })
            .collect();
        let handles: HashSet<Handle> = threads
            .into_iter()
            .flat_map(|t| t.join().expect("thread"))
            .collect();
        assert_eq!(handles.len(), 400);
        assert_eq!(registry.len(), 400);
    }
}
