/// Revocable byte sources
///
/// Every loaded sound keeps its encoded bytes in memory. The engine hands out an
/// opaque `SourceRef` for them; the reference resolves until it is revoked, after
/// which the store drops its copy of the bytes.
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use serde::Serialize;

/// Shared, immutable encoded audio bytes
#[derive(Clone)]
pub struct SourceBytes(Arc<[u8]>);

impl SourceBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Arc::from(bytes))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Seekable reader over the bytes, without copying them
    pub fn reader(&self) -> Cursor<Arc<[u8]>> {
        Cursor::new(Arc::clone(&self.0))
    }
}

impl AsRef<[u8]> for SourceBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SourceBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceBytes({} bytes)", self.0.len())
    }
}

/// Opaque reference to bytes held by a `SourceStore`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceRef(u64);

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source:{}", self.0)
    }
}

/// Registry of live byte sources
#[derive(Debug, Default)]
pub struct SourceStore {
    sources: HashMap<SourceRef, SourceBytes>,
    next_id: u64,
}

impl SourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and return a reference to them
    pub fn create(&mut self, bytes: SourceBytes) -> SourceRef {
        let source = SourceRef(self.next_id);
        self.next_id += 1;
        self.sources.insert(source, bytes);
        source
    }

    /// Resolve a reference; `None` once it has been revoked
    pub fn resolve(&self, source: SourceRef) -> Option<SourceBytes> {
        self.sources.get(&source).cloned()
    }

    /// Release a reference. Returns false if it was already revoked.
    pub fn revoke(&mut self, source: SourceRef) -> bool {
        let released = self.sources.remove(&source).is_some();
        if released {
            tracing::debug!("Revoked {}", source);
        }
        released
    }

    /// Release every reference
    pub fn revoke_all(&mut self) {
        let count = self.sources.len();
        self.sources.clear();
        if count > 0 {
            tracing::debug!("Revoked {} sources", count);
        }
    }

    /// Number of references that have not been revoked
    pub fn live_count(&self) -> usize {
        self.sources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_resolve() {
        let mut store = SourceStore::new();
        let source = store.create(SourceBytes::new(vec![1, 2, 3]));

        let bytes = store.resolve(source).unwrap();
        assert_eq!(bytes.as_ref(), &[1, 2, 3]);
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let mut store = SourceStore::new();
        let source = store.create(SourceBytes::new(vec![0; 16]));

        assert!(store.revoke(source));
        assert!(!store.revoke(source));
        assert!(store.resolve(source).is_none());
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn test_references_are_unique() {
        let mut store = SourceStore::new();
        let a = store.create(SourceBytes::new(vec![1]));
        let b = store.create(SourceBytes::new(vec![2]));
        assert_ne!(a, b);

        store.revoke_all();
        assert_eq!(store.live_count(), 0);
    }
}
