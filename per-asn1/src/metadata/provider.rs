//! Metadata resolution

use super::types::{TypeMetadata, TypeRef};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Resolves [`TypeRef`]s to metadata
///
/// Providers are shared between codec instances and threads, so they must be
/// `Send + Sync`. A provider must return equivalent metadata for the same
/// reference on every call.
pub trait MetadataProvider: Send + Sync {
    fn resolve(&self, ty: &TypeRef) -> Arc<TypeMetadata>;
}

/// Provider that builds metadata once per type and then serves it read-only
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: RwLock<HashMap<TypeId, Arc<TypeMetadata>>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of types resolved so far
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataProvider for MetadataCache {
    fn resolve(&self, ty: &TypeRef) -> Arc<TypeMetadata> {
        let (id, build) = match ty {
            TypeRef::Inline(metadata) => return Arc::clone(metadata),
            TypeRef::Static { id, build, .. } => (*id, *build),
        };

        if let Some(found) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Arc::clone(found);
        }

        // Built outside the lock: a builder may resolve other types.
        let built = Arc::new(build());
        log::trace!("Caching metadata for {}", ty.name());
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(id).or_insert(built))
    }
}

/// Provider that rebuilds metadata on every lookup
#[derive(Debug, Default, Clone, Copy)]
pub struct UncachedProvider;

impl MetadataProvider for UncachedProvider {
    fn resolve(&self, ty: &TypeRef) -> Arc<TypeMetadata> {
        match ty {
            TypeRef::Inline(metadata) => Arc::clone(metadata),
            TypeRef::Static { build, .. } => Arc::new(build()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_populates_once() {
        let cache = MetadataCache::new();
        assert!(cache.is_empty());

        let first = cache.resolve(&TypeRef::of::<u8>());
        let second = cache.resolve(&TypeRef::of::<u8>());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.resolve(&TypeRef::of::<String>());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_inline_metadata_is_not_cached() {
        let cache = MetadataCache::new();
        let inline = TypeRef::inline(TypeMetadata::boolean("Flag"));
        let resolved = cache.resolve(&inline);
        assert_eq!(resolved.name(), "Flag");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_shared_across_threads() {
        let cache = Arc::new(MetadataCache::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.resolve(&TypeRef::of::<u16>()).name().to_string())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "INTEGER");
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_uncached_matches_cache() {
        let cached = MetadataCache::new().resolve(&TypeRef::of::<u32>());
        let fresh = UncachedProvider.resolve(&TypeRef::of::<u32>());
        assert_eq!(cached.name(), fresh.name());
        assert_eq!(cached.constraint(), fresh.constraint());
    }
}
