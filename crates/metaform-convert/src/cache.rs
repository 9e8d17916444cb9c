//! Parsed-XML cache
//!
//! One [`XmlCache`] lives for exactly one `finalize` call. Entries are keyed
//! by the backing file and the component's full name, and loads are
//! coalesced: concurrent requests for the same uncached key wait on a single
//! parse instead of racing to read the file twice.

use crate::error::{ConvertError, ConvertResult};
use metaform_component::MetadataComponent;
use metaform_document::JsonMap;
use moka::future::Cache;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Cache key: backing file plus component full name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// XML file the document was parsed from
    pub path: PathBuf,
    /// Full name of the component that owns the file
    pub full_name: String,
}

impl CacheKey {
    /// Key for a component's own XML
    #[must_use]
    pub fn for_component(component: &MetadataComponent) -> Self {
        Self {
            path: component.xml_path().to_path_buf(),
            full_name: component.full_name().to_string(),
        }
    }
}

/// Per-finalize cache of parsed component documents
#[derive(Debug, Clone)]
pub struct XmlCache {
    inner: Cache<CacheKey, Arc<JsonMap>>,
    loads: Arc<AtomicUsize>,
}

impl XmlCache {
    /// Create cache with max capacity
    ///
    /// Entries evicted to honour the bound are parsed again on next request.
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create cache that never evicts
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            inner: Cache::builder().build(),
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Parsed XML of `component`, loading it on first request
    ///
    /// # Errors
    /// Returns `ConvertError::CacheLoad` if the component cannot be read or parsed
    pub async fn get_or_load(&self, component: &MetadataComponent) -> ConvertResult<Arc<JsonMap>> {
        let loads = Arc::clone(&self.loads);
        self.inner
            .try_get_with(CacheKey::for_component(component), async move {
                loads.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(
                    full_name = component.full_name(),
                    path = %component.xml_path().display(),
                    "parsing component xml"
                );
                component.parse_xml().await.map(Arc::new)
            })
            .await
            .map_err(|source| ConvertError::CacheLoad {
                full_name: component.full_name().to_string(),
                type_name: component.type_().name.clone(),
                source,
            })
    }

    /// Check if a component's document is cached
    #[must_use]
    pub async fn contains(&self, component: &MetadataComponent) -> bool {
        self.inner.get(&CacheKey::for_component(component)).await.is_some()
    }

    /// Number of loads performed (cache misses)
    #[inline]
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    /// Capacity bound, `None` when unbounded
    #[inline]
    #[must_use]
    pub fn max_capacity(&self) -> Option<u64> {
        self.inner.policy().max_capacity()
    }

    /// Get approximate entry count
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for XmlCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metaform_component::VirtualTreeContainer;
    use metaform_registry::Registry;
    use std::path::Path;

    const PATH: &str = "objects/Account/Account.object-meta.xml";

    fn account(tree: &Arc<VirtualTreeContainer>) -> MetadataComponent {
        let ty = Registry::with_defaults().unwrap().get_type_by_name("CustomObject").unwrap();
        MetadataComponent::resolved("Account", ty, PATH, tree.clone())
    }

    #[tokio::test]
    async fn loads_each_key_once() {
        let tree = Arc::new(VirtualTreeContainer::new().with_file(
            PATH,
            "<CustomObject><label>Account</label></CustomObject>",
        ));
        let cache = XmlCache::default();
        let component = account(&tree);

        let first = cache.get_or_load(&component).await.unwrap();
        let second = cache.get_or_load(&component).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.load_count(), 1);
        assert_eq!(tree.read_count(Path::new(PATH)), 1);
        assert!(cache.contains(&component).await);
    }

    #[tokio::test]
    async fn concurrent_requests_coalesce() {
        let tree = Arc::new(VirtualTreeContainer::new().with_file(PATH, "<CustomObject/>"));
        let cache = XmlCache::default();
        let component = account(&tree);

        let loads = (0..8).map(|_| cache.get_or_load(&component));
        let results = futures::future::join_all(loads).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(tree.read_count(Path::new(PATH)), 1);
    }

    #[tokio::test]
    async fn default_cache_keeps_every_document() {
        let registry = Registry::with_defaults().unwrap();
        let ty = registry.get_type_by_name("CustomField").unwrap();
        let mut tree = VirtualTreeContainer::new();
        for i in 0..200 {
            tree.insert(format!("fields/F{i}.field-meta.xml"), "<CustomField/>");
        }
        let tree = Arc::new(tree);
        let fields: Vec<_> = (0..200)
            .map(|i| {
                MetadataComponent::resolved(
                    format!("Account.F{i}"),
                    ty.clone(),
                    format!("fields/F{i}.field-meta.xml"),
                    tree.clone(),
                )
            })
            .collect();

        let cache = XmlCache::default();
        assert_eq!(cache.max_capacity(), None);
        for _ in 0..2 {
            for field in &fields {
                cache.get_or_load(field).await.unwrap();
            }
        }

        assert_eq!(cache.load_count(), 200);
        assert_eq!(tree.total_reads(), 200);
    }

    #[test]
    fn bounded_cache_reports_capacity() {
        assert_eq!(XmlCache::new(32).max_capacity(), Some(32));
    }

    #[tokio::test]
    async fn load_errors_surface() {
        let tree = Arc::new(VirtualTreeContainer::new());
        let cache = XmlCache::default();

        let err = cache.get_or_load(&account(&tree)).await.unwrap_err();
        assert!(matches!(
            err,
            ConvertError::CacheLoad { ref full_name, ref type_name, .. }
                if full_name == "Account" && type_name == "CustomObject"
        ));
        assert!(err.to_string().starts_with("failed to load xml of CustomObject 'Account': "));
    }
}
