//! Read-only property store for field injection
//!
//! The store is a flat map from dotted string key to value, assembled by
//! whatever configuration loader the application uses and handed to the
//! assembler as-is. It is immutable once built and shared read-only.

use ahash::AHashMap;
use std::any::Any;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Immutable flat mapping from string key to an erased value.
///
/// # Examples
///
/// ```rust
/// use bindery::PropertyStore;
///
/// let props = PropertyStore::builder()
///     .set("db.url", "postgres://localhost".to_string())
///     .set("db.pool_size", 16usize)
///     .build();
///
/// assert_eq!(props.get::<usize>("db.pool_size"), Some(16));
/// assert!(props.get::<String>("db.missing").is_none());
/// ```
#[derive(Clone, Default)]
pub struct PropertyStore {
    values: Arc<AHashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl PropertyStore {
    /// Create an empty store.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a store.
    #[inline]
    pub fn builder() -> PropertyStoreBuilder {
        PropertyStoreBuilder::default()
    }

    /// Whether the key is present (regardless of value type).
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Borrow the value for `key` as `T`, if present and of that type.
    #[inline]
    pub fn get_ref<T: 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Clone the value for `key` as `T`, if present and of that type.
    #[inline]
    pub fn get<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        self.get_ref::<T>(key).cloned()
    }

    /// Raw erased value for `key`. Lets callers distinguish a missing key
    /// from a value of an unexpected type.
    #[inline]
    pub(crate) fn raw(&self, key: &str) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.values.get(key)
    }

    /// Number of stored properties.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the store holds no properties.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for PropertyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyStore")
            .field("count", &self.len())
            .finish()
    }
}

/// Builder for a [`PropertyStore`].
///
/// Setting the same key twice keeps the latest value.
#[derive(Default)]
pub struct PropertyStoreBuilder {
    values: AHashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl PropertyStoreBuilder {
    /// Store a value under a dotted key.
    pub fn set<T: Send + Sync + 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.values.insert(key.into(), Arc::new(value));
        self
    }

    /// Finish building; the resulting store is immutable.
    pub fn build(self) -> PropertyStore {
        #[cfg(feature = "logging")]
        debug!(
            target: "bindery",
            property_count = self.values.len(),
            "Property store built"
        );

        PropertyStore {
            values: Arc::new(self.values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_lookup() {
        let props = PropertyStore::builder()
            .set("app.name", "bindery".to_string())
            .set("app.workers", 4u32)
            .build();

        assert_eq!(props.get_ref::<String>("app.name").unwrap(), "bindery");
        assert_eq!(props.get::<u32>("app.workers"), Some(4));
    }

    #[test]
    fn test_missing_key() {
        let props = PropertyStore::empty();
        assert!(!props.contains("nope"));
        assert!(props.get::<u32>("nope").is_none());
        assert!(props.raw("nope").is_none());
    }

    #[test]
    fn test_wrong_type_is_none_but_key_present() {
        let props = PropertyStore::builder().set("n", 1u32).build();

        assert!(props.contains("n"));
        assert!(props.raw("n").is_some());
        assert!(props.get::<String>("n").is_none());
    }

    #[test]
    fn test_last_set_wins() {
        let props = PropertyStore::builder()
            .set("n", 1u32)
            .set("n", 2u32)
            .build();

        assert_eq!(props.get::<u32>("n"), Some(2));
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn test_structured_values() {
        let props = PropertyStore::builder()
            .set("pair", ('a', 'z'))
            .set("hosts", vec!["a".to_string(), "b".to_string()])
            .build();

        assert_eq!(props.get::<(char, char)>("pair"), Some(('a', 'z')));
        assert_eq!(props.get_ref::<Vec<String>>("hosts").unwrap().len(), 2);
    }
}
