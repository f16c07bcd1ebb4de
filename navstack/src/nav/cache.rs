use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::nav::{Popup, Screen, ScreenKind};

/// Anything the cache can key by screen kind and compare by instance
pub trait CacheEntry: Clone {
    fn cache_kind(&self) -> ScreenKind;
    fn cache_id(&self) -> Uuid;
}

impl CacheEntry for Arc<Screen> {
    fn cache_kind(&self) -> ScreenKind {
        self.kind()
    }

    fn cache_id(&self) -> Uuid {
        self.id()
    }
}

impl CacheEntry for Arc<Popup> {
    fn cache_kind(&self) -> ScreenKind {
        self.screen().kind()
    }

    fn cache_id(&self) -> Uuid {
        self.screen().id()
    }
}

/// At most one live instance per screen kind.
///
/// The cache never consults eligibility itself; callers check the cache
/// predicate before calling [`PageCache::put`].
#[derive(Debug)]
pub struct PageCache<E> {
    entries: HashMap<ScreenKind, E>,
}

impl<E> Default for PageCache<E> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<E: CacheEntry> PageCache<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ScreenKind) -> Option<E> {
        self.entries.get(&kind).cloned()
    }

    /// Insert, returning the previous entry of the same kind if it was a different instance
    pub fn put(&mut self, entry: E) -> Option<E> {
        let id = entry.cache_id();
        self.entries
            .insert(entry.cache_kind(), entry)
            .filter(|previous| previous.cache_id() != id)
    }

    /// Remove `entry` only if it is the cached instance of its kind
    pub fn remove_instance(&mut self, entry: &E) -> Option<E> {
        if self.holds(entry) {
            self.entries.remove(&entry.cache_kind())
        } else {
            None
        }
    }

    /// True if `entry` is the cached instance of its kind
    pub fn holds(&self, entry: &E) -> bool {
        self.entries
            .get(&entry.cache_kind())
            .is_some_and(|cached| cached.cache_id() == entry.cache_id())
    }

    /// Remove every entry matching `filter` except those `keep` protects.
    ///
    /// Returns the removed entries; the caller disposes them.
    pub fn evict(&mut self, filter: Option<ScreenKind>, keep: impl Fn(&E) -> bool) -> Vec<E> {
        let doomed: Vec<ScreenKind> = self
            .entries
            .iter()
            .filter(|(kind, entry)| filter.is_none_or(|wanted| wanted == **kind) && !keep(entry))
            .map(|(kind, _)| *kind)
            .collect();

        doomed
            .into_iter()
            .filter_map(|kind| self.entries.remove(&kind))
            .collect()
    }

    pub fn kinds(&self) -> Vec<ScreenKind> {
        let mut kinds: Vec<ScreenKind> = self.entries.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    struct Entry(ScreenKind, Uuid);

    impl CacheEntry for Entry {
        fn cache_kind(&self) -> ScreenKind {
            self.0
        }

        fn cache_id(&self) -> Uuid {
            self.1
        }
    }

    const HOME: ScreenKind = ScreenKind::new("home");
    const DETAIL: ScreenKind = ScreenKind::new("detail");

    #[test]
    fn test_put_replaces_same_kind() {
        let mut cache = PageCache::new();
        let first = Entry(HOME, Uuid::new_v4());
        let second = Entry(HOME, Uuid::new_v4());

        assert!(cache.put(first.clone()).is_none());
        // Re-inserting the same instance is not a replacement
        assert!(cache.put(first.clone()).is_none());

        let replaced = cache.put(second.clone()).unwrap();
        assert_eq!(replaced.1, first.1);
        assert_eq!(cache.len(), 1);
        assert!(cache.holds(&second));
        assert!(!cache.holds(&first));
    }

    #[test]
    fn test_evict_spares_kept_entry() {
        let mut cache = PageCache::new();
        let home = Entry(HOME, Uuid::new_v4());
        let detail = Entry(DETAIL, Uuid::new_v4());
        cache.put(home.clone());
        cache.put(detail.clone());

        let on_screen = home.1;
        let evicted = cache.evict(None, |entry| entry.1 == on_screen);

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].0, DETAIL);
        assert_eq!(cache.kinds(), vec![HOME]);
    }

    #[test]
    fn test_evict_with_filter() {
        let mut cache = PageCache::new();
        cache.put(Entry(HOME, Uuid::new_v4()));
        cache.put(Entry(DETAIL, Uuid::new_v4()));

        let evicted = cache.evict(Some(DETAIL), |_| false);
        assert_eq!(evicted.len(), 1);
        assert_eq!(cache.kinds(), vec![HOME]);
    }
}
