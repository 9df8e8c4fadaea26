use std::sync::{Arc, Mutex, Weak};

use crate::settings::CacheStrength;
use crate::utils::{sync, FastHashMap};

enum Entry<T> {
    Strong(Arc<T>),
    Weak(Weak<T>),
}

impl<T> Entry<T> {
    fn get(&self) -> Option<Arc<T>> {
        match *self {
            Entry::Strong(ref v) => Some(v.clone()),
            Entry::Weak(ref v) => v.upgrade(),
        }
    }

    fn strength(&self) -> CacheStrength {
        match *self {
            Entry::Strong(_) => CacheStrength::Strong,
            Entry::Weak(_) => CacheStrength::Weak,
        }
    }

    /// Whether anything besides the cache holds the object.
    fn is_referenced(&self) -> bool {
        match *self {
            Entry::Strong(ref v) => Arc::strong_count(v) > 1,
            Entry::Weak(ref v) => v.upgrade().is_some(),
        }
    }
}

/// A named, thread-safe cache of shared objects.
///
/// The strength of an entry is fixed when it is inserted. Strong entries pin their object;
/// weak ones vanish once the last outside reference is dropped.
pub struct ObjectCache<T> {
    kind: &'static str,
    entries: Mutex<FastHashMap<String, Entry<T>>>,
}

impl<T> ObjectCache<T> {
    pub fn new(kind: &'static str) -> Self {
        ObjectCache {
            kind,
            entries: Mutex::new(FastHashMap::default()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        let mut entries = sync::lock(&self.entries);
        let v = entries.get(name).and_then(|v| v.get());
        if v.is_none() {
            entries.remove(name);
        }
        v
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Inserts `value` under `name`. A live entry of the same name is kept, strength included,
    /// and returned instead.
    pub fn insert<N: Into<String>>(&self, name: N, value: Arc<T>, strength: CacheStrength) -> Arc<T> {
        let name = name.into();
        let mut entries = sync::lock(&self.entries);

        if let Some(v) = entries.get(&name).and_then(|v| v.get()) {
            return v;
        }

        let entry = match strength {
            CacheStrength::Strong => Entry::Strong(value.clone()),
            CacheStrength::Weak => Entry::Weak(Arc::downgrade(&value)),
        };

        entries.insert(name, entry);
        value
    }

    pub fn remove(&self, name: &str) -> Option<Arc<T>> {
        sync::lock(&self.entries).remove(name).and_then(|v| v.get())
    }

    pub fn strength_of(&self, name: &str) -> Option<CacheStrength> {
        let entries = sync::lock(&self.entries);
        entries
            .get(name)
            .filter(|v| v.get().is_some())
            .map(|v| v.strength())
    }

    /// The number of live entries.
    pub fn len(&self) -> usize {
        let mut entries = sync::lock(&self.entries);
        entries.retain(|_, v| v.get().is_some());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<String> {
        let mut entries = sync::lock(&self.entries);
        entries.retain(|_, v| v.get().is_some());
        entries.keys().cloned().collect()
    }

    /// Empties the cache. Entries still referenced elsewhere are logged, and live on until
    /// their last reference is dropped. Returns their number.
    pub fn clear(&self) -> usize {
        let mut entries = sync::lock(&self.entries);

        let mut referenced = 0;
        for (name, entry) in entries.iter() {
            if entry.is_referenced() {
                warn!("{} '{}' is still referenced while its cache is cleared.", self.kind, name);
                referenced += 1;
            }
        }

        entries.clear();
        referenced
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strengths() {
        let cache = ObjectCache::new("Program");

        let strong = cache.insert("a", Arc::new(1), CacheStrength::Strong);
        drop(strong);
        assert_eq!(cache.get("a").map(|v| *v), Some(1));

        let weak = cache.insert("b", Arc::new(2), CacheStrength::Weak);
        assert_eq!(cache.strength_of("b"), Some(CacheStrength::Weak));
        assert_eq!(cache.len(), 2);
        drop(weak);
        assert!(cache.get("b").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn strength_is_fixed() {
        let cache = ObjectCache::new("Program");
        let first = cache.insert("a", Arc::new(1), CacheStrength::Weak);
        let second = cache.insert("a", Arc::new(2), CacheStrength::Strong);

        assert_eq!(*second, 1);
        assert_eq!(cache.strength_of("a"), Some(CacheStrength::Weak));
        drop(first);
        drop(second);
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn clear() {
        let cache = ObjectCache::new("Shader");
        let held = cache.insert("a", Arc::new(1), CacheStrength::Strong);
        cache.insert("b", Arc::new(2), CacheStrength::Strong);

        assert_eq!(cache.clear(), 1);
        assert!(cache.is_empty());
        assert_eq!(*held, 1);
    }
}
