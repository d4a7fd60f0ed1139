//! Least-recently-used cache.
//!
//! Stores up to `maxsize` weight before evicting the entry that has gone
//! longest without a `get`. Built on the shared arena order list: `get`
//! moves an entry to the front (most-recent end); `popitem` evicts from the
//! back.

use std::hash::Hash;

use crate::error::CacheError;
use crate::ordered::OrderedCore;
use crate::store::{default_sizeof, MissingFn, SizeFn, Store};

pub struct Lru<K, V> {
    core: OrderedCore<K, V>,
}

impl<K: Hash + Eq + Clone, V> Lru<K, V> {
    /// Creates an `Lru` with room for `maxsize` units of weight (one per
    /// entry under the default `sizeof`).
    pub fn new(maxsize: usize) -> Self {
        Self::with_sizeof(maxsize, Box::new(default_sizeof))
    }

    /// Creates an `Lru` with a custom `sizeof` function.
    pub fn with_sizeof(maxsize: usize, sizeof: SizeFn<V>) -> Self {
        Lru {
            core: OrderedCore::with_capacity(maxsize, sizeof),
        }
    }

    /// Installs a handler invoked on a `get` miss; its result is inserted
    /// and returned in place of `KeyNotPresent`.
    pub fn with_missing(mut self, missing: MissingFn<K, V>) -> Self {
        self.core.missing = Some(missing);
        self
    }

    /// Keys from most- to least-recently used. Read-only; does not reorder.
    pub fn key_order(&self) -> impl Iterator<Item = &K> {
        self.core.order.iter().map(|(k, _)| k)
    }
}

impl<K: Hash + Eq + Clone, V> Store<K, V> for Lru<K, V> {
    fn get(&mut self, k: &K) -> Result<&V, CacheError> {
        if let Some(i) = self.core.find(k) {
            self.core.order.move_to_front(i);
            return Ok(&self.core.order.get(i).1);
        }
        if let Some(missing) = self.core.missing.as_mut() {
            let v = missing(k);
            let key = k.clone();
            // `insert` swallows ValueTooLarge for wrapper callers; here we
            // have no owned value to hand back if the cache refused it, so
            // that one edge case surfaces as the insert's own error instead
            // of KeyNotPresent.
            self.insert(key, v)?;
            let i = self.core.find(k).expect("just inserted");
            return Ok(&self.core.order.get(i).1);
        }
        Err(CacheError::KeyNotPresent)
    }

    fn contains(&self, k: &K) -> bool {
        self.core.find(k).is_some()
    }

    fn insert(&mut self, k: K, v: V) -> Result<(), CacheError> {
        self.core.insert_with_victim(
            k,
            v,
            |core| (!core.order.is_empty()).then(|| core.order.back()),
            true,
        )
    }

    fn delete(&mut self, k: &K) -> Result<V, CacheError> {
        self.core.delete(k)
    }

    fn popitem(&mut self) -> Result<(K, V), CacheError> {
        if self.core.order.is_empty() {
            return Err(CacheError::Empty);
        }
        Ok(self.core.evict_at(self.core.order.back()))
    }

    fn clear(&mut self) {
        self.core.clear();
    }

    fn len(&self) -> usize {
        self.core.len()
    }

    fn maxsize(&self) -> usize {
        self.core.maxsize
    }

    fn currsize(&self) -> usize {
        self.core.currsize
    }

    fn getsizeof(&self, v: &V) -> usize {
        (self.core.sizeof)(v)
    }

    fn iter_keys(&self) -> Box<dyn Iterator<Item = &K> + '_> {
        Box::new(self.key_order())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_order() {
        let mut c = Lru::new(2);
        c.insert(1, "a").unwrap();
        c.insert(2, "b").unwrap();
        c.insert(3, "c").unwrap();
        assert!(!c.contains(&1));
        assert_eq!(c.get(&2), Ok(&"b"));
        assert_eq!(c.get(&3), Ok(&"c"));

        c.get(&2).unwrap();
        c.insert(4, "d").unwrap();
        assert!(!c.contains(&3));
        assert_eq!(c.get(&2), Ok(&"b"));
        assert_eq!(c.get(&4), Ok(&"d"));
    }

    #[test]
    fn reinsert_refreshes_recency() {
        let mut c = Lru::new(2);
        c.insert(1, "a").unwrap();
        c.insert(2, "b").unwrap();
        c.insert(1, "c").unwrap(); // re-insert of an existing key moves it to the tail
        c.insert(3, "d").unwrap();
        assert!(!c.contains(&2));
        assert_eq!(c.get(&1), Ok(&"c"));
        assert_eq!(c.get(&3), Ok(&"d"));
    }

    #[test]
    fn get_protects_from_next_eviction() {
        let mut c = Lru::new(2);
        c.insert(1, "a").unwrap();
        c.insert(2, "b").unwrap();
        c.get(&1).unwrap();
        let (evicted, _) = c.popitem().unwrap();
        assert_eq!(evicted, 2);
    }

    #[test]
    fn oversized_insert_is_atomic() {
        let sizeof: SizeFn<i32> = Box::new(|v: &i32| *v as usize);
        let mut c = Lru::with_sizeof(3, sizeof);
        c.insert(1, 1).unwrap();
        c.insert(2, 2).unwrap();
        assert_eq!(c.currsize(), 3);
        c.insert(3, 3).unwrap();
        assert_eq!(c.currsize(), 3);
        assert!(c.contains(&3));
        assert!(!c.contains(&1));
        assert!(!c.contains(&2));

        let err = c.insert(4, 4).unwrap_err();
        assert_eq!(
            err,
            CacheError::ValueTooLarge {
                size: 4,
                maxsize: 3
            }
        );
        assert_eq!(c.currsize(), 3);
        assert!(c.contains(&3));
    }

    #[test]
    fn replace_with_smaller_never_evicts() {
        let sizeof: SizeFn<i32> = Box::new(|v: &i32| *v as usize);
        let mut c = Lru::with_sizeof(3, sizeof);
        c.insert(1, 3).unwrap();
        c.insert(1, 1).unwrap();
        assert_eq!(c.currsize(), 1);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn popitem_on_empty() {
        let mut c: Lru<i32, i32> = Lru::new(1);
        assert_eq!(c.popitem().unwrap_err(), CacheError::Empty);
    }
}
