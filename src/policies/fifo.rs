//! First-in-first-out cache.
//!
//! Entries are evicted in insertion order regardless of access pattern:
//! `get` never reorders the arena list, so the back of the list is always
//! the oldest surviving entry.

use std::hash::Hash;

use crate::error::CacheError;
use crate::ordered::OrderedCore;
use crate::store::{default_sizeof, MissingFn, SizeFn, Store};

pub struct Fifo<K, V> {
    core: OrderedCore<K, V>,
}

impl<K: Hash + Eq + Clone, V> Fifo<K, V> {
    pub fn new(maxsize: usize) -> Self {
        Self::with_sizeof(maxsize, Box::new(default_sizeof))
    }

    pub fn with_sizeof(maxsize: usize, sizeof: SizeFn<V>) -> Self {
        Fifo {
            core: OrderedCore::with_capacity(maxsize, sizeof),
        }
    }

    pub fn with_missing(mut self, missing: MissingFn<K, V>) -> Self {
        self.core.missing = Some(missing);
        self
    }

    /// Keys oldest-first (the order `popitem` will evict them in).
    pub fn key_order(&self) -> impl Iterator<Item = &K> {
        self.core.order.iter_rev().map(|(k, _)| k)
    }
}

impl<K: Hash + Eq + Clone, V> Store<K, V> for Fifo<K, V> {
    fn get(&mut self, k: &K) -> Result<&V, CacheError> {
        if let Some(i) = self.core.find(k) {
            return Ok(&self.core.order.get(i).1);
        }
        if let Some(missing) = self.core.missing.as_mut() {
            let v = missing(k);
            let key = k.clone();
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
            false,
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
    fn get_does_not_change_eviction_order() {
        let mut c = Fifo::new(2);
        c.insert(1, "a").unwrap();
        c.insert(2, "b").unwrap();
        c.get(&1).unwrap();
        c.get(&1).unwrap();
        c.insert(3, "c").unwrap();
        assert!(!c.contains(&1));
        assert!(c.contains(&2));
        assert!(c.contains(&3));
    }

    #[test]
    fn popitem_on_empty() {
        let mut c: Fifo<i32, i32> = Fifo::new(1);
        assert_eq!(c.popitem().unwrap_err(), CacheError::Empty);
    }
}
