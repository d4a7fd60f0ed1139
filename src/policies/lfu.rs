//! Least-frequently-used cache.
//!
//! Grounded on `UnboundCache`'s plain `HashMap` backing (no arena list is
//! needed: `popitem` doing an O(n) scan for the minimum-frequency entry is
//! explicitly allowed by the policy contract). Each entry carries a use
//! counter and an insertion sequence number; eviction picks the minimum
//! counter, breaking ties in favor of the oldest insertion.

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::CacheError;
use crate::store::{default_sizeof, MissingFn, SizeFn, Store};

struct Slot<V> {
    value: V,
    size: usize,
    freq: u64,
    seq: u64,
}

pub struct Lfu<K, V> {
    map: HashMap<K, Slot<V>>,
    maxsize: usize,
    currsize: usize,
    sizeof: SizeFn<V>,
    missing: Option<MissingFn<K, V>>,
    next_seq: u64,
}

impl<K: Hash + Eq + Clone, V> Lfu<K, V> {
    pub fn new(maxsize: usize) -> Self {
        Self::with_sizeof(maxsize, Box::new(default_sizeof))
    }

    pub fn with_sizeof(maxsize: usize, sizeof: SizeFn<V>) -> Self {
        if maxsize == 0 {
            panic!("cache maxsize must be greater than zero");
        }
        Lfu {
            map: HashMap::with_capacity(maxsize),
            maxsize,
            currsize: 0,
            sizeof,
            missing: None,
            next_seq: 0,
        }
    }

    pub fn with_missing(mut self, missing: MissingFn<K, V>) -> Self {
        self.missing = Some(missing);
        self
    }

    /// Current use counter for `k`, if present. Exposed for tests and
    /// callers that want visibility into eviction pressure.
    pub fn frequency(&self, k: &K) -> Option<u64> {
        self.map.get(k).map(|s| s.freq)
    }

    fn min_key(&self) -> Option<K> {
        self.map
            .iter()
            .min_by_key(|(_, slot)| (slot.freq, slot.seq))
            .map(|(k, _)| k.clone())
    }
}

impl<K: Hash + Eq + Clone, V> Store<K, V> for Lfu<K, V> {
    fn get(&mut self, k: &K) -> Result<&V, CacheError> {
        if self.map.contains_key(k) {
            let slot = self.map.get_mut(k).unwrap();
            slot.freq += 1;
            return Ok(&self.map.get(k).unwrap().value);
        }
        if let Some(missing) = self.missing.as_mut() {
            let v = missing(k);
            let key = k.clone();
            self.insert(key, v)?;
            return Ok(&self.map.get(k).unwrap().value);
        }
        Err(CacheError::KeyNotPresent)
    }

    fn contains(&self, k: &K) -> bool {
        self.map.contains_key(k)
    }

    fn insert(&mut self, k: K, v: V) -> Result<(), CacheError> {
        let size = (self.sizeof)(&v);
        if size > self.maxsize {
            return Err(CacheError::ValueTooLarge {
                size,
                maxsize: self.maxsize,
            });
        }
        if let Some(old) = self.map.get(&k) {
            if old.size >= size {
                let freq = old.freq + 1;
                let seq = old.seq;
                self.currsize -= old.size - size;
                self.map.insert(
                    k,
                    Slot {
                        value: v,
                        size,
                        freq,
                        seq,
                    },
                );
                return Ok(());
            }
            let freq = old.freq + 1;
            let seq = old.seq;
            self.delete(&k).ok();
            while self.currsize + size > self.maxsize {
                match self.min_key() {
                    Some(victim) => {
                        self.delete(&victim).ok();
                    }
                    None => break,
                }
            }
            self.map.insert(
                k,
                Slot {
                    value: v,
                    size,
                    freq,
                    seq,
                },
            );
            self.currsize += size;
            return Ok(());
        }
        while self.currsize + size > self.maxsize {
            match self.min_key() {
                Some(victim) => {
                    self.delete(&victim).ok();
                }
                None => break,
            }
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.map.insert(
            k,
            Slot {
                value: v,
                size,
                freq: 1,
                seq,
            },
        );
        self.currsize += size;
        Ok(())
    }

    fn delete(&mut self, k: &K) -> Result<V, CacheError> {
        match self.map.remove(k) {
            Some(slot) => {
                self.currsize -= slot.size;
                Ok(slot.value)
            }
            None => Err(CacheError::KeyNotPresent),
        }
    }

    fn popitem(&mut self) -> Result<(K, V), CacheError> {
        let victim = self.min_key().ok_or(CacheError::Empty)?;
        let v = self.delete(&victim)?;
        Ok((victim, v))
    }

    fn clear(&mut self) {
        self.map.clear();
        self.currsize = 0;
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn maxsize(&self) -> usize {
        self.maxsize
    }

    fn currsize(&self) -> usize {
        self.currsize
    }

    fn getsizeof(&self, v: &V) -> usize {
        (self.sizeof)(v)
    }

    fn iter_keys(&self) -> Box<dyn Iterator<Item = &K> + '_> {
        Box::new(self.map.keys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tie_break_by_age() {
        let mut c = Lfu::new(2);
        c.insert(1, "x").unwrap();
        c.insert(2, "y").unwrap();
        // both at freq 1; 3 has to evict someone -- the oldest (1) loses
        c.insert(3, "z").unwrap();
        assert!(!c.contains(&1));
        assert!(c.contains(&2));
        assert!(c.contains(&3));
    }

    #[test]
    fn frequent_access_survives() {
        let mut c = Lfu::new(2);
        c.insert(1, "x").unwrap();
        c.insert(2, "y").unwrap();
        for _ in 0..5 {
            c.get(&1).unwrap();
        }
        c.insert(3, "z").unwrap();
        assert!(!c.contains(&2));
        assert!(c.contains(&1));
        assert!(c.contains(&3));
    }

    #[test]
    fn insert_counts_as_use() {
        let mut c: Lfu<i32, &str> = Lfu::new(2);
        c.insert(1, "x").unwrap();
        assert_eq!(c.frequency(&1), Some(1));
    }

    #[test]
    fn larger_replacement_preserves_frequency() {
        let sizeof: SizeFn<i32> = Box::new(|v: &i32| *v as usize);
        let mut c = Lfu::with_sizeof(10, sizeof);
        c.insert(1, 1).unwrap();
        for _ in 0..5 {
            c.get(&1).unwrap();
        }
        assert_eq!(c.frequency(&1), Some(6));
        // replacement with a larger value must not reset the use counter
        c.insert(1, 2).unwrap();
        assert_eq!(c.frequency(&1), Some(7));
    }
}
