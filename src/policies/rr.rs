//! Random-replacement cache.
//!
//! No auxiliary ordering at all -- `popitem` asks an injected `choose`
//! function to pick a victim from the live keys (default: uniform random via
//! `rand`). Grounded on `UnboundCache`'s plain `HashMap` backing, the same
//! way `Lfu` is.

use std::collections::HashMap;
use std::hash::Hash;

use rand::seq::IteratorRandom;
use rand::thread_rng;

use crate::error::CacheError;
use crate::store::{default_sizeof, MissingFn, SizeFn, Store};

pub type ChooseFn<K> = Box<dyn FnMut(&[&K]) -> usize + Send>;

pub struct Rr<K, V> {
    map: HashMap<K, (V, usize)>,
    maxsize: usize,
    currsize: usize,
    sizeof: SizeFn<V>,
    missing: Option<MissingFn<K, V>>,
    choose: Option<ChooseFn<K>>,
}

impl<K: Hash + Eq + Clone, V> Rr<K, V> {
    pub fn new(maxsize: usize) -> Self {
        Self::with_sizeof(maxsize, Box::new(default_sizeof))
    }

    pub fn with_sizeof(maxsize: usize, sizeof: SizeFn<V>) -> Self {
        if maxsize == 0 {
            panic!("cache maxsize must be greater than zero");
        }
        Rr {
            map: HashMap::with_capacity(maxsize),
            maxsize,
            currsize: 0,
            sizeof,
            missing: None,
            choose: None,
        }
    }

    pub fn with_missing(mut self, missing: MissingFn<K, V>) -> Self {
        self.missing = Some(missing);
        self
    }

    /// Overrides the default uniform-random victim chooser. `choose` is
    /// given the live keys and returns the index of the one to evict.
    pub fn with_choose(mut self, choose: ChooseFn<K>) -> Self {
        self.choose = Some(choose);
        self
    }

    fn victim(&mut self) -> Option<K> {
        let keys: Vec<&K> = self.map.keys().collect();
        if keys.is_empty() {
            return None;
        }
        let index = match self.choose.as_mut() {
            Some(choose) => choose(&keys),
            None => (0..keys.len()).choose(&mut thread_rng()).unwrap(),
        };
        Some(keys[index].clone())
    }
}

impl<K: Hash + Eq + Clone, V> Store<K, V> for Rr<K, V> {
    fn get(&mut self, k: &K) -> Result<&V, CacheError> {
        if self.map.contains_key(k) {
            return Ok(&self.map.get(k).unwrap().0);
        }
        if let Some(missing) = self.missing.as_mut() {
            let v = missing(k);
            let key = k.clone();
            self.insert(key, v)?;
            return Ok(&self.map.get(k).unwrap().0);
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
            if old.1 >= size {
                self.currsize -= old.1 - size;
                self.map.insert(k, (v, size));
                return Ok(());
            }
            self.delete(&k).ok();
        }
        while self.currsize + size > self.maxsize {
            match self.victim() {
                Some(victim) => {
                    self.delete(&victim).ok();
                }
                None => break,
            }
        }
        self.map.insert(k, (v, size));
        self.currsize += size;
        Ok(())
    }

    fn delete(&mut self, k: &K) -> Result<V, CacheError> {
        match self.map.remove(k) {
            Some((v, size)) => {
                self.currsize -= size;
                Ok(v)
            }
            None => Err(CacheError::KeyNotPresent),
        }
    }

    fn popitem(&mut self) -> Result<(K, V), CacheError> {
        let victim = self.victim().ok_or(CacheError::Empty)?;
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
    fn deterministic_choose_picks_named_victim() {
        let mut c = Rr::new(2).with_choose(Box::new(|keys: &[&i32]| {
            keys.iter().position(|&&k| k == 1).unwrap_or(0)
        }));
        c.insert(1, "a").unwrap();
        c.insert(2, "b").unwrap();
        c.insert(3, "c").unwrap();
        assert!(!c.contains(&1));
        assert!(c.contains(&2));
        assert!(c.contains(&3));
    }

    #[test]
    fn popitem_on_empty() {
        let mut c: Rr<i32, i32> = Rr::new(1);
        assert_eq!(c.popitem().unwrap_err(), CacheError::Empty);
    }
}
