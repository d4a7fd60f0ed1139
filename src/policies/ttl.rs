//! Time-to-live cache.
//!
//! Extends the LRU discipline with a per-entry expiration. Two structures
//! track each live entry: `lru_order`, an arena list reordered on `get` (used
//! to pick a victim when the cache is full), and `ttl_queue`, a plain
//! `FIFO` queue of `(expire, key)` pairs (grounded on
//! `ConcurrentTimedCache`'s `VecDeque<(Instant, CacheArc<K>)>`) that stays
//! sorted because `ttl` is constant per cache, so expiry times are
//! monotonically non-decreasing as entries are inserted.
//!
//! Python's `cachetools.TTLCache` freezes `now` across a composite operation
//! with a `_NestedTimer` context manager so that, say, `setitem`'s internal
//! `expire()` and its own insert logic agree on the time. Rust has no
//! implicit re-entrant `with`-block equivalent, so the same guarantee is
//! realized here by reading the timer once per public call and threading
//! that `now` explicitly through the private `_at` helpers, including the
//! one genuine nested case (a `get` miss whose `missing` handler inserts).

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::CacheError;
use crate::list::OrderList;
use crate::store::{default_sizeof, MissingFn, SizeFn, Store};

pub type TimerFn = Box<dyn Fn() -> u64 + Send + Sync>;

struct Slot<V> {
    value: V,
    size: usize,
    expire: u64,
}

pub struct Ttl<K, V> {
    main: HashMap<K, Slot<V>>,
    lru_order: OrderList<K>,
    lru_slot: HashMap<K, usize>,
    ttl_queue: VecDeque<(u64, K)>,
    maxsize: usize,
    currsize: usize,
    ttl: u64,
    timer: TimerFn,
    sizeof: SizeFn<V>,
    missing: Option<MissingFn<K, V>>,
}

fn system_timer() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

impl<K: Hash + Eq + Clone, V> Ttl<K, V> {
    pub fn new(maxsize: usize, ttl: u64) -> Self {
        Self::with_sizeof_and_timer(maxsize, ttl, Box::new(default_sizeof), Box::new(system_timer))
    }

    pub fn with_timer(maxsize: usize, ttl: u64, timer: TimerFn) -> Self {
        Self::with_sizeof_and_timer(maxsize, ttl, Box::new(default_sizeof), timer)
    }

    pub fn with_sizeof_and_timer(
        maxsize: usize,
        ttl: u64,
        sizeof: SizeFn<V>,
        timer: TimerFn,
    ) -> Self {
        if maxsize == 0 {
            panic!("cache maxsize must be greater than zero");
        }
        Ttl {
            main: HashMap::with_capacity(maxsize),
            lru_order: OrderList::with_capacity(maxsize),
            lru_slot: HashMap::with_capacity(maxsize),
            ttl_queue: VecDeque::with_capacity(maxsize),
            maxsize,
            currsize: 0,
            ttl,
            timer,
            sizeof,
            missing: None,
        }
    }

    pub fn with_missing(mut self, missing: MissingFn<K, V>) -> Self {
        self.missing = Some(missing);
        self
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    /// Drains the TTL queue head while it is older than `at` (or `now()`).
    pub fn expire(&mut self, at: Option<u64>) {
        let now = at.unwrap_or_else(|| (self.timer)());
        self.expire_at(now);
    }

    fn expire_at(&mut self, now: u64) {
        while let Some(&(exp, _)) = self.ttl_queue.front() {
            if exp > now {
                break;
            }
            let (exp, k) = self.ttl_queue.pop_front().unwrap();
            // A tuple is a tombstone (superseded by a later refresh of the
            // same key, or by outright removal) unless it still matches the
            // entry's current expire time.
            let still_current = self.main.get(&k).map(|s| s.expire) == Some(exp);
            if still_current {
                self.remove_live(&k);
            }
        }
    }

    fn remove_live(&mut self, k: &K) -> Option<V> {
        let idx = self.lru_slot.remove(k)?;
        self.lru_order.remove(idx);
        let slot = self.main.remove(k)?;
        self.currsize -= slot.size;
        Some(slot.value)
    }

    fn get_at(&mut self, k: &K, now: u64) -> Result<&V, CacheError> {
        if let Some(slot) = self.main.get(k) {
            if slot.expire > now {
                let idx = *self.lru_slot.get(k).unwrap();
                self.lru_order.move_to_front(idx);
                return Ok(&self.main.get(k).unwrap().value);
            }
            self.remove_live(k);
        }
        if let Some(missing) = self.missing.as_mut() {
            let v = missing(k);
            let key = k.clone();
            self.insert_at(key, v, now)?;
            return Ok(&self.main.get(k).unwrap().value);
        }
        Err(CacheError::KeyNotPresent)
    }

    fn contains_at(&self, k: &K, now: u64) -> bool {
        self.main.get(k).map(|s| s.expire > now).unwrap_or(false)
    }

    fn insert_at(&mut self, k: K, v: V, now: u64) -> Result<(), CacheError> {
        self.expire_at(now);
        let size = (self.sizeof)(&v);
        if size > self.maxsize {
            return Err(CacheError::ValueTooLarge {
                size,
                maxsize: self.maxsize,
            });
        }
        if let Some(old) = self.main.get(&k) {
            if old.size >= size {
                let idx = *self.lru_slot.get(&k).unwrap();
                self.lru_order.move_to_front(idx);
                self.currsize -= old.size - size;
                let expire = now + self.ttl;
                self.main.insert(k.clone(), Slot { value: v, size, expire });
                self.ttl_queue.push_back((expire, k));
                return Ok(());
            }
            self.remove_live(&k);
        }
        while self.currsize + size > self.maxsize {
            if self.lru_order.is_empty() {
                break;
            }
            let victim_idx = self.lru_order.back();
            let victim_key = self.lru_order.get(victim_idx).clone();
            self.remove_live(&victim_key);
        }
        let expire = now + self.ttl;
        let idx = self.lru_order.push_front(k.clone());
        self.lru_slot.insert(k.clone(), idx);
        self.main.insert(k.clone(), Slot { value: v, size, expire });
        self.ttl_queue.push_back((expire, k));
        self.currsize += size;
        Ok(())
    }

    fn delete_at(&mut self, k: &K, now: u64) -> Result<V, CacheError> {
        match self.main.get(k) {
            Some(slot) if slot.expire > now => Ok(self.remove_live(k).unwrap()),
            Some(_) => {
                self.remove_live(k);
                Err(CacheError::KeyNotPresent)
            }
            None => Err(CacheError::KeyNotPresent),
        }
    }

    /// Count of entries whose TTL tuple is still at the (possibly stale)
    /// front of the queue and has expired but not yet been reaped.
    fn expired_not_reaped(&self, now: u64) -> (usize, usize) {
        let mut count = 0;
        let mut size = 0;
        for &(exp, ref k) in self.ttl_queue.iter() {
            if exp > now {
                break;
            }
            if let Some(slot) = self.main.get(k) {
                if slot.expire == exp {
                    count += 1;
                    size += slot.size;
                }
            }
        }
        (count, size)
    }
}

impl<K: Hash + Eq + Clone, V> Store<K, V> for Ttl<K, V> {
    fn get(&mut self, k: &K) -> Result<&V, CacheError> {
        let now = (self.timer)();
        self.get_at(k, now)
    }

    fn contains(&self, k: &K) -> bool {
        self.contains_at(k, (self.timer)())
    }

    fn insert(&mut self, k: K, v: V) -> Result<(), CacheError> {
        let now = (self.timer)();
        self.insert_at(k, v, now)
    }

    fn delete(&mut self, k: &K) -> Result<V, CacheError> {
        let now = (self.timer)();
        self.delete_at(k, now)
    }

    fn popitem(&mut self) -> Result<(K, V), CacheError> {
        let now = (self.timer)();
        self.expire_at(now);
        if self.lru_order.is_empty() {
            return Err(CacheError::Empty);
        }
        let idx = self.lru_order.back();
        let key = self.lru_order.get(idx).clone();
        let value = self.remove_live(&key).expect("victim just selected");
        Ok((key, value))
    }

    fn clear(&mut self) {
        self.main.clear();
        self.lru_order.clear();
        self.lru_slot.clear();
        self.ttl_queue.clear();
        self.currsize = 0;
    }

    fn len(&self) -> usize {
        let now = (self.timer)();
        let (stale, _) = self.expired_not_reaped(now);
        self.main.len() - stale
    }

    fn maxsize(&self) -> usize {
        self.maxsize
    }

    fn currsize(&self) -> usize {
        let now = (self.timer)();
        let (_, stale_size) = self.expired_not_reaped(now);
        self.currsize - stale_size
    }

    fn getsizeof(&self, v: &V) -> usize {
        (self.sizeof)(v)
    }

    fn iter_keys(&self) -> Box<dyn Iterator<Item = &K> + '_> {
        let now = (self.timer)();
        let mut stale: std::collections::HashSet<&K> = std::collections::HashSet::new();
        for &(exp, ref k) in self.ttl_queue.iter() {
            if exp > now {
                break;
            }
            if let Some(slot) = self.main.get(k) {
                if slot.expire == exp {
                    stale.insert(k);
                }
            }
        }
        Box::new(self.lru_order.iter().filter(move |k| !stale.contains(k)))
    }

    fn pop(&mut self, k: &K, default: Option<V>) -> Result<V, CacheError> {
        let now = (self.timer)();
        match self.delete_at(k, now) {
            Ok(v) => Ok(v),
            Err(CacheError::KeyNotPresent) => default.ok_or(CacheError::KeyNotPresent),
            Err(e) => Err(e),
        }
    }

    fn setdefault(&mut self, k: K, v: V) -> Result<&V, CacheError> {
        let now = (self.timer)();
        if !self.contains_at(&k, now) {
            self.insert_at(k.clone(), v, now)?;
        }
        self.get_at(&k, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn manual_clock() -> (Arc<AtomicU64>, TimerFn) {
        let clock = Arc::new(AtomicU64::new(0));
        let read = clock.clone();
        (clock, Box::new(move || read.load(Ordering::SeqCst)))
    }

    #[test]
    fn expiry_scenario() {
        let (clock, timer) = manual_clock();
        let mut c: Ttl<i32, &str> = Ttl::with_timer(10, 2, timer);

        c.insert(1, "a").unwrap();
        clock.fetch_add(1, Ordering::SeqCst);
        c.insert(2, "b").unwrap();
        clock.fetch_add(1, Ordering::SeqCst);

        assert_eq!(c.get(&1), Err(CacheError::KeyNotPresent));
        assert_eq!(c.len(), 1);
        assert_eq!(c.iter_keys().collect::<Vec<_>>(), vec![&2]);

        clock.fetch_add(1, Ordering::SeqCst);
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn lru_eviction_among_live_entries() {
        let (clock, timer) = manual_clock();
        let mut c: Ttl<i32, &str> = Ttl::with_timer(2, 100, timer);
        c.insert(1, "a").unwrap();
        c.insert(2, "b").unwrap();
        c.get(&1).unwrap();
        let _ = clock;
        c.insert(3, "c").unwrap();
        assert!(!c.contains(&2));
        assert!(c.contains(&1));
        assert!(c.contains(&3));
    }

    #[test]
    fn refreshing_in_place_does_not_cause_premature_eviction() {
        let (clock, timer) = manual_clock();
        let mut c: Ttl<i32, i32> = Ttl::with_sizeof_and_timer(
            10,
            2,
            Box::new(|v: &i32| *v as usize),
            timer,
        );
        c.insert(1, 1).unwrap();
        clock.fetch_add(1, Ordering::SeqCst);
        c.insert(1, 1).unwrap(); // same size, refreshes expire in place
        clock.fetch_add(1, Ordering::SeqCst);
        // the original (now stale) ttl_queue tuple would have expired here
        assert!(c.contains(&1));
    }
}
