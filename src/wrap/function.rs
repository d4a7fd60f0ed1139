//! Thread-safe memoization of a single free function.
//!
//! Grounded on `cachetools.cached`: the wrapped cache is held behind a
//! mandatory lock (callers never touch an unboxed `Store` concurrently), the
//! user's function runs *outside* that lock so a slow computation never
//! blocks unrelated keys, and the eventual insert is race-aware -- if a
//! concurrent caller already installed a value for the same key while we
//! were computing, that value is kept and ours is discarded.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::store::Store;

/// Hit/miss counters and a size snapshot, mirroring `cached_stats()` in the
/// Python original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheInfo {
    pub hits: u64,
    pub misses: u64,
    pub maxsize: usize,
    pub currsize: usize,
}

struct Inner<K, S> {
    store: S,
    /// Keys currently being computed by some thread. Only populated when
    /// stampede suppression is enabled.
    pending: HashSet<K>,
}

/// Marks `key` pending for its lifetime. Dropping it (including during an
/// unwind out of `compute`) removes `key` from `pending` and wakes every
/// thread waiting on the condvar, so a panicking or cancelled computation
/// can never leave other callers blocked forever.
struct PendingGuard<'a, K, V, S> {
    cached: &'a Cached<K, V, S>,
    key: K,
}

impl<'a, K, V, S> Drop for PendingGuard<'a, K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: Store<K, V>,
{
    fn drop(&mut self) {
        self.cached.inner.lock().pending.remove(&self.key);
        self.cached.condvar.notify_all();
    }
}

/// Wraps a `Store` so concurrent callers can share it safely, with optional
/// suppression of redundant concurrent computation ("cache stampede") for
/// the same key.
pub struct Cached<K, V, S> {
    inner: Mutex<Inner<K, S>>,
    condvar: Condvar,
    hits: AtomicU64,
    misses: AtomicU64,
    suppress_stampede: bool,
    _value: std::marker::PhantomData<V>,
}

impl<K, V, S> Cached<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: Store<K, V>,
{
    pub fn new(store: S) -> Self {
        Cached {
            inner: Mutex::new(Inner {
                store,
                pending: HashSet::new(),
            }),
            condvar: Condvar::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            suppress_stampede: false,
            _value: std::marker::PhantomData,
        }
    }

    /// Makes concurrent callers for the same not-yet-cached key block on
    /// the first caller's computation instead of each recomputing it.
    pub fn with_stampede_suppression(mut self) -> Self {
        self.suppress_stampede = true;
        self
    }

    /// Returns the cached value for `key`, calling `compute` to produce and
    /// install one on a miss. `compute` never runs while the lock is held.
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce() -> V) -> V {
        loop {
            let mut guard = self.inner.lock();
            if let Ok(v) = guard.store.get(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return v.clone();
            }

            if self.suppress_stampede {
                if guard.pending.contains(&key) {
                    self.condvar.wait(&mut guard);
                    continue;
                }
                guard.pending.insert(key.clone());
            }
            self.misses.fetch_add(1, Ordering::Relaxed);
            drop(guard);

            // Registers `key` as pending (when suppression is on) for the
            // scope of `compute`; its `Drop` clears `pending` and wakes
            // waiters whether `compute` returns normally, panics, or this
            // thread is cancelled mid-call -- there is exactly one cleanup
            // path instead of one for the happy path and a forgotten one
            // for unwinding.
            let _pending = self.suppress_stampede.then(|| PendingGuard {
                cached: self,
                key: key.clone(),
            });

            let value = compute();

            let mut guard = self.inner.lock();
            if !guard.store.contains(&key) {
                let _ = guard.store.insert(key.clone(), value.clone());
            }
            // A refused install (ValueTooLarge) leaves `key` absent; fall
            // back to the value we already computed instead of panicking.
            let installed = match guard.store.get(&key) {
                Ok(v) => v.clone(),
                Err(_) => value,
            };
            drop(guard);

            return installed;
        }
    }

    pub fn cache_clear(&self) {
        self.inner.lock().store.clear();
    }

    pub fn cache_info(&self) -> CacheInfo {
        let guard = self.inner.lock();
        CacheInfo {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            maxsize: guard.store.maxsize(),
            currsize: guard.store.currsize(),
        }
    }

    /// Runs `f` against the underlying store under the wrapper's lock. The
    /// read-only "cache handle" `cached(cache=...)` exposes in the original;
    /// Rust has no way to hand out an unguarded reference to mutex-protected
    /// state, so callers get a closure instead of a raw handle.
    pub fn with_cache<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.lock().store)
    }
}

/// A [`Cached`] wrapper that may or may not be active, mirroring
/// `cached(cache=None, ...)` in the original: when `cache` is `None`, every
/// call runs `compute` directly with no locking, key lookup, or accounting.
pub enum MaybeCached<K, V, S> {
    Cached(Cached<K, V, S>),
    Passthrough,
}

impl<K, V, S> MaybeCached<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: Store<K, V>,
{
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce() -> V) -> V {
        match self {
            MaybeCached::Cached(c) => c.get_or_compute(key, compute),
            MaybeCached::Passthrough => compute(),
        }
    }

    /// `None` for a passthrough wrapper, which has no counters to report.
    pub fn cache_info(&self) -> Option<CacheInfo> {
        match self {
            MaybeCached::Cached(c) => Some(c.cache_info()),
            MaybeCached::Passthrough => None,
        }
    }

    pub fn cache_clear(&self) {
        if let MaybeCached::Cached(c) = self {
            c.cache_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::Lru;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn memoizes_and_counts_hits() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Cached::new(Lru::<i32, i32>::new(4));

        let track = calls.clone();
        let v1 = c.get_or_compute(1, || {
            track.fetch_add(1, Ordering::SeqCst);
            10
        });
        let track = calls.clone();
        let v2 = c.get_or_compute(1, || {
            track.fetch_add(1, Ordering::SeqCst);
            999
        });

        assert_eq!(v1, 10);
        assert_eq!(v2, 10);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.cache_info().hits, 1);
        assert_eq!(c.cache_info().misses, 1);
    }

    #[test]
    fn stampede_suppression_computes_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::new(Cached::new(Lru::<i32, i32>::new(4)).with_stampede_suppression());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = c.clone();
                let calls = calls.clone();
                thread::spawn(move || {
                    c.get_or_compute(1, || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(20));
                        42
                    })
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn race_aware_install_keeps_existing_value() {
        let c = Cached::new(Lru::<i32, i32>::new(4));
        {
            let mut guard = c.inner.lock();
            guard.store.insert(1, 100).unwrap();
        }
        let v = c.get_or_compute(1, || 200);
        assert_eq!(v, 100);
    }

    #[test]
    fn oversized_value_returned_without_panicking() {
        let sizeof: crate::store::SizeFn<i32> = Box::new(|v: &i32| *v as usize);
        let c = Cached::new(Lru::with_sizeof(3, sizeof));
        let v = c.get_or_compute(1, || 10);
        assert_eq!(v, 10);
        assert!(!c.with_cache(|s| s.contains(&1)));
    }

    #[test]
    fn passthrough_never_caches() {
        let calls = Arc::new(AtomicU32::new(0));
        let memo: MaybeCached<i32, i32, Lru<i32, i32>> = MaybeCached::Passthrough;

        for _ in 0..3 {
            let track = calls.clone();
            memo.get_or_compute(1, || {
                track.fetch_add(1, Ordering::SeqCst);
                10
            });
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(memo.cache_info().is_none());
    }
}
