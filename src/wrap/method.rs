//! Thread-safe memoization of a method, shared across instances or scoped
//! per-instance via a caller-supplied selector.
//!
//! `cachetools.cachedmethod` takes a `cache(self)` callable that returns the
//! `Cache` to use for a given receiver; that's the one piece of the Python
//! decorator that can't be inferred automatically in Rust (there's no
//! implicit receiver to introspect), so it's the one explicit parameter
//! here. Everything else -- locking, stampede suppression, race-aware
//! install -- is the same [`Cached`] machinery a plain function uses.

use std::hash::Hash;

use crate::store::Store;
use crate::wrap::function::{CacheInfo, Cached};

/// Delegates to a [`Cached`] chosen per call by `select`. Use a selector
/// that always returns the same shared `Cached` for one cache across every
/// instance, or one that maps each receiver to its own `Cached` for
/// per-instance caches. `select` returning `None` for a given receiver is
/// passthrough (`compute` runs uncached), mirroring `cachedmethod`'s
/// `cache(self) -> None` case (§4.8) — there is no process-global
/// hit/miss/pending state to fall back on here, since every receiver owns
/// its own `Cached` (or none).
pub struct CachedMethod<R: ?Sized, K, V, S> {
    select: Box<dyn Fn(&R) -> Option<&Cached<K, V, S>> + Send + Sync>,
}

impl<R: ?Sized, K, V, S> CachedMethod<R, K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: Store<K, V>,
{
    pub fn new(select: impl Fn(&R) -> &Cached<K, V, S> + Send + Sync + 'static) -> Self {
        CachedMethod {
            select: Box::new(move |r| Some(select(r))),
        }
    }

    /// Like [`Self::new`], but `select` may opt a given receiver out of
    /// caching entirely by returning `None`.
    pub fn with_passthrough(
        select: impl Fn(&R) -> Option<&Cached<K, V, S>> + Send + Sync + 'static,
    ) -> Self {
        CachedMethod {
            select: Box::new(select),
        }
    }

    pub fn call(&self, receiver: &R, key: K, compute: impl FnOnce() -> V) -> V {
        match (self.select)(receiver) {
            Some(cache) => cache.get_or_compute(key, compute),
            None => compute(),
        }
    }

    pub fn cache_clear(&self, receiver: &R) {
        if let Some(cache) = (self.select)(receiver) {
            cache.cache_clear();
        }
    }

    pub fn cache_info(&self, receiver: &R) -> Option<CacheInfo> {
        (self.select)(receiver).map(Cached::cache_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::Lru;

    struct Widget {
        cache: Cached<i32, i32, Lru<i32, i32>>,
    }

    #[test]
    fn per_instance_selector_isolates_caches() {
        let a = Widget {
            cache: Cached::new(Lru::new(4)),
        };
        let b = Widget {
            cache: Cached::new(Lru::new(4)),
        };
        let memo: CachedMethod<Widget, i32, i32, Lru<i32, i32>> =
            CachedMethod::new(|w: &Widget| &w.cache);

        let va = memo.call(&a, 1, || 10);
        let vb = memo.call(&b, 1, || 20);
        assert_eq!(va, 10);
        assert_eq!(vb, 20);
    }

    #[test]
    fn passthrough_selector_skips_caching() {
        struct Uncacheable;
        let receiver = Uncacheable;
        let memo: CachedMethod<Uncacheable, i32, i32, Lru<i32, i32>> =
            CachedMethod::with_passthrough(|_: &Uncacheable| None);

        let mut calls = 0;
        for _ in 0..3 {
            memo.call(&receiver, 1, || {
                calls += 1;
                99
            });
        }
        assert_eq!(calls, 3);
        assert!(memo.cache_info(&receiver).is_none());
    }
}
