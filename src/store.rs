use crate::error::CacheError;

/// The base cache mapping: size accounting and the operations every policy
/// shares, with no eviction rule of its own. Each policy (`Lru`, `Mru`,
/// `Lfu`, `Rr`, `Fifo`, `Ttl`) implements this trait directly rather than
/// inheriting a default `popitem`, since the victim-selection rule is the
/// one thing that differs between them.
pub trait Store<K, V> {
    /// Looks up `k`, applying this policy's access bookkeeping (e.g. LRU
    /// moves the entry to the most-recent end). Fails with `KeyNotPresent`
    /// if `k` is not live.
    fn get(&mut self, k: &K) -> Result<&V, CacheError>;

    /// Reports liveness without the access-bookkeeping side effect of `get`.
    fn contains(&self, k: &K) -> bool;

    /// Inserts `v` under `k`. If `sizeof(v) > maxsize` the cache is left
    /// unchanged and `ValueTooLarge` is returned. Otherwise entries are
    /// evicted via `popitem` until there's room.
    fn insert(&mut self, k: K, v: V) -> Result<(), CacheError>;

    /// Removes `k`, failing with `KeyNotPresent` if it is not live.
    fn delete(&mut self, k: &K) -> Result<V, CacheError>;

    /// Selects and removes this policy's eviction victim. `Empty` if no
    /// live entry remains.
    fn popitem(&mut self) -> Result<(K, V), CacheError>;

    /// Removes every entry and resets `currsize` to 0; `maxsize` is kept.
    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn maxsize(&self) -> usize;

    fn currsize(&self) -> usize;

    /// The weight a value contributes to `currsize`. The default policy
    /// constructors use `|_| 1`.
    fn getsizeof(&self, v: &V) -> usize;

    /// Keys in this policy's iteration order. Must never mutate that order.
    fn iter_keys(&self) -> Box<dyn Iterator<Item = &K> + '_>;

    /// Like `delete`, but returns `default` instead of failing when `k` is
    /// absent and a default was supplied; fails with `KeyNotPresent` only
    /// when no default was given and the key is absent. Grounded on
    /// `cachetools.Cache.pop(key, default)`, which delegates to
    /// `MutableMapping.pop`.
    fn pop(&mut self, k: &K, default: Option<V>) -> Result<V, CacheError> {
        match self.delete(k) {
            Ok(v) => Ok(v),
            Err(CacheError::KeyNotPresent) => default.ok_or(CacheError::KeyNotPresent),
            Err(e) => Err(e),
        }
    }

    /// Returns the live value for `k`, inserting `v` first if absent.
    /// Grounded on `cachetools.Cache.setdefault`.
    fn setdefault(&mut self, k: K, v: V) -> Result<&V, CacheError>
    where
        K: Clone,
    {
        if !self.contains(&k) {
            self.insert(k.clone(), v)?;
        }
        self.get(&k)
    }
}

pub fn default_sizeof<V>(_: &V) -> usize {
    1
}

pub type SizeFn<V> = Box<dyn Fn(&V) -> usize + Send + Sync>;
pub type MissingFn<K, V> = Box<dyn FnMut(&K) -> V + Send>;
