use thiserror::Error;

/// The three error kinds the cache core can raise.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    /// Lookup for a key that is not live (includes expired TTL entries).
    #[error("key not present in cache")]
    KeyNotPresent,

    /// A single value's size exceeds `maxsize`; the cache is left unchanged.
    #[error("value of size {size} exceeds cache maxsize {maxsize}")]
    ValueTooLarge { size: usize, maxsize: usize },

    /// `popitem` on an empty (or fully expired) cache.
    #[error("cache is empty")]
    Empty,
}
