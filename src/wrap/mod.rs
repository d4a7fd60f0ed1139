//! Memoization wrappers built on top of the `Store` policies.

pub mod function;
pub mod method;

pub use function::{CacheInfo, Cached, MaybeCached};
pub use method::CachedMethod;
