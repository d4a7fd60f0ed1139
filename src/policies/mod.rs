//! Concrete eviction policies, each implementing [`crate::store::Store`].

pub mod fifo;
pub mod lfu;
pub mod lru;
pub mod mru;
pub mod rr;
pub mod ttl;

pub use fifo::Fifo;
pub use lfu::Lfu;
pub use lru::Lru;
pub use mru::Mru;
pub use rr::Rr;
pub use ttl::Ttl;
