//! Eviction policy.
//!
//! - [`LruKReplacer`] - backward-k-distance victim selection over the
//!   frames marked evictable

mod lru_k;

pub use lru_k::LruKReplacer;
