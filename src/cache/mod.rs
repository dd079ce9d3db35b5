//! Optional response cache.
//!
//! The client consults the cache for `GET` calls only. A hit is returned without taking a gate
//! permit or touching the network; successful `GET` envelopes are stored.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheManager`] | TTL, key prefix and hit/miss statistics over a backend |
//! | [`CacheConfig`] | Cache behavior settings |
//! | [`CacheBackend`] | Trait for custom backends |
//! | [`MemoryCache`] | In-memory backend, least-recently-used eviction |
//! | [`NullCache`] | Backend that stores nothing |
//! | [`CacheKey`] | Request fingerprint |
//!
//! ```rust
//! use base_api_client::cache::{CacheConfig, CacheManager, MemoryCache};
//! use std::time::Duration;
//!
//! let cache = CacheManager::new(
//!     CacheConfig::new().with_ttl(Duration::from_secs(300)),
//!     Box::new(MemoryCache::new(1000)),
//! );
//! assert_eq!(cache.backend_name(), "memory");
//! ```

mod backend;
mod key;
mod manager;

pub use backend::{CacheBackend, MemoryCache, NullCache};
pub use key::CacheKey;
pub use manager::{CacheConfig, CacheManager, CacheStats};
