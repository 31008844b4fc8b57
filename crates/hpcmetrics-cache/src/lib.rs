// SPDX-License-Identifier: Apache-2.0

//! Size-bounded LRU value cache with deduplicated concurrent computation.
//!
//! [`Cache`] is the general-purpose core: a single-lock, slab-backed intrusive LRU list keyed by
//! an arbitrary `K`, used both directly (for computed query results) and through the [`http`]
//! module's response-caching wrapper for GET-style admin and query endpoints.

mod lru;

pub mod http;

pub use http::{cached, CachedResponse};
pub use lru::Cache;
