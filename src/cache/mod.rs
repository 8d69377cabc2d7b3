//! Caching module for Underfoot
//!
//! A lookup walks three tiers and stops at the first answer:
//!
//! 1. memory: in-process, keyed by the lower-cased pair
//! 2. semantic: embedding similarity against previously stored queries
//! 3. exact: SHA-256 of the normalized pair in the persistent store
//!
//! Stores write through all three with an adaptive TTL. [`CacheMaintenance`]
//! owns the periodic purge and eviction.

mod entry;
mod exact;
mod hierarchy;
mod key;
mod maintenance;
mod memory;
mod semantic;
mod store;
mod tier;

pub use entry::{
    CacheEntry, EvictionPolicy, LocationRecord, PopularQuery, SimilarMatch, StoreStatistics,
};
pub use exact::ExactTier;
pub use hierarchy::{CacheAnalytics, CacheHierarchy, CleanupReport};
pub use key::CacheKey;
pub use maintenance::CacheMaintenance;
pub use memory::MemoryTier;
pub use semantic::SemanticTier;
pub use store::{cosine_similarity, InMemoryStore, PersistentStore, SupabaseStore};
pub use tier::{CacheLookup, CacheSource, CacheTier, TierHit};
