//! Caching layer for catalog data and offline support.
//!
//! - Every cached value carries its insertion time in an entry ledger
//! - Freshness is decided per category by a fixed TTL
//! - Only fresh entries are served; expired ones fall through to the remote
//!   source and are purged when that fails
//! - Listing pages belong to the section that was last committed, switching
//!   sections drops the other section's pages

pub mod clock;
pub mod freshness;
pub mod reconciler;
pub mod storage;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use freshness::{CacheTtls, EntryLedger, FreshnessPolicy};
pub use reconciler::CacheReconciler;
pub use storage::{CatalogStore, MemoryStore, SqliteStore};
pub use traits::{CacheCategory, CacheResult, Cacheable};
