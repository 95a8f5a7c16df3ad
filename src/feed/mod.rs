//! Offline-capable recipe feed.
//!
//! - `FeedCache`: bounded feed list (keep-head) and visited-recipe LRU
//! - `FeedReconciler`: merges server pages with the cache and owns the feed
//!   state machine

mod cache;
mod reconciler;
mod state;
mod types;

pub use cache::{CacheLimits, FeedCache, FEED_MAX_ITEMS, VISITED_MAX_ITEMS};
pub use reconciler::{FeedReconciler, ReconcilerOptions, Seed, SLOW_LOAD_AFTER};
pub use state::{EngineState, FeedNotice, FeedStatus};
pub use types::{CacheStats, Cursor, FeedCachePayload, FeedPage, Recipe};
