//! Bounded feed and visited-recipe caches on top of `PersistentStore`.

use chrono::Utc;
use tracing::debug;

use crate::store::PersistentStore;

use super::types::{CacheStats, Cursor, FeedCachePayload, Recipe};

/// Maximum number of feed items kept in the persisted feed.
pub const FEED_MAX_ITEMS: usize = 150;
/// Maximum number of recently opened recipes kept.
pub const VISITED_MAX_ITEMS: usize = 100;

const FEED_KEY: &str = "culina_feed_cache";
const VISITED_KEY: &str = "culina_visited_cache";

/// Size caps for both cache shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
  pub feed_max_items: usize,
  pub visited_max_items: usize,
}

impl Default for CacheLimits {
  fn default() -> Self {
    Self {
      feed_max_items: FEED_MAX_ITEMS,
      visited_max_items: VISITED_MAX_ITEMS,
    }
  }
}

/// Two-shaped cache: an insertion-ordered feed and an LRU list of opened
/// recipes. Holds nothing but its store handle; every call reads or writes
/// through to storage.
#[derive(Clone)]
pub struct FeedCache {
  store: PersistentStore,
  limits: CacheLimits,
}

impl FeedCache {
  pub fn new(store: PersistentStore) -> Self {
    Self {
      store,
      limits: CacheLimits::default(),
    }
  }

  pub fn with_limits(mut self, limits: CacheLimits) -> Self {
    self.limits = limits;
    self
  }

  /// Persist the feed, keeping only the first `feed_max_items` entries.
  ///
  /// Keep-head: on overflow the most recently appended (older) items are
  /// dropped so what the user scrolled through from the top survives.
  pub fn save_feed(&self, recipes: &[Recipe], next_cursor: Option<&Cursor>, has_more: bool) {
    let kept = recipes.len().min(self.limits.feed_max_items);
    let payload = FeedCachePayload {
      timestamp: Utc::now(),
      recipes: recipes[..kept].to_vec(),
      next_cursor: next_cursor.cloned(),
      has_more,
    };
    self.store.set(FEED_KEY, &payload);
  }

  pub fn get_feed(&self) -> Option<FeedCachePayload> {
    self.store.get(FEED_KEY)
  }

  /// Number of recipes in the persisted feed (0 when absent).
  pub fn cached_feed_len(&self) -> usize {
    self.get_feed().map(|feed| feed.recipes.len()).unwrap_or(0)
  }

  /// Record an opened recipe at the front of the visited list.
  pub fn save_visited_recipe(&self, recipe: &Recipe) {
    if recipe.id.is_empty() {
      return;
    }

    let mut visited = self.visited();
    visited.retain(|r| r.id != recipe.id);
    visited.insert(0, recipe.clone());
    visited.truncate(self.limits.visited_max_items);

    self.store.set(VISITED_KEY, &visited);
    debug!(
      id = %recipe.id,
      count = visited.len(),
      limit = self.limits.visited_max_items,
      "Saved visited recipe"
    );
  }

  pub fn get_visited_recipe(&self, id: &str) -> Option<Recipe> {
    self.visited().into_iter().find(|r| r.id == id)
  }

  /// Remove the feed and visited records. Other keys in the shared store
  /// (session data) are left alone.
  pub fn clear_all(&self) {
    self.store.remove(FEED_KEY);
    self.store.remove(VISITED_KEY);
  }

  pub fn get_stats(&self) -> CacheStats {
    CacheStats {
      feed_count: self.cached_feed_len(),
      visited_count: self.visited().len(),
      feed_limit: self.limits.feed_max_items,
      visited_limit: self.limits.visited_max_items,
    }
  }

  fn visited(&self) -> Vec<Recipe> {
    self.store.get(VISITED_KEY).unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{MemoryMedium, StorageMedium};
  use pretty_assertions::assert_eq;
  use std::sync::Arc;

  const SESSION_KEY: &str = "culina_user_session";

  fn recipes(range: std::ops::Range<usize>) -> Vec<Recipe> {
    range
      .map(|i| Recipe::new(format!("r{}", i), format!("Recipe {}", i)))
      .collect()
  }

  fn ids(recipes: &[Recipe]) -> Vec<&str> {
    recipes.iter().map(|r| r.id.as_str()).collect()
  }

  fn cache() -> (FeedCache, Arc<MemoryMedium>) {
    let medium = Arc::new(MemoryMedium::unbounded());
    (FeedCache::new(PersistentStore::new(medium.clone())), medium)
  }

  #[test]
  fn test_save_feed_round_trip() {
    let (cache, _) = cache();
    let list = recipes(0..3);
    cache.save_feed(&list, Some(&Cursor::new("c1")), true);

    let feed = cache.get_feed().unwrap();
    assert_eq!(feed.recipes, list);
    assert_eq!(feed.next_cursor, Some(Cursor::new("c1")));
    assert!(feed.has_more);
  }

  #[test]
  fn test_save_feed_keeps_head_on_overflow() {
    let (cache, _) = cache();
    cache.save_feed(&recipes(0..200), None, false);

    let feed = cache.get_feed().unwrap();
    assert_eq!(feed.recipes.len(), FEED_MAX_ITEMS);
    assert_eq!(feed.recipes.first().unwrap().id, "r0");
    assert_eq!(feed.recipes.last().unwrap().id, "r149");
  }

  #[test]
  fn test_get_feed_without_data() {
    let (cache, _) = cache();
    assert!(cache.get_feed().is_none());
    assert_eq!(cache.cached_feed_len(), 0);
  }

  #[test]
  fn test_visited_is_lru() {
    let (cache, _) = cache();
    let a = Recipe::new("a", "A");
    let b = Recipe::new("b", "B");

    cache.save_visited_recipe(&a);
    cache.save_visited_recipe(&b);
    cache.save_visited_recipe(&a);

    let stored: Vec<Recipe> = cache.store.get(VISITED_KEY).unwrap();
    assert_eq!(ids(&stored), vec!["a", "b"]);
  }

  #[test]
  fn test_visited_is_bounded() {
    let (cache, _) = cache();
    for recipe in recipes(0..120) {
      cache.save_visited_recipe(&recipe);
    }

    let stored: Vec<Recipe> = cache.store.get(VISITED_KEY).unwrap();
    assert_eq!(stored.len(), VISITED_MAX_ITEMS);
    // Most recent first, oldest evicted
    assert_eq!(stored[0].id, "r119");
    assert_eq!(stored[VISITED_MAX_ITEMS - 1].id, "r20");
    assert!(cache.get_visited_recipe("r5").is_none());
  }

  #[test]
  fn test_visited_ignores_recipe_without_id() {
    let (cache, _) = cache();
    cache.save_visited_recipe(&Recipe::new("", "Nameless"));
    assert_eq!(cache.get_stats().visited_count, 0);
  }

  #[test]
  fn test_get_visited_recipe_by_id() {
    let (cache, _) = cache();
    cache.save_visited_recipe(&Recipe::new("7", "Gazpacho"));
    assert_eq!(cache.get_visited_recipe("7").unwrap().name, "Gazpacho");
    assert!(cache.get_visited_recipe("8").is_none());
  }

  #[test]
  fn test_clear_all_keeps_session() {
    let (cache, medium) = cache();
    medium.write(SESSION_KEY, r#"{"token":"t"}"#).unwrap();
    cache.save_feed(&recipes(0..2), None, false);
    cache.save_visited_recipe(&Recipe::new("a", "A"));

    cache.clear_all();

    assert!(cache.get_feed().is_none());
    assert_eq!(cache.get_stats().visited_count, 0);
    assert_eq!(
      medium.read(SESSION_KEY).unwrap().as_deref(),
      Some(r#"{"token":"t"}"#)
    );
  }

  #[test]
  fn test_stats() {
    let (cache, _) = cache();
    cache.save_feed(&recipes(0..4), None, false);
    cache.save_visited_recipe(&Recipe::new("a", "A"));

    assert_eq!(
      cache.get_stats(),
      CacheStats {
        feed_count: 4,
        visited_count: 1,
        feed_limit: FEED_MAX_ITEMS,
        visited_limit: VISITED_MAX_ITEMS,
      }
    );
  }

  #[test]
  fn test_custom_limits() {
    let (cache, _) = cache();
    let cache = cache.with_limits(CacheLimits {
      feed_max_items: 2,
      visited_max_items: 1,
    });
    cache.save_feed(&recipes(0..5), None, true);
    cache.save_visited_recipe(&Recipe::new("a", "A"));
    cache.save_visited_recipe(&Recipe::new("b", "B"));

    let stats = cache.get_stats();
    assert_eq!(stats.feed_count, 2);
    assert_eq!(stats.visited_count, 1);
    assert_eq!(cache.get_visited_recipe("b").unwrap().id, "b");
  }
}
