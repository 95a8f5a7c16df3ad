//! Feed reconciliation engine.
//!
//! `FeedReconciler` merges the cursor-paginated remote feed with the
//! persisted feed cache and owns the feed's state machine:
//!
//! ```text
//! Loading ──ok──▶ Success ◀──fetch_more──▶ Success
//!    │                          (failures set is_error_loading_more)
//!    └──err──▶ Error ──retry──▶ Loading
//! ```
//!
//! # Example
//!
//! ```ignore
//! let reconciler = FeedReconciler::new(client, cache);
//! let mut updates = reconciler.subscribe();
//!
//! reconciler.initialize(Seed::empty()).await;
//!
//! // Near the bottom of the list
//! reconciler.fetch_more().await;
//!
//! // In render
//! let state = updates.borrow_and_update().clone();
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::RemoteFeedSource;

use super::cache::FeedCache;
use super::state::{EngineState, FeedNotice, FeedStatus};
use super::types::{Cursor, FeedPage, Recipe};

/// How long the feed may stay in `Loading` before the slow-load flag is raised.
pub const SLOW_LOAD_AFTER: Duration = Duration::from_millis(3000);

/// First batch of recipes supplied from outside the engine, e.g. a page
/// fetched ahead of time during startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Seed {
  pub recipes: Vec<Recipe>,
  pub cursor: Option<Cursor>,
}

impl Seed {
  pub fn empty() -> Self {
    Self::default()
  }

  /// Fetch the first page to use as a seed.
  ///
  /// Never fails: any error yields an empty seed so bootstrap falls through to
  /// the cache and the regular initial fetch.
  pub async fn prefetch<S: RemoteFeedSource + ?Sized>(source: &S) -> Self {
    match source.fetch_page(None).await {
      Ok(page) => page.into(),
      Err(e) => {
        warn!(error = %e, "Failed to prefetch initial recipes");
        Self::empty()
      }
    }
  }
}

impl From<FeedPage> for Seed {
  fn from(page: FeedPage) -> Self {
    Self {
      recipes: page.data,
      cursor: page.next_cursor,
    }
  }
}

#[derive(Debug, Clone, Copy)]
pub struct ReconcilerOptions {
  pub slow_load_after: Duration,
}

impl Default for ReconcilerOptions {
  fn default() -> Self {
    Self {
      slow_load_after: SLOW_LOAD_AFTER,
    }
  }
}

/// Orchestrates the feed: bootstrap, initial fetch with offline fallback,
/// guarded pagination and forward-only persistence.
///
/// All operations take `&self`; overlapping calls are serialised by the state
/// flags, not by a lock held across network calls. Responses are tagged with
/// a generation so that a response superseded by `fetch_initial` or
/// `dispose` is dropped instead of applied.
pub struct FeedReconciler<S> {
  source: S,
  cache: FeedCache,
  state: Arc<watch::Sender<EngineState>>,
  generation: AtomicU64,
  disposed: AtomicBool,
  slow_load_timer: Mutex<Option<JoinHandle<()>>>,
  options: ReconcilerOptions,
}

impl<S: RemoteFeedSource> FeedReconciler<S> {
  pub fn new(source: S, cache: FeedCache) -> Self {
    let (state, _) = watch::channel(EngineState::default());
    Self {
      source,
      cache,
      state: Arc::new(state),
      generation: AtomicU64::new(0),
      disposed: AtomicBool::new(false),
      slow_load_timer: Mutex::new(None),
      options: ReconcilerOptions::default(),
    }
  }

  pub fn with_options(mut self, options: ReconcilerOptions) -> Self {
    self.options = options;
    self
  }

  /// Receive every state change from now on.
  pub fn subscribe(&self) -> watch::Receiver<EngineState> {
    self.state.subscribe()
  }

  /// Copy of the current state.
  pub fn snapshot(&self) -> EngineState {
    self.state.borrow().clone()
  }

  /// Bootstrap the feed from `seed` and the persisted cache.
  ///
  /// The cache wins when the seed is empty or the cache is deeper, which
  /// restores the user's previous scroll depth instead of regressing to a
  /// single fresh page. With nothing usable, falls through to
  /// `fetch_initial`.
  pub async fn initialize(&self, seed: Seed) {
    let seed_len = seed.recipes.len();
    let restored = self.cache.get_feed().filter(|cached| {
      !cached.recipes.is_empty() && (seed_len == 0 || cached.recipes.len() > seed_len)
    });

    let from_cache = restored.is_some();
    let (recipes, next_cursor, has_more) = match restored {
      Some(cached) => {
        info!(
          cached = cached.recipes.len(),
          seed = seed_len,
          "Restoring feed from cache"
        );
        (cached.recipes, cached.next_cursor, cached.has_more)
      }
      None => {
        let has_more = seed.cursor.is_some();
        (seed.recipes, seed.cursor, has_more)
      }
    };

    if recipes.is_empty() {
      self.fetch_initial().await;
      return;
    }

    self.state.send_modify(|s| {
      s.adopt(recipes, next_cursor, has_more);
      s.settle(FeedStatus::Success);
    });
    // A restored feed is already stored; keep its timestamp
    if !from_cache {
      self.persist();
    }
  }

  /// Load the first page from the network, replacing the current feed.
  ///
  /// On failure the cached feed is used if it has content, with an offline
  /// notice; otherwise the feed moves to `Error`.
  pub async fn fetch_initial(&self) {
    if self.disposed.load(Ordering::SeqCst) {
      return;
    }

    // Bumped under the state lock, together with the switch to `Loading`
    let mut generation = 0;
    self.state.send_modify(|s| {
      generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
      s.status = FeedStatus::Loading;
      s.error_message = None;
      s.notice = None;
      s.is_loading_more = false;
      s.is_error_loading_more = false;
    });
    self.arm_slow_load_timer();

    let result = self.source.fetch_page(None).await;
    if !self.is_current(generation) {
      debug!("Discarding superseded initial feed response");
      return;
    }
    self.cancel_slow_load_timer();

    match result {
      Ok(page) => {
        let has_more = page.next_cursor.is_some() && !page.data.is_empty();
        debug!(count = page.data.len(), has_more, "Loaded initial feed");
        self.state.send_modify(|s| {
          s.adopt(page.data, page.next_cursor, has_more);
          s.settle(FeedStatus::Success);
        });
        self.persist();
      }
      Err(err) => {
        warn!(error = %err, "Initial feed fetch failed");
        match self
          .cache
          .get_feed()
          .filter(|cached| !cached.recipes.is_empty())
        {
          Some(cached) => {
            info!(
              count = cached.recipes.len(),
              "Serving cached feed while offline"
            );
            let notice = FeedNotice::Offline {
              cached_at: cached.timestamp,
            };
            self.state.send_modify(|s| {
              s.adopt(cached.recipes, cached.next_cursor, cached.has_more);
              s.notice = Some(notice);
              s.settle(FeedStatus::Success);
            });
          }
          None => self.state.send_modify(|s| {
            s.error_message = Some(err.to_string());
            s.settle(FeedStatus::Error);
          }),
        }
      }
    }
  }

  /// Manual retry from the `Error` state.
  pub async fn retry(&self) {
    self.fetch_initial().await;
  }

  /// Load the next page and append the recipes not already in the feed.
  ///
  /// No-op while a page is in flight, when the feed is exhausted, after a
  /// pagination failure (until `retry_load_more`), or outside `Success`.
  pub async fn fetch_more(&self) {
    if self.disposed.load(Ordering::SeqCst) {
      return;
    }

    // Check and claim the in-flight flag in one critical section
    let mut cursor = None;
    let mut generation = 0;
    let started = self.state.send_if_modified(|s| {
      if s.status != FeedStatus::Success
        || s.is_loading_more
        || !s.has_more
        || s.is_error_loading_more
      {
        return false;
      }
      s.is_loading_more = true;
      cursor = s.next_cursor.clone();
      generation = self.generation.load(Ordering::SeqCst);
      true
    });
    if !started {
      return;
    }

    let result = self.source.fetch_page(cursor.as_ref()).await;
    if !self.is_current(generation) {
      debug!("Discarding superseded pagination response");
      return;
    }

    match result {
      Ok(page) => {
        let received = page.data.len();
        let mut appended = 0usize;
        self.state.send_modify(|s| {
          let mut seen: HashSet<String> = s.recipes.iter().map(|r| r.id.clone()).collect();
          for recipe in page.data {
            if seen.insert(recipe.id.clone()) {
              s.recipes.push(recipe);
              appended += 1;
            }
          }
          // An empty page ends pagination even if the server sent a cursor
          s.has_more = page.next_cursor.is_some() && received > 0;
          s.next_cursor = page.next_cursor;
          s.is_loading_more = false;
        });
        debug!(received, appended, "Loaded more recipes");
        self.persist();
      }
      Err(err) => {
        warn!(error = %err, "Failed to load more recipes");
        self.state.send_modify(|s| {
          s.is_error_loading_more = true;
          s.is_loading_more = false;
        });
      }
    }
  }

  /// Clear a pagination failure and try the next page again.
  pub async fn retry_load_more(&self) {
    self
      .state
      .send_if_modified(|s| std::mem::replace(&mut s.is_error_loading_more, false));
    self.fetch_more().await;
  }

  /// Drop a recipe from the in-memory feed after it was deleted elsewhere.
  ///
  /// For interactive front ends with a delete action; the one-shot CLI
  /// never removes recipes.
  #[allow(dead_code)]
  pub(crate) fn remove_recipe(&self, id: &str) {
    let removed = self.state.send_if_modified(|s| {
      let before = s.recipes.len();
      s.recipes.retain(|r| r.id != id);
      s.recipes.len() != before
    });
    if removed {
      self.persist();
    }
  }

  /// Forward-only persistence: never replace a deeper cached feed with a
  /// shallower in-memory one.
  fn persist(&self) {
    let state = self.state.borrow();
    if state.recipes.is_empty() {
      return;
    }

    let cached_len = self.cache.cached_feed_len();
    if state.recipes.len() < cached_len {
      debug!(
        current = state.recipes.len(),
        cached = cached_len,
        "Keeping deeper cached feed"
      );
      return;
    }

    self
      .cache
      .save_feed(&state.recipes, state.next_cursor.as_ref(), state.has_more);
  }

  fn is_current(&self, generation: u64) -> bool {
    self.generation.load(Ordering::SeqCst) == generation
  }
}

impl<S> FeedReconciler<S> {
  /// Stop the reconciler: in-flight responses are discarded, further
  /// operations are no-ops and the slow-load timer is cancelled.
  pub fn dispose(&self) {
    self.disposed.store(true, Ordering::SeqCst);
    self.generation.fetch_add(1, Ordering::SeqCst);
    self.cancel_slow_load_timer();
  }

  fn arm_slow_load_timer(&self) {
    let state = Arc::clone(&self.state);
    let delay = self.options.slow_load_after;
    let handle = tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      state.send_if_modified(|s| {
        if s.status == FeedStatus::Loading && !s.show_slow_load_message {
          s.show_slow_load_message = true;
          true
        } else {
          false
        }
      });
    });

    if let Ok(mut timer) = self.slow_load_timer.lock() {
      if let Some(previous) = timer.replace(handle) {
        previous.abort();
      }
    }
  }

  fn cancel_slow_load_timer(&self) {
    if let Ok(mut timer) = self.slow_load_timer.lock() {
      if let Some(handle) = timer.take() {
        handle.abort();
      }
    }
  }
}

impl<S> Drop for FeedReconciler<S> {
  fn drop(&mut self) {
    self.cancel_slow_load_timer();
  }
}
