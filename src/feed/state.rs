use chrono::{DateTime, Utc};

use super::types::{Cursor, Recipe};

/// Top-level status of the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
  Loading,
  Success,
  Error,
}

/// Advisory notice shown alongside usable content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedNotice {
  /// The network was unavailable; the feed was hydrated from the cache
  Offline { cached_at: DateTime<Utc> },
}

/// Everything a feed screen needs to render.
///
/// Owned by `FeedReconciler`; consumers get clones via `snapshot()` or a
/// `watch::Receiver`.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
  pub status: FeedStatus,
  pub recipes: Vec<Recipe>,
  pub next_cursor: Option<Cursor>,
  pub has_more: bool,
  pub is_loading_more: bool,
  /// Pagination failed; blocks `fetch_more` until `retry_load_more`
  pub is_error_loading_more: bool,
  pub error_message: Option<String>,
  pub show_slow_load_message: bool,
  pub notice: Option<FeedNotice>,
}

impl Default for EngineState {
  fn default() -> Self {
    Self {
      status: FeedStatus::Loading,
      recipes: Vec::new(),
      next_cursor: None,
      has_more: true,
      is_loading_more: false,
      is_error_loading_more: false,
      error_message: None,
      show_slow_load_message: false,
      notice: None,
    }
  }
}

impl EngineState {
  /// Replace the feed contents wholesale.
  pub(crate) fn adopt(&mut self, recipes: Vec<Recipe>, next_cursor: Option<Cursor>, has_more: bool) {
    self.recipes = recipes;
    self.next_cursor = next_cursor;
    self.has_more = has_more;
  }

  /// Move to a settled status. The slow-load flag only lives while loading.
  pub(crate) fn settle(&mut self, status: FeedStatus) {
    self.status = status;
    self.show_slow_load_message = false;
  }
}
