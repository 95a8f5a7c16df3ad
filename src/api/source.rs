use crate::feed::{Cursor, FeedPage};

use super::error::FeedError;

/// Network side of the feed: fetch one page given an optional cursor.
///
/// A missing cursor requests the first page. An empty page (including a 204
/// response) is a valid result, not an error.
#[async_trait::async_trait]
pub trait RemoteFeedSource: Send + Sync {
  async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<FeedPage, FeedError>;
}
