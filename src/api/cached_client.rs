//! Recipe detail client that records opened recipes and serves them offline.

use tracing::info;

use crate::feed::{FeedCache, Recipe};

use super::client::RecipeApiClient;
use super::error::FeedError;

/// Indicates where fetched data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Network unavailable, serving the visited-recipes cache
  Offline,
}

/// Fetched data plus where it came from.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
  pub data: T,
  pub source: CacheSource,
}

impl<T> Fetched<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  pub fn offline(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
    }
  }
}

/// Recipe client with transparent visited-recipe caching.
///
/// Every successfully opened recipe goes to the front of the visited LRU.
/// When the API is unavailable the last copy seen is returned instead.
#[derive(Clone)]
pub struct CachedRecipeClient {
  inner: RecipeApiClient,
  cache: FeedCache,
}

impl CachedRecipeClient {
  pub fn new(inner: RecipeApiClient, cache: FeedCache) -> Self {
    Self { inner, cache }
  }

  /// Open a recipe by id.
  pub async fn get_recipe(&self, id: &str) -> Result<Fetched<Recipe>, FeedError> {
    match self.inner.get_recipe(id).await {
      Ok(recipe) => {
        self.cache.save_visited_recipe(&recipe);
        Ok(Fetched::from_network(recipe))
      }
      Err(err) if err.is_unavailable() => match self.cache.get_visited_recipe(id) {
        Some(recipe) => {
          info!(id, error = %err, "Serving visited recipe while offline");
          Ok(Fetched::offline(recipe))
        }
        None => Err(err),
      },
      Err(err) => Err(err),
    }
  }
}
