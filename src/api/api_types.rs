//! Serde-deserializable types matching recipe API responses.
//!
//! These types are separate from domain types to absorb the response shape
//! variations while keeping `FeedPage` focused on what the engine needs.

use serde::Deserialize;

use crate::feed::{Cursor, FeedPage, Recipe};

// ============================================================================
// Feed endpoint response
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ApiMeta {
  #[serde(rename = "nextCursor", default)]
  pub next_cursor: Option<Cursor>,
}

/// `GET /recipes` body: `{data, meta: {nextCursor}}`, with some deployments
/// putting `nextCursor` at the top level instead.
#[derive(Debug, Deserialize, Default)]
pub struct ApiFeedResponse {
  #[serde(default)]
  pub data: Option<Vec<Recipe>>,
  #[serde(default)]
  pub meta: Option<ApiMeta>,
  #[serde(rename = "nextCursor", default)]
  pub next_cursor: Option<Cursor>,
}

impl ApiFeedResponse {
  pub fn into_page(self) -> FeedPage {
    let next_cursor = self
      .meta
      .and_then(|meta| meta.next_cursor)
      .or(self.next_cursor)
      // An empty token means the same as no token
      .filter(|cursor| !cursor.as_str().is_empty());

    FeedPage {
      data: self.data.unwrap_or_default(),
      next_cursor,
    }
  }
}

// ============================================================================
// Recipe detail endpoint response
// ============================================================================

/// `GET /recipes/{id}` body, either wrapped in `data` or bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiRecipeResponse {
  Wrapped { data: Recipe },
  Bare(Recipe),
}

impl ApiRecipeResponse {
  pub fn into_recipe(self) -> Recipe {
    match self {
      Self::Wrapped { data } => data,
      Self::Bare(recipe) => recipe,
    }
  }
}

// ============================================================================
// Error body
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ApiErrorBody {
  pub message: Option<String>,
  pub error: Option<String>,
}

impl ApiErrorBody {
  pub fn into_message(self) -> Option<String> {
    self.message.or(self.error)
  }
}
