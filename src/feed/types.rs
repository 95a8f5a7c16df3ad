//! Domain types shared by the feed cache, the reconciler and the API client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of a recipe as it appears in the feed.
///
/// Identity is `id`. Display fields the engine does not interpret are kept
/// in `extra` so a cache round trip preserves them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
  #[serde(deserialize_with = "deserialize_id")]
  pub id: String,
  #[serde(default, deserialize_with = "deserialize_name")]
  pub name: String,
  /// ISO string or epoch millis, depending on the deployment; never interpreted
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<serde_json::Value>,
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Recipe {
  pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      created_at: None,
      extra: serde_json::Map::new(),
    }
  }
}

/// Ids are compared as strings; numeric ids on the wire are normalised.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: serde::Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RawId {
    Text(String),
    Number(serde_json::Number),
  }

  Ok(match RawId::deserialize(deserializer)? {
    RawId::Text(s) => s,
    RawId::Number(n) => n.to_string(),
  })
}

/// A `null` name reads as empty rather than failing the whole page.
fn deserialize_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: serde::Deserializer<'de>,
{
  Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Opaque continuation token issued by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
  pub fn new(token: impl Into<String>) -> Self {
    Self(token.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

/// One page of the remote feed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedPage {
  pub data: Vec<Recipe>,
  /// `None` when the server has no further pages
  pub next_cursor: Option<Cursor>,
}

impl FeedPage {
  /// A "no data" page, as returned for 204 responses.
  pub fn empty() -> Self {
    Self::default()
  }
}

/// The persisted feed record. Always written as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedCachePayload {
  #[serde(with = "chrono::serde::ts_milliseconds")]
  pub timestamp: DateTime<Utc>,
  #[serde(default)]
  pub recipes: Vec<Recipe>,
  #[serde(default)]
  pub next_cursor: Option<Cursor>,
  #[serde(default)]
  pub has_more: bool,
}

/// Storage usage figures for a settings screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
  pub feed_count: usize,
  pub visited_count: usize,
  pub feed_limit: usize,
  pub visited_limit: usize,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_numeric_id_is_normalised() {
    let recipe: Recipe = serde_json::from_value(json!({"id": 42, "name": "Soup"})).unwrap();
    assert_eq!(recipe.id, "42");
    assert_eq!(recipe.name, "Soup");
  }

  #[test]
  fn test_display_fields_survive_round_trip() {
    let input = json!({
      "id": "r1",
      "name": "Paella",
      "createdAt": "2024-05-01T10:00:00Z",
      "imageUrl": "https://img.example/paella.jpg",
      "author": {"username": "ana"}
    });

    let recipe: Recipe = serde_json::from_value(input.clone()).unwrap();
    assert_eq!(recipe.created_at, Some(json!("2024-05-01T10:00:00Z")));
    assert_eq!(recipe.extra["imageUrl"], json!("https://img.example/paella.jpg"));
    assert_eq!(serde_json::to_value(&recipe).unwrap(), input);
  }

  #[test]
  fn test_epoch_created_at_and_null_name_decode() {
    let recipe: Recipe =
      serde_json::from_value(json!({"id": "a", "name": null, "createdAt": 1_714_557_600_000i64}))
        .unwrap();
    assert_eq!(recipe.name, "");
    assert_eq!(recipe.created_at, Some(json!(1_714_557_600_000i64)));
  }

  #[test]
  fn test_payload_uses_camel_case_and_millis() {
    let payload = FeedCachePayload {
      timestamp: DateTime::from_timestamp_millis(1_700_000_000_123).unwrap(),
      recipes: vec![Recipe::new("r1", "Tortilla")],
      next_cursor: Some(Cursor::new("c1")),
      has_more: true,
    };

    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(value["timestamp"], json!(1_700_000_000_123i64));
    assert_eq!(value["nextCursor"], json!("c1"));
    assert_eq!(value["hasMore"], json!(true));
  }
}
