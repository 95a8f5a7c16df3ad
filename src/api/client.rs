use color_eyre::{eyre::eyre, Result};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::config::ApiConfig;
use crate::feed::{Cursor, FeedPage, Recipe};

use super::api_types::{ApiErrorBody, ApiFeedResponse, ApiRecipeResponse};
use super::error::FeedError;
use super::source::RemoteFeedSource;

const CONNECTION_ERROR: &str = "Could not connect to the API";
const GENERIC_API_ERROR: &str = "API request failed";

/// Recipe API client
#[derive(Clone)]
pub struct RecipeApiClient {
  http: reqwest::Client,
  base_url: Url,
  page_limit: Option<u32>,
}

impl RecipeApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base = config.base_url();
    let base_url = Url::parse(&base).map_err(|e| eyre!("Invalid API URL {}: {}", base, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("Invalid API URL {}: not a base URL", base));
    }

    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let http = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      page_limit: config.page_limit,
    })
  }

  /// Get a single recipe by id
  pub async fn get_recipe(&self, id: &str) -> Result<Recipe, FeedError> {
    let url = self.endpoint(&["recipes", id]);

    self
      .get_json::<ApiRecipeResponse>(url)
      .await?
      .map(ApiRecipeResponse::into_recipe)
      .ok_or_else(|| FeedError::InvalidResponse(format!("recipe {} has no content", id)))
  }

  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  /// GET `url` and decode the JSON body. `None` for 204 or an empty body.
  async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, FeedError> {
    let response = self
      .http
      .get(url)
      .header(ACCEPT, "application/json")
      .send()
      .await
      .map_err(|e| FeedError::Network(format!("{}: {}", CONNECTION_ERROR, e)))?;

    let status = response.status();
    if status == StatusCode::NO_CONTENT {
      return Ok(None);
    }

    let body = response
      .bytes()
      .await
      .map_err(|e| FeedError::Network(format!("{}: {}", CONNECTION_ERROR, e)))?;

    if !status.is_success() {
      let message = serde_json::from_slice::<ApiErrorBody>(&body)
        .ok()
        .and_then(ApiErrorBody::into_message)
        .unwrap_or_else(|| GENERIC_API_ERROR.to_string());
      return Err(FeedError::Http {
        status: status.as_u16(),
        message,
      });
    }

    if body.is_empty() {
      return Ok(None);
    }

    serde_json::from_slice(&body)
      .map(Some)
      .map_err(|e| FeedError::InvalidResponse(e.to_string()))
  }
}

#[async_trait::async_trait]
impl RemoteFeedSource for RecipeApiClient {
  async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<FeedPage, FeedError> {
    let mut url = self.endpoint(&["recipes"]);

    let mut params: Vec<(&str, String)> = Vec::new();
    if let Some(cursor) = cursor {
      params.push(("cursor", cursor.as_str().to_string()));
    }
    if let Some(limit) = self.page_limit {
      params.push(("limit", limit.to_string()));
    }
    if !params.is_empty() {
      url.query_pairs_mut().extend_pairs(params);
    }

    let page = self
      .get_json::<ApiFeedResponse>(url)
      .await?
      .map(ApiFeedResponse::into_page)
      .unwrap_or_else(FeedPage::empty);

    Ok(page)
  }
}
