mod api_types;
mod cached_client;
mod client;
mod error;
mod source;

pub use cached_client::{CacheSource, CachedRecipeClient, Fetched};
pub use client::RecipeApiClient;
pub use error::FeedError;
pub use source::RemoteFeedSource;
