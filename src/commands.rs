//! Subcommand implementations for the culina CLI.

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;

use crate::api::{CacheSource, CachedRecipeClient, RecipeApiClient};
use crate::config::Config;
use crate::feed::{
  EngineState, FeedCache, FeedNotice, FeedReconciler, FeedStatus, ReconcilerOptions, Seed,
};

/// Show the feed, paging `pages` times past whatever bootstrap produced.
///
/// With `fresh`, the first page is prefetched and offered as the seed, the
/// same way a server-rendered first page would be.
pub async fn feed(config: &Config, cache: FeedCache, pages: usize, fresh: bool) -> Result<()> {
  let client = RecipeApiClient::new(&config.api)?;
  let seed = if fresh {
    Seed::prefetch(&client).await
  } else {
    Seed::empty()
  };

  let reconciler = FeedReconciler::new(client, cache).with_options(ReconcilerOptions {
    slow_load_after: config.feed.slow_load_after(),
  });
  let mut updates = reconciler.subscribe();

  // Bootstrap, reporting the slow-load signal while we wait
  let init = reconciler.initialize(seed);
  tokio::pin!(init);
  let mut announced = false;
  loop {
    tokio::select! {
      _ = &mut init => break,
      Ok(()) = updates.changed() => {
        if updates.borrow_and_update().show_slow_load_message && !announced {
          eprintln!("Still loading, the server is taking longer than usual...");
          announced = true;
        }
      }
    }
  }

  if reconciler.snapshot().status == FeedStatus::Error {
    eprintln!("Failed to load recipes, retrying once...");
    reconciler.retry().await;
  }

  for _ in 0..pages {
    let state = reconciler.snapshot();
    if state.status != FeedStatus::Success || !state.has_more {
      break;
    }

    reconciler.fetch_more().await;
    if reconciler.snapshot().is_error_loading_more {
      eprintln!("Failed to load more recipes, retrying once...");
      reconciler.retry_load_more().await;
      if reconciler.snapshot().is_error_loading_more {
        break;
      }
    }
  }

  let state = reconciler.snapshot();
  reconciler.dispose();
  print_feed(&state)
}

/// Open one recipe, recording it in the visited cache.
pub async fn open(config: &Config, cache: FeedCache, id: &str) -> Result<()> {
  let client = CachedRecipeClient::new(RecipeApiClient::new(&config.api)?, cache);
  let fetched = client
    .get_recipe(id)
    .await
    .map_err(|e| eyre!("Failed to open recipe {}: {}", id, e))?;

  if fetched.source == CacheSource::Offline {
    eprintln!("Offline mode: showing the last saved copy.");
  }

  let recipe = fetched.data;
  println!("{}", recipe.name);
  println!("  id: {}", recipe.id);
  if let Some(created) = &recipe.created_at {
    println!("  created: {}", render_value(created));
  }
  for (key, value) in &recipe.extra {
    println!("  {}: {}", key, render_value(value));
  }

  Ok(())
}

/// Print cache usage.
pub fn stats(cache: &FeedCache) {
  let stats = cache.get_stats();
  println!("Feed:    {:>4} / {} recipes", stats.feed_count, stats.feed_limit);
  println!(
    "Visited: {:>4} / {} recipes",
    stats.visited_count, stats.visited_limit
  );
}

/// Drop the cached feed and visited recipes.
pub fn clear(cache: &FeedCache) {
  cache.clear_all();
  println!("Cleared cached feed and visited recipes.");
}

fn print_feed(state: &EngineState) -> Result<()> {
  if state.status == FeedStatus::Error {
    return Err(eyre!(
      "Failed to load recipes: {}",
      state.error_message.as_deref().unwrap_or("unknown error")
    ));
  }

  if let Some(FeedNotice::Offline { cached_at }) = &state.notice {
    eprintln!(
      "Offline mode: showing recipes saved at {}",
      cached_at
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M")
    );
  }

  if state.recipes.is_empty() {
    println!("No recipes yet.");
    return Ok(());
  }

  for (i, recipe) in state.recipes.iter().enumerate() {
    println!("{:>4}  {:<14} {}", i + 1, truncate(&recipe.id, 14), recipe.name);
  }

  let tail = if state.is_error_loading_more {
    "could not load more"
  } else if state.has_more {
    "more available"
  } else {
    "end of feed"
  };
  println!();
  println!("{} recipes ({})", state.recipes.len(), tail);

  Ok(())
}

/// Strings print bare, everything else as compact JSON.
fn render_value(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// Truncate to `max` characters, marking the cut with an ellipsis.
fn truncate(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("0123456789abc", 10), "012345678…");
  }

  #[test]
  fn test_render_value() {
    assert_eq!(render_value(&serde_json::json!("2024-05-01")), "2024-05-01");
    assert_eq!(render_value(&serde_json::json!(1714557600000i64)), "1714557600000");
  }

  #[test]
  fn test_error_state_is_reported() {
    let state = EngineState {
      status: FeedStatus::Error,
      error_message: Some("Could not connect to the API".to_string()),
      ..EngineState::default()
    };
    let err = print_feed(&state).unwrap_err();
    assert!(err.to_string().contains("Could not connect to the API"));
  }
}
