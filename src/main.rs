mod api;
mod commands;
mod config;
mod feed;
mod logging;
mod store;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::feed::FeedCache;
use crate::store::{MemoryMedium, PersistentStore, SqliteMedium};

#[derive(Parser, Debug)]
#[command(name = "culina")]
#[command(about = "Browse the recipe feed, online or off")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./culina.yaml or $XDG_CONFIG_HOME/culina/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Keep the cache in memory for this run only
  #[arg(long, global = true)]
  ephemeral: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show the recipe feed
  Feed {
    /// Number of additional pages to load
    #[arg(short, long, default_value_t = 0)]
    pages: usize,

    /// Fetch the first page before consulting the cache
    #[arg(long)]
    fresh: bool,
  },
  /// Open a recipe and remember it for offline use
  Open { id: String },
  /// Show cache usage
  Stats,
  /// Remove the cached feed and visited recipes
  Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.logging)?;

  let cache = FeedCache::new(open_store(&config, args.ephemeral)?).with_limits(config.cache.limits());

  match args.command {
    Command::Feed { pages, fresh } => commands::feed(&config, cache, pages, fresh).await?,
    Command::Open { id } => commands::open(&config, cache, &id).await?,
    Command::Stats => commands::stats(&cache),
    Command::Clear => commands::clear(&cache),
  }

  Ok(())
}

fn open_store(config: &Config, ephemeral: bool) -> Result<PersistentStore> {
  if ephemeral {
    return Ok(PersistentStore::new(Arc::new(MemoryMedium::new(
      config.cache.quota_bytes,
    ))));
  }

  let path = match &config.cache.path {
    Some(path) => path.clone(),
    None => SqliteMedium::default_path()?,
  };
  let medium = SqliteMedium::open(&path, config.cache.quota_bytes)?;

  Ok(PersistentStore::new(Arc::new(medium)))
}
