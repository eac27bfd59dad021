use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub tmdb: TmdbConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub listing: ListingConfig,
  #[serde(default)]
  pub images: ImagesConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
  pub api_url: String,
  /// ISO 639-1 language passed to every request (e.g., "en-US")
  pub language: Option<String>,
  pub timeout_secs: u64,
}

impl Default for TmdbConfig {
  fn default() -> Self {
    Self {
      api_url: "https://api.themoviedb.org/3/".to_string(),
      language: None,
      timeout_secs: 15,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Database file (default: $XDG_DATA_HOME/reelcache/cache.db)
  pub path: Option<PathBuf>,
  pub configuration_ttl_hours: i64,
  pub page_ttl_minutes: i64,
  pub detail_ttl_hours: i64,
  pub credits_ttl_hours: i64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      path: None,
      configuration_ttl_hours: 72,
      page_ttl_minutes: 60,
      detail_ttl_hours: 24,
      credits_ttl_hours: 24,
    }
  }
}

impl CacheConfig {
  /// Resolve the database path
  pub fn database_path(&self) -> Result<PathBuf> {
    match &self.path {
      Some(path) => Ok(path.clone()),
      None => Ok(data_dir()?.join("cache.db")),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
  /// Items from the tail at which the next page is requested
  pub prefetch_distance: usize,
}

impl Default for ListingConfig {
  fn default() -> Self {
    Self {
      prefetch_distance: 1,
    }
  }
}

/// Preferred size variant per image class
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
  pub poster_size: String,
  pub backdrop_size: String,
  pub profile_size: String,
}

impl Default for ImagesConfig {
  fn default() -> Self {
    Self {
      poster_size: "w342".to_string(),
      backdrop_size: "w780".to_string(),
      profile_size: "w185".to_string(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Default filter directive, overridden by REELCACHE_LOG
  pub level: String,
  /// Log file directory (default: data directory)
  pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      directory: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./reelcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/reelcache/config.yaml
  ///
  /// Falls back to defaults when no file exists.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("reelcache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("reelcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file deserializes to null
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    let config: Config = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    let cache = &self.cache;
    for (name, value) in [
      ("configuration_ttl_hours", cache.configuration_ttl_hours),
      ("page_ttl_minutes", cache.page_ttl_minutes),
      ("detail_ttl_hours", cache.detail_ttl_hours),
      ("credits_ttl_hours", cache.credits_ttl_hours),
    ] {
      if value < 0 {
        return Err(eyre!("cache.{} must not be negative, got {}", name, value));
      }
    }
    Ok(())
  }

  /// Get the TMDB API key from environment variables.
  ///
  /// Checks REELCACHE_TMDB_API_KEY first, then TMDB_API_KEY as fallback.
  pub fn get_api_key() -> Result<String> {
    std::env::var("REELCACHE_TMDB_API_KEY")
      .or_else(|_| std::env::var("TMDB_API_KEY"))
      .map_err(|_| {
        eyre!("TMDB API key not found. Set REELCACHE_TMDB_API_KEY or TMDB_API_KEY environment variable.")
      })
  }
}

/// Application data directory
pub fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("reelcache"))
}
