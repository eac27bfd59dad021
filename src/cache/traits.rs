//! Core traits and types for the caching system.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

use crate::catalog::types::{Credits, ImageConfiguration, MovieDetail, PageNumber, Section};

/// Data category. Each category carries its own time-to-live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
  Configuration,
  Page,
  Detail,
  Credits,
}

impl CacheCategory {
  pub fn as_str(self) -> &'static str {
    match self {
      CacheCategory::Configuration => "configuration",
      CacheCategory::Page => "page",
      CacheCategory::Detail => "detail",
      CacheCategory::Credits => "credits",
    }
  }
}

impl fmt::Display for CacheCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Ledger key of a stored page
pub fn page_key(section: Section, page: PageNumber) -> String {
  format!("{}:{}", section.key(), page)
}

/// Ledger key of the configuration singleton
pub const CONFIGURATION_KEY: &str = "configuration";

/// Trait for single values stored in the generic entity cache.
///
/// Pages are kept separately since they are partitioned by section.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Unique identifier within the category (e.g., movie id)
  fn cache_key(&self) -> String;

  fn category() -> CacheCategory;
}

impl Cacheable for ImageConfiguration {
  fn cache_key(&self) -> String {
    CONFIGURATION_KEY.to_string()
  }

  fn category() -> CacheCategory {
    CacheCategory::Configuration
  }
}

impl Cacheable for MovieDetail {
  fn cache_key(&self) -> String {
    self.movie.id.to_string()
  }

  fn category() -> CacheCategory {
    CacheCategory::Detail
  }
}

impl Cacheable for Credits {
  fn cache_key(&self) -> String {
    self.movie_id.to_string()
  }

  fn category() -> CacheCategory {
    CacheCategory::Credits
  }
}

/// Outcome of a reconciled lookup.
///
/// `Miss` only means no authoritative value could be produced. Turning it into
/// a user-facing error is left to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheResult<T> {
  Hit(T),
  Miss,
}

impl<T> CacheResult<T> {
  pub fn is_hit(&self) -> bool {
    matches!(self, CacheResult::Hit(_))
  }

  pub fn is_miss(&self) -> bool {
    matches!(self, CacheResult::Miss)
  }

  pub fn into_option(self) -> Option<T> {
    match self {
      CacheResult::Hit(value) => Some(value),
      CacheResult::Miss => None,
    }
  }
}

impl<T> From<Option<T>> for CacheResult<T> {
  fn from(value: Option<T>) -> Self {
    value.map_or(CacheResult::Miss, CacheResult::Hit)
  }
}
