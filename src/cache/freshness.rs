//! Per-category time-to-live checks.

use chrono::{DateTime, Duration, Utc};
use color_eyre::Result;

use super::traits::CacheCategory;
use crate::config::CacheConfig;

/// Insertion timestamps recorded alongside every stored value.
pub trait EntryLedger {
  /// When the entry was stored, if it was
  fn inserted_at(&self, category: CacheCategory, key: &str) -> Result<Option<DateTime<Utc>>>;

  fn record_insertion(&self, category: CacheCategory, key: &str, at: DateTime<Utc>)
    -> Result<()>;
}

/// Time-to-live for each category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
  pub configuration: Duration,
  pub page: Duration,
  pub detail: Duration,
  pub credits: Duration,
}

impl Default for CacheTtls {
  fn default() -> Self {
    Self::from(&CacheConfig::default())
  }
}

impl From<&CacheConfig> for CacheTtls {
  fn from(config: &CacheConfig) -> Self {
    Self {
      configuration: Duration::hours(config.configuration_ttl_hours),
      page: Duration::minutes(config.page_ttl_minutes),
      detail: Duration::hours(config.detail_ttl_hours),
      credits: Duration::hours(config.credits_ttl_hours),
    }
  }
}

/// Decides whether a stored entry is still valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreshnessPolicy {
  ttls: CacheTtls,
}

impl FreshnessPolicy {
  pub fn new(ttls: CacheTtls) -> Self {
    Self { ttls }
  }

  pub fn ttl(&self, category: CacheCategory) -> Duration {
    match category {
      CacheCategory::Configuration => self.ttls.configuration,
      CacheCategory::Page => self.ttls.page,
      CacheCategory::Detail => self.ttls.detail,
      CacheCategory::Credits => self.ttls.credits,
    }
  }

  /// Strict comparison: an entry exactly `ttl` old is stale.
  pub fn is_within_ttl(
    &self,
    category: CacheCategory,
    inserted_at: DateTime<Utc>,
    now: DateTime<Utc>,
  ) -> bool {
    now - inserted_at < self.ttl(category)
  }

  /// Fresh iff an insertion is recorded and younger than the category's ttl.
  pub fn is_fresh<L: EntryLedger + ?Sized>(
    &self,
    ledger: &L,
    category: CacheCategory,
    key: &str,
    now: DateTime<Utc>,
  ) -> Result<bool> {
    Ok(
      ledger
        .inserted_at(category, key)?
        .is_some_and(|inserted_at| self.is_within_ttl(category, inserted_at, now)),
    )
  }

  pub fn record_insertion<L: EntryLedger + ?Sized>(
    &self,
    ledger: &L,
    category: CacheCategory,
    key: &str,
    now: DateTime<Utc>,
  ) -> Result<()> {
    ledger.record_insertion(category, key, now)
  }
}
