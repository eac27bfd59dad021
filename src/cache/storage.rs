//! Persistent store contract and its SQLite and in-memory implementations.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::freshness::EntryLedger;
use super::traits::{page_key, CacheCategory, Cacheable, CONFIGURATION_KEY};
use crate::catalog::types::{Credits, ImageConfiguration, MovieDetail, MoviePage, PageNumber, Section};

/// Trait for catalog storage backends.
///
/// Every store also keeps the insertion ledger used for freshness checks.
/// Clearing a value removes its ledger entry too.
pub trait CatalogStore: EntryLedger + Send + Sync {
  fn get_configuration(&self) -> Result<Option<ImageConfiguration>>;

  fn put_configuration(&self, configuration: &ImageConfiguration) -> Result<()>;

  fn get_page(&self, section: Section, page: PageNumber) -> Result<Option<MoviePage>>;

  /// Store a page under its own section.
  fn put_page(&self, page: &MoviePage) -> Result<()>;

  fn clear_pages_for_section(&self, section: Section) -> Result<()>;

  fn clear_all_pages(&self) -> Result<()>;

  fn get_detail(&self, movie_id: u64) -> Result<Option<MovieDetail>>;

  fn put_detail(&self, detail: &MovieDetail) -> Result<()>;

  fn clear_detail(&self, movie_id: u64) -> Result<()>;

  fn get_credits(&self, movie_id: u64) -> Result<Option<Credits>>;

  fn put_credits(&self, credits: &Credits) -> Result<()>;

  fn clear_credits(&self, movie_id: u64) -> Result<()>;

  /// Section whose pages currently occupy the store
  fn current_section_tag(&self) -> Result<Option<Section>>;

  fn set_current_section_tag(&self, section: Section) -> Result<()>;
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
struct MemoryState {
  configuration: Option<ImageConfiguration>,
  pages: BTreeMap<(Section, PageNumber), MoviePage>,
  details: HashMap<u64, MovieDetail>,
  credits: HashMap<u64, Credits>,
  ledger: HashMap<(CacheCategory, String), DateTime<Utc>>,
  section_tag: Option<Section>,
}

/// Store kept entirely in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
  state: Mutex<MemoryState>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
    self
      .state
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Number of stored pages across all sections
  pub fn page_count(&self) -> Result<usize> {
    Ok(self.state()?.pages.len())
  }
}

impl EntryLedger for MemoryStore {
  fn inserted_at(&self, category: CacheCategory, key: &str) -> Result<Option<DateTime<Utc>>> {
    Ok(
      self
        .state()?
        .ledger
        .get(&(category, key.to_string()))
        .copied(),
    )
  }

  fn record_insertion(
    &self,
    category: CacheCategory,
    key: &str,
    at: DateTime<Utc>,
  ) -> Result<()> {
    self.state()?.ledger.insert((category, key.to_string()), at);
    Ok(())
  }
}

impl CatalogStore for MemoryStore {
  fn get_configuration(&self) -> Result<Option<ImageConfiguration>> {
    Ok(self.state()?.configuration.clone())
  }

  fn put_configuration(&self, configuration: &ImageConfiguration) -> Result<()> {
    self.state()?.configuration = Some(configuration.clone());
    Ok(())
  }

  fn get_page(&self, section: Section, page: PageNumber) -> Result<Option<MoviePage>> {
    Ok(self.state()?.pages.get(&(section, page)).cloned())
  }

  fn put_page(&self, page: &MoviePage) -> Result<()> {
    self
      .state()?
      .pages
      .insert((page.section, page.page), page.clone());
    Ok(())
  }

  fn clear_pages_for_section(&self, section: Section) -> Result<()> {
    let mut state = self.state()?;
    state.pages.retain(|(s, _), _| *s != section);
    let prefix = format!("{}:", section.key());
    state
      .ledger
      .retain(|(category, key), _| *category != CacheCategory::Page || !key.starts_with(&prefix));
    Ok(())
  }

  fn clear_all_pages(&self) -> Result<()> {
    let mut state = self.state()?;
    state.pages.clear();
    state
      .ledger
      .retain(|(category, _), _| *category != CacheCategory::Page);
    Ok(())
  }

  fn get_detail(&self, movie_id: u64) -> Result<Option<MovieDetail>> {
    Ok(self.state()?.details.get(&movie_id).cloned())
  }

  fn put_detail(&self, detail: &MovieDetail) -> Result<()> {
    self
      .state()?
      .details
      .insert(detail.movie.id, detail.clone());
    Ok(())
  }

  fn clear_detail(&self, movie_id: u64) -> Result<()> {
    let mut state = self.state()?;
    state.details.remove(&movie_id);
    state
      .ledger
      .remove(&(CacheCategory::Detail, movie_id.to_string()));
    Ok(())
  }

  fn get_credits(&self, movie_id: u64) -> Result<Option<Credits>> {
    Ok(self.state()?.credits.get(&movie_id).cloned())
  }

  fn put_credits(&self, credits: &Credits) -> Result<()> {
    self
      .state()?
      .credits
      .insert(credits.movie_id, credits.clone());
    Ok(())
  }

  fn clear_credits(&self, movie_id: u64) -> Result<()> {
    let mut state = self.state()?;
    state.credits.remove(&movie_id);
    state
      .ledger
      .remove(&(CacheCategory::Credits, movie_id.to_string()));
    Ok(())
  }

  fn current_section_tag(&self) -> Result<Option<Section>> {
    Ok(self.state()?.section_tag)
  }

  fn set_current_section_tag(&self, section: Section) -> Result<()> {
    self.state()?.section_tag = Some(section);
    Ok(())
  }
}

// ============================================================================
// SQLite store
// ============================================================================

/// SQLite-based catalog store.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Listing pages, one section resident at a time
CREATE TABLE IF NOT EXISTS page_cache (
    section TEXT NOT NULL,
    page INTEGER NOT NULL,
    data BLOB NOT NULL,
    PRIMARY KEY (section, page)
);

-- Single values: configuration, details, credits
CREATE TABLE IF NOT EXISTS entity_cache (
    category TEXT NOT NULL,
    entity_key TEXT NOT NULL,
    data BLOB NOT NULL,
    PRIMARY KEY (category, entity_key)
);

-- Insertion ledger for freshness checks
CREATE TABLE IF NOT EXISTS cache_entries (
    category TEXT NOT NULL,
    entry_key TEXT NOT NULL,
    inserted_at TEXT NOT NULL,
    PRIMARY KEY (category, entry_key)
);

CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const SECTION_TAG_KEY: &str = "section_tag";

impl SqliteStore {
  /// Open or create the store at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Store backed by a private in-memory database.
  pub fn in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;

    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    self
      .conn()?
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }

  fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  fn get_entity<T: Cacheable>(&self, key: &str) -> Result<Option<T>> {
    let conn = self.conn()?;

    let data: Option<Vec<u8>> = conn
      .query_row(
        "SELECT data FROM entity_cache WHERE category = ? AND entity_key = ?",
        params![T::category().as_str(), key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read {} {}: {}", T::category(), key, e))?;

    data
      .map(|data| {
        serde_json::from_slice(&data)
          .map_err(|e| eyre!("Failed to deserialize {} {}: {}", T::category(), key, e))
      })
      .transpose()
  }

  fn store_entity<T: Cacheable>(&self, entity: &T) -> Result<()> {
    let data =
      serde_json::to_vec(entity).map_err(|e| eyre!("Failed to serialize entity: {}", e))?;

    self
      .conn()?
      .execute(
        "INSERT OR REPLACE INTO entity_cache (category, entity_key, data) VALUES (?, ?, ?)",
        params![T::category().as_str(), entity.cache_key(), data],
      )
      .map_err(|e| eyre!("Failed to store {}: {}", T::category(), e))?;

    Ok(())
  }

  fn delete_entity(&self, category: CacheCategory, key: &str) -> Result<()> {
    let conn = self.conn()?;

    conn
      .execute(
        "DELETE FROM entity_cache WHERE category = ? AND entity_key = ?",
        params![category.as_str(), key],
      )
      .map_err(|e| eyre!("Failed to delete {} {}: {}", category, key, e))?;
    conn
      .execute(
        "DELETE FROM cache_entries WHERE category = ? AND entry_key = ?",
        params![category.as_str(), key],
      )
      .map_err(|e| eyre!("Failed to delete ledger entry {} {}: {}", category, key, e))?;

    Ok(())
  }
}

impl EntryLedger for SqliteStore {
  fn inserted_at(&self, category: CacheCategory, key: &str) -> Result<Option<DateTime<Utc>>> {
    let inserted_at: Option<String> = self
      .conn()?
      .query_row(
        "SELECT inserted_at FROM cache_entries WHERE category = ? AND entry_key = ?",
        params![category.as_str(), key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read ledger entry {} {}: {}", category, key, e))?;

    inserted_at.as_deref().map(parse_datetime).transpose()
  }

  fn record_insertion(
    &self,
    category: CacheCategory,
    key: &str,
    at: DateTime<Utc>,
  ) -> Result<()> {
    self
      .conn()?
      .execute(
        "INSERT OR REPLACE INTO cache_entries (category, entry_key, inserted_at) VALUES (?, ?, ?)",
        params![category.as_str(), key, at.to_rfc3339()],
      )
      .map_err(|e| eyre!("Failed to record insertion {} {}: {}", category, key, e))?;

    Ok(())
  }
}

impl CatalogStore for SqliteStore {
  fn get_configuration(&self) -> Result<Option<ImageConfiguration>> {
    self.get_entity(CONFIGURATION_KEY)
  }

  fn put_configuration(&self, configuration: &ImageConfiguration) -> Result<()> {
    self.store_entity(configuration)
  }

  fn get_page(&self, section: Section, page: PageNumber) -> Result<Option<MoviePage>> {
    let data: Option<Vec<u8>> = self
      .conn()?
      .query_row(
        "SELECT data FROM page_cache WHERE section = ? AND page = ?",
        params![section.key(), page.get()],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read page {}: {}", page_key(section, page), e))?;

    data
      .map(|data| {
        serde_json::from_slice(&data)
          .map_err(|e| eyre!("Failed to deserialize page {}: {}", page_key(section, page), e))
      })
      .transpose()
  }

  fn put_page(&self, page: &MoviePage) -> Result<()> {
    let data = serde_json::to_vec(page).map_err(|e| eyre!("Failed to serialize page: {}", e))?;

    self
      .conn()?
      .execute(
        "INSERT OR REPLACE INTO page_cache (section, page, data) VALUES (?, ?, ?)",
        params![page.section.key(), page.page.get(), data],
      )
      .map_err(|e| eyre!("Failed to store page: {}", e))?;

    Ok(())
  }

  fn clear_pages_for_section(&self, section: Section) -> Result<()> {
    let conn = self.conn()?;
    let prefix = format!("{}:", section.key());

    conn
      .execute(
        "DELETE FROM page_cache WHERE section = ?",
        params![section.key()],
      )
      .map_err(|e| eyre!("Failed to clear pages for {}: {}", section, e))?;
    conn
      .execute(
        "DELETE FROM cache_entries
         WHERE category = ? AND substr(entry_key, 1, length(?2)) = ?2",
        params![CacheCategory::Page.as_str(), prefix],
      )
      .map_err(|e| eyre!("Failed to clear page ledger for {}: {}", section, e))?;

    Ok(())
  }

  fn clear_all_pages(&self) -> Result<()> {
    let conn = self.conn()?;

    conn
      .execute_batch(
        "BEGIN;
         DELETE FROM page_cache;
         DELETE FROM cache_entries WHERE category = 'page';
         COMMIT;",
      )
      .map_err(|e| eyre!("Failed to clear pages: {}", e))?;

    Ok(())
  }

  fn get_detail(&self, movie_id: u64) -> Result<Option<MovieDetail>> {
    self.get_entity(&movie_id.to_string())
  }

  fn put_detail(&self, detail: &MovieDetail) -> Result<()> {
    self.store_entity(detail)
  }

  fn clear_detail(&self, movie_id: u64) -> Result<()> {
    self.delete_entity(CacheCategory::Detail, &movie_id.to_string())
  }

  fn get_credits(&self, movie_id: u64) -> Result<Option<Credits>> {
    self.get_entity(&movie_id.to_string())
  }

  fn put_credits(&self, credits: &Credits) -> Result<()> {
    self.store_entity(credits)
  }

  fn clear_credits(&self, movie_id: u64) -> Result<()> {
    self.delete_entity(CacheCategory::Credits, &movie_id.to_string())
  }

  fn current_section_tag(&self) -> Result<Option<Section>> {
    let value: Option<String> = self
      .conn()?
      .query_row(
        "SELECT value FROM store_meta WHERE key = ?",
        params![SECTION_TAG_KEY],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read section tag: {}", e))?;

    value
      .map(|v| {
        v.parse::<Section>()
          .map_err(|e| eyre!("Corrupt section tag '{}': {}", v, e))
      })
      .transpose()
  }

  fn set_current_section_tag(&self, section: Section) -> Result<()> {
    self
      .conn()?
      .execute(
        "INSERT OR REPLACE INTO store_meta (key, value) VALUES (?, ?)",
        params![SECTION_TAG_KEY, section.key()],
      )
      .map_err(|e| eyre!("Failed to store section tag: {}", e))?;

    Ok(())
  }
}

/// Parse an RFC 3339 timestamp from the ledger.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
