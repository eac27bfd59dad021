//! Cache reconciler: combines freshness, local storage and the remote source
//! into one authoritative answer per request.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::freshness::FreshnessPolicy;
use super::storage::CatalogStore;
use super::traits::{page_key, CacheCategory, CacheResult, CONFIGURATION_KEY};
use crate::catalog::types::{Credits, ImageConfiguration, MovieDetail, MoviePage, PageNumber, Section};
use crate::tmdb::source::RemoteSource;

/// Tells a request whether its caller still wants the result. Checked under
/// the store guard before the lookup and again before the commit.
pub type StillCurrent<'a> = &'a (dyn Fn() -> bool + Sync);

/// What the local side knows before going remote
enum Lookup<T> {
  /// Stored and within its ttl
  Fresh(T),
  /// Absent, stale, or purged
  Expired,
  /// The requested section differs from the resident one; all pages were purged
  SelectionChanged,
}

/// Decides per request whether stored data is still valid, and fetches
/// missing or expired data from the remote source.
///
/// All store access goes through a single guard so that a value and its
/// insertion timestamp are always written and read together. The guard is
/// never held across the remote fetch.
pub struct CacheReconciler<S, R> {
  store: Arc<S>,
  remote: Arc<R>,
  policy: FreshnessPolicy,
  clock: Arc<dyn Clock>,
  writer: Mutex<()>,
}

impl<S: CatalogStore, R: RemoteSource> CacheReconciler<S, R> {
  pub fn new(store: Arc<S>, remote: Arc<R>, policy: FreshnessPolicy) -> Self {
    Self {
      store,
      remote,
      policy,
      clock: Arc::new(SystemClock),
      writer: Mutex::new(()),
    }
  }

  /// Replace the wall clock.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn policy(&self) -> &FreshnessPolicy {
    &self.policy
  }

  pub fn now(&self) -> DateTime<Utc> {
    self.clock.now()
  }

  /// Get one listing page.
  ///
  /// Asking for a section other than the resident one purges every stored
  /// page before anything else, then goes remote.
  pub async fn get_page(&self, section: Section, page: PageNumber) -> CacheResult<MoviePage> {
    self.get_page_for(section, page, &|| true).await
  }

  /// Like `get_page`, for a request that can be superseded.
  ///
  /// Once `still_current` returns false the request leaves the store alone:
  /// no purge, no commit and no section tag change. A request superseded
  /// before its lookup is a `Miss` without a remote call.
  pub async fn get_page_for(
    &self,
    section: Section,
    page: PageNumber,
    still_current: StillCurrent<'_>,
  ) -> CacheResult<MoviePage> {
    let key = page_key(section, page);

    self
      .reconcile(
        CacheCategory::Page,
        &key,
        still_current,
        |store, now| {
          if store.current_section_tag()? != Some(section) {
            store.clear_all_pages()?;
            return Ok(Lookup::SelectionChanged);
          }
          if !self.policy.is_fresh(store, CacheCategory::Page, &key, now)? {
            return Ok(Lookup::Expired);
          }
          Ok(
            store
              .get_page(section, page)?
              .map_or(Lookup::Expired, Lookup::Fresh),
          )
        },
        || self.remote.fetch_page(section, page),
        |store, fetched| {
          // Only one section's pages may be resident
          if store.current_section_tag()? != Some(fetched.section) {
            store.clear_all_pages()?;
          }
          store.put_page(fetched)?;
          store.set_current_section_tag(fetched.section)
        },
      )
      .await
  }

  /// Get movie details. A stale entry is purged before the remote fetch.
  pub async fn get_detail(&self, movie_id: u64) -> CacheResult<MovieDetail> {
    let key = movie_id.to_string();

    self
      .reconcile(
        CacheCategory::Detail,
        &key,
        &|| true,
        |store, now| {
          if self.policy.is_fresh(store, CacheCategory::Detail, &key, now)? {
            if let Some(detail) = store.get_detail(movie_id)? {
              return Ok(Lookup::Fresh(detail));
            }
          }
          store.clear_detail(movie_id)?;
          Ok(Lookup::Expired)
        },
        || self.remote.fetch_detail(movie_id),
        |store, detail| store.put_detail(detail),
      )
      .await
  }

  /// Get the cast list. Same purge rule as details.
  pub async fn get_credits(&self, movie_id: u64) -> CacheResult<Credits> {
    let key = movie_id.to_string();

    self
      .reconcile(
        CacheCategory::Credits,
        &key,
        &|| true,
        |store, now| {
          if self.policy.is_fresh(store, CacheCategory::Credits, &key, now)? {
            if let Some(credits) = store.get_credits(movie_id)? {
              return Ok(Lookup::Fresh(credits));
            }
          }
          store.clear_credits(movie_id)?;
          Ok(Lookup::Expired)
        },
        || self.remote.fetch_credits(movie_id),
        |store, credits| store.put_credits(credits),
      )
      .await
  }

  pub async fn get_configuration(&self) -> CacheResult<ImageConfiguration> {
    self
      .reconcile(
        CacheCategory::Configuration,
        CONFIGURATION_KEY,
        &|| true,
        |store, now| {
          if !self
            .policy
            .is_fresh(store, CacheCategory::Configuration, CONFIGURATION_KEY, now)?
          {
            return Ok(Lookup::Expired);
          }
          Ok(
            store
              .get_configuration()?
              .map_or(Lookup::Expired, Lookup::Fresh),
          )
        },
        || self.remote.fetch_configuration(),
        |store, configuration| store.put_configuration(configuration),
      )
      .await
  }

  /// Fresh stored configuration and its insertion time, without going remote.
  pub fn cached_configuration(&self) -> Option<(ImageConfiguration, DateTime<Utc>)> {
    let now = self.clock.now();
    let found = self.exclusive(|store| {
      let Some(inserted_at) = store.inserted_at(CacheCategory::Configuration, CONFIGURATION_KEY)?
      else {
        return Ok(None);
      };
      if !self
        .policy
        .is_within_ttl(CacheCategory::Configuration, inserted_at, now)
      {
        return Ok(None);
      }
      Ok(
        store
          .get_configuration()?
          .map(|configuration| (configuration, inserted_at)),
      )
    });

    match found {
      Ok(found) => found,
      Err(e) => {
        warn!(error = %e, "cached configuration lookup failed");
        None
      }
    }
  }

  /// Run `f` with exclusive access to the store.
  fn exclusive<T>(&self, f: impl FnOnce(&S) -> Result<T>) -> Result<T> {
    // The guard protects no data, so a poisoned lock is still usable
    let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
    f(&self.store)
  }

  /// Local lookup, then remote fetch, then persist, as one sequential unit.
  async fn reconcile<T, L, F, Fut, P>(
    &self,
    category: CacheCategory,
    key: &str,
    still_current: StillCurrent<'_>,
    lookup: L,
    fetch: F,
    persist: P,
  ) -> CacheResult<T>
  where
    L: FnOnce(&S, DateTime<Utc>) -> Result<Lookup<T>>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: FnOnce(&S, &T) -> Result<()>,
  {
    let now = self.clock.now();
    let looked_up = self.exclusive(|store| {
      if !still_current() {
        return Ok(None);
      }
      lookup(store, now).map(Some)
    });
    match looked_up {
      Ok(None) => {
        debug!(%category, key, "request superseded before lookup");
        return CacheResult::Miss;
      }
      Ok(Some(Lookup::Fresh(value))) => {
        debug!(%category, key, "serving fresh cached value");
        return CacheResult::Hit(value);
      }
      Ok(Some(Lookup::Expired)) => debug!(%category, key, "no fresh cached value"),
      Ok(Some(Lookup::SelectionChanged)) => {
        debug!(%category, key, "section changed, stored pages purged")
      }
      Err(e) => warn!(%category, key, error = %e, "cache lookup failed, treating as miss"),
    }

    let value = match fetch().await {
      Ok(value) => value,
      Err(e) => {
        warn!(%category, key, error = %e, "remote fetch failed");
        return CacheResult::Miss;
      }
    };

    let now = self.clock.now();
    let committed = self.exclusive(|store| {
      if !still_current() {
        return Ok(false);
      }
      persist(store, &value)?;
      self.policy.record_insertion(store, category, key, now)?;
      Ok(true)
    });
    match committed {
      Ok(true) => debug!(%category, key, "stored fetched value"),
      Ok(false) => debug!(%category, key, "request superseded, fetched value not stored"),
      // The fetched value is still authoritative
      Err(e) => warn!(%category, key, error = %e, "failed to persist fetched value"),
    }

    CacheResult::Hit(value)
  }
}
