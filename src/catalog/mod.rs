//! Catalog facade wiring store, remote source, probe and scheduler together.

pub mod types;

use color_eyre::Result;
use std::sync::Arc;

use crate::cache::{CacheReconciler, CacheResult, CacheTtls, FreshnessPolicy, MemoryStore, SqliteStore};
use crate::cache::storage::CatalogStore;
use crate::config::Config;
use crate::error::CatalogError;
use crate::listing::Listing;
use crate::probe::ConnectivityProbe;
use crate::resolver::ConfigurationResolver;
use crate::scheduler::{TaskScheduler, TokioScheduler};
use crate::tmdb::{RemoteSource, TmdbClient};
use types::{Credits, MovieDetail};

/// Movie catalog with transparent caching and offline support.
pub struct Catalog<S, R> {
  reconciler: Arc<CacheReconciler<S, R>>,
  probe: Arc<dyn ConnectivityProbe>,
  scheduler: Arc<dyn TaskScheduler>,
  prefetch_distance: usize,
  resolver: ConfigurationResolver<S, R>,
}

impl Catalog<SqliteStore, TmdbClient> {
  /// Catalog backed by the on-disk cache and the TMDB API.
  ///
  /// Must be called from within a tokio runtime.
  pub fn open(config: &Config) -> Result<Self> {
    let store = SqliteStore::open(&config.cache.database_path()?)?;
    let remote = TmdbClient::new(config)?;
    Ok(Self::with_tmdb(store, remote, config))
  }
}

impl Catalog<MemoryStore, TmdbClient> {
  /// Catalog whose cache lives only as long as the process.
  pub fn ephemeral(config: &Config) -> Result<Self> {
    let remote = TmdbClient::new(config)?;
    Ok(Self::with_tmdb(MemoryStore::new(), remote, config))
  }
}

impl<S> Catalog<S, TmdbClient>
where
  S: CatalogStore + 'static,
{
  fn with_tmdb(store: S, remote: TmdbClient, config: &Config) -> Self {
    let probe = remote.reachability();
    Self::new(
      Arc::new(store),
      Arc::new(remote),
      probe,
      Arc::new(TokioScheduler::current()),
      config,
    )
  }
}

impl<S, R> Catalog<S, R>
where
  S: CatalogStore + 'static,
  R: RemoteSource + 'static,
{
  pub fn new(
    store: Arc<S>,
    remote: Arc<R>,
    probe: Arc<dyn ConnectivityProbe>,
    scheduler: Arc<dyn TaskScheduler>,
    config: &Config,
  ) -> Self {
    let policy = FreshnessPolicy::new(CacheTtls::from(&config.cache));
    let reconciler = Arc::new(CacheReconciler::new(store, remote, policy));
    let resolver = ConfigurationResolver::new(
      Arc::clone(&reconciler),
      Arc::clone(&scheduler),
      config.images.clone(),
    );

    Self {
      reconciler,
      probe,
      scheduler,
      prefetch_distance: config.listing.prefetch_distance,
      resolver,
    }
  }

  /// A new, idle listing session.
  pub fn listing(&self) -> Listing<S, R> {
    Listing::new(
      Arc::clone(&self.reconciler),
      Arc::clone(&self.probe),
      Arc::clone(&self.scheduler),
    )
    .with_prefetch_distance(self.prefetch_distance)
  }

  pub async fn detail(&self, movie_id: u64) -> Result<MovieDetail, CatalogError> {
    let result = self.reconciler.get_detail(movie_id).await;
    self.classify(result)
  }

  pub async fn credits(&self, movie_id: u64) -> Result<Credits, CatalogError> {
    let result = self.reconciler.get_credits(movie_id).await;
    self.classify(result)
  }

  pub fn configuration(&self) -> &ConfigurationResolver<S, R> {
    &self.resolver
  }

  fn classify<T>(&self, result: CacheResult<T>) -> Result<T, CatalogError> {
    match result {
      CacheResult::Hit(value) => Ok(value),
      CacheResult::Miss => Err(CatalogError::from_miss(self.probe.is_connected(), false)),
    }
  }
}
