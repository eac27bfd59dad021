//! Best-effort access to the image configuration for URL construction.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::cache::reconciler::CacheReconciler;
use crate::cache::storage::CatalogStore;
use crate::cache::traits::{CacheCategory, CacheResult};
use crate::catalog::types::{ImageClass, ImageConfiguration};
use crate::config::ImagesConfig;
use crate::scheduler::TaskScheduler;
use crate::tmdb::source::RemoteSource;

/// Configuration held in memory with the time it entered the cache
#[derive(Debug, Clone)]
struct Resolved {
  configuration: ImageConfiguration,
  inserted_at: DateTime<Utc>,
}

/// Serves the image configuration without blocking.
///
/// `get` answers from memory or from a fresh stored copy; an expired copy is
/// never served. When neither is available it schedules a background refresh
/// and returns `None`. Callers fall back to unresolved paths in that case.
pub struct ConfigurationResolver<S, R> {
  reconciler: Arc<CacheReconciler<S, R>>,
  scheduler: Arc<dyn TaskScheduler>,
  sizes: ImagesConfig,
  cached: Arc<RwLock<Option<Resolved>>>,
  refreshing: Arc<AtomicBool>,
}

impl<S, R> ConfigurationResolver<S, R>
where
  S: CatalogStore + 'static,
  R: RemoteSource + 'static,
{
  pub fn new(
    reconciler: Arc<CacheReconciler<S, R>>,
    scheduler: Arc<dyn TaskScheduler>,
    sizes: ImagesConfig,
  ) -> Self {
    Self {
      reconciler,
      scheduler,
      sizes,
      cached: Arc::new(RwLock::new(None)),
      refreshing: Arc::new(AtomicBool::new(false)),
    }
  }

  /// Current configuration, if a fresh one is known.
  pub fn get(&self) -> Option<ImageConfiguration> {
    if let Some(configuration) = self.fresh_in_memory() {
      return Some(configuration);
    }
    if let Some((configuration, inserted_at)) = self.reconciler.cached_configuration() {
      remember(&self.cached, configuration.clone(), inserted_at);
      return Some(configuration);
    }
    self.refresh_in_background();
    None
  }

  /// Resolve through the reconciler and remember a hit.
  pub async fn refresh(&self) -> CacheResult<ImageConfiguration> {
    resolve(&self.reconciler, &self.cached).await
  }

  fn fresh_in_memory(&self) -> Option<ImageConfiguration> {
    let now = self.reconciler.now();
    let policy = self.reconciler.policy();
    self
      .cached
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .as_ref()
      .filter(|resolved| {
        policy.is_within_ttl(CacheCategory::Configuration, resolved.inserted_at, now)
      })
      .map(|resolved| resolved.configuration.clone())
  }

  fn refresh_in_background(&self) {
    if self.refreshing.swap(true, Ordering::SeqCst) {
      return;
    }
    let reconciler = Arc::clone(&self.reconciler);
    let cached = Arc::clone(&self.cached);
    let refreshing = Arc::clone(&self.refreshing);
    self.scheduler.submit(Box::pin(async move {
      resolve(&reconciler, &cached).await;
      refreshing.store(false, Ordering::SeqCst);
    }));
  }

  pub fn poster_url(&self, path: &str) -> String {
    self.image_url(ImageClass::Poster, path)
  }

  pub fn backdrop_url(&self, path: &str) -> String {
    self.image_url(ImageClass::Backdrop, path)
  }

  pub fn profile_url(&self, path: &str) -> String {
    self.image_url(ImageClass::Profile, path)
  }

  /// Full URL for `path`, or `path` itself while no configuration is known.
  pub fn image_url(&self, class: ImageClass, path: &str) -> String {
    let size = match class {
      ImageClass::Poster => &self.sizes.poster_size,
      ImageClass::Backdrop => &self.sizes.backdrop_size,
      ImageClass::Profile => &self.sizes.profile_size,
    };
    match self.get() {
      Some(configuration) => configuration.image_url(class, size, path),
      None => path.to_string(),
    }
  }
}

fn remember(
  cached: &RwLock<Option<Resolved>>,
  configuration: ImageConfiguration,
  inserted_at: DateTime<Utc>,
) {
  *cached.write().unwrap_or_else(|e| e.into_inner()) = Some(Resolved {
    configuration,
    inserted_at,
  });
}

async fn resolve<S, R>(
  reconciler: &CacheReconciler<S, R>,
  cached: &RwLock<Option<Resolved>>,
) -> CacheResult<ImageConfiguration>
where
  S: CatalogStore,
  R: RemoteSource,
{
  let result = reconciler.get_configuration().await;
  match &result {
    CacheResult::Hit(configuration) => {
      // Age the copy from its stored insertion; a failed persist ages from now
      let inserted_at = reconciler
        .cached_configuration()
        .map_or_else(|| reconciler.now(), |(_, inserted_at)| inserted_at);
      remember(cached, configuration.clone(), inserted_at);
    }
    CacheResult::Miss => debug!("image configuration unavailable"),
  }
  result
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::clock::ManualClock;
  use crate::cache::freshness::FreshnessPolicy;
  use crate::cache::storage::{MemoryStore, SqliteStore};
  use crate::scheduler::TokioScheduler;
  use crate::testing::{settle, FakeRemote, RemoteCall};
  use chrono::Duration;

  fn resolver_over<S: CatalogStore + 'static>(
    store: Arc<S>,
    remote: Arc<FakeRemote>,
    clock: Arc<ManualClock>,
  ) -> ConfigurationResolver<S, FakeRemote> {
    let reconciler = Arc::new(
      CacheReconciler::new(store, remote, FreshnessPolicy::default()).with_clock(clock),
    );
    ConfigurationResolver::new(
      reconciler,
      Arc::new(TokioScheduler::current()),
      ImagesConfig::default(),
    )
  }

  fn resolver(remote: Arc<FakeRemote>) -> ConfigurationResolver<MemoryStore, FakeRemote> {
    resolver_over(
      Arc::new(MemoryStore::new()),
      remote,
      Arc::new(ManualClock::new(Utc::now())),
    )
  }

  #[tokio::test]
  async fn test_get_is_none_then_resolves_in_background() {
    let remote = Arc::new(FakeRemote::new(1, 1));
    let resolver = resolver(Arc::clone(&remote));

    assert!(resolver.get().is_none());
    assert!(resolver.get().is_none());
    settle().await;

    assert!(resolver.get().is_some());
    assert_eq!(remote.count(RemoteCall::Configuration), 1);
  }

  #[tokio::test]
  async fn test_expired_copy_is_not_served_and_gets_refreshed() {
    let remote = Arc::new(FakeRemote::new(1, 1));
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let resolver = resolver_over(
      Arc::new(MemoryStore::new()),
      Arc::clone(&remote),
      clock.clone(),
    );

    assert!(resolver.refresh().await.is_hit());
    clock.advance(Duration::hours(71));
    assert!(resolver.get().is_some());
    settle().await;
    assert_eq!(remote.count(RemoteCall::Configuration), 1);

    clock.advance(Duration::hours(1));
    assert!(resolver.get().is_none());
    settle().await;
    assert_eq!(remote.count(RemoteCall::Configuration), 2);
    assert!(resolver.get().is_some());
  }

  #[tokio::test]
  async fn test_stored_configuration_served_on_first_get() {
    let remote = Arc::new(FakeRemote::new(1, 1));
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let store = Arc::new(SqliteStore::in_memory().unwrap());

    let warm = resolver_over(Arc::clone(&store), Arc::clone(&remote), clock.clone());
    assert!(warm.refresh().await.is_hit());

    let cold = resolver_over(store, Arc::clone(&remote), clock);
    assert!(cold.get().is_some());
    settle().await;
    assert_eq!(remote.count(RemoteCall::Configuration), 1);
  }

  #[tokio::test]
  async fn test_expired_stored_configuration_is_not_served() {
    let remote = Arc::new(FakeRemote::new(1, 1));
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let store = Arc::new(MemoryStore::new());

    let warm = resolver_over(Arc::clone(&store), Arc::clone(&remote), clock.clone());
    assert!(warm.refresh().await.is_hit());
    clock.advance(Duration::hours(72));

    let cold = resolver_over(store, Arc::clone(&remote), clock);
    assert!(cold.get().is_none());
    settle().await;
    assert_eq!(remote.count(RemoteCall::Configuration), 2);
  }

  #[tokio::test]
  async fn test_unresolved_path_when_configuration_missing() {
    let remote = Arc::new(FakeRemote::new(1, 1));
    remote.fail(RemoteCall::Configuration);
    let resolver = resolver(remote);

    assert!(resolver.refresh().await.is_miss());
    assert_eq!(resolver.poster_url("/p.jpg"), "/p.jpg");
  }

  #[tokio::test]
  async fn test_urls_use_configured_sizes() {
    let remote = Arc::new(FakeRemote::new(1, 1));
    let resolver = resolver(remote);

    assert!(resolver.refresh().await.is_hit());
    assert_eq!(
      resolver.poster_url("/p.jpg"),
      "https://image.tmdb.org/t/p/w342/p.jpg"
    );
    assert_eq!(
      resolver.backdrop_url("/b.jpg"),
      "https://image.tmdb.org/t/p/w780/b.jpg"
    );
    assert_eq!(
      resolver.profile_url("/f.jpg"),
      "https://image.tmdb.org/t/p/w185/f.jpg"
    );
  }
}
