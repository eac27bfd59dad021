//! Paging listing engine: an ever-growing, retry-capable list of movies for
//! one catalog section at a time.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info};

use super::observable::Observable;
use super::state::OperationState;
use crate::cache::reconciler::CacheReconciler;
use crate::cache::storage::CatalogStore;
use crate::cache::traits::CacheResult;
use crate::catalog::types::{Movie, MoviePage, PageNumber, Section};
use crate::error::CatalogError;
use crate::probe::ConnectivityProbe;
use crate::scheduler::{Task, TaskScheduler};
use crate::tmdb::source::RemoteSource;

/// Snapshot of the visible items
pub type ItemList = Arc<Vec<Movie>>;

/// Mutable session state, only touched under the session lock
#[derive(Debug, Default)]
struct Session {
  section: Option<Section>,
  /// Bumped by every `start`; completions carrying an older value are dropped
  generation: u64,
  /// Last page appended
  current_page: Option<PageNumber>,
  /// Page the next prefetch asks for
  next_page: PageNumber,
  last_page_reached: bool,
  in_flight: Option<PageNumber>,
  last_failed_page: Option<PageNumber>,
  items: ItemList,
}

impl Session {
  fn is_exhausted(&self) -> bool {
    self.last_page_reached
  }
}

struct ListingInner<S, R> {
  reconciler: Arc<CacheReconciler<S, R>>,
  probe: Arc<dyn ConnectivityProbe>,
  scheduler: Arc<dyn TaskScheduler>,
  prefetch_distance: usize,
  session: Mutex<Session>,
  items: Observable<ItemList>,
  state: Observable<OperationState>,
}

/// Consumer-facing listing session.
///
/// One request is in flight at a time. Pages are appended strictly in
/// increasing order; a completion that does not match the in-flight request
/// of the current session is dropped.
pub struct Listing<S, R> {
  inner: Arc<ListingInner<S, R>>,
}

impl<S, R> Clone for Listing<S, R> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<S, R> Listing<S, R>
where
  S: CatalogStore + 'static,
  R: RemoteSource + 'static,
{
  pub fn new(
    reconciler: Arc<CacheReconciler<S, R>>,
    probe: Arc<dyn ConnectivityProbe>,
    scheduler: Arc<dyn TaskScheduler>,
  ) -> Self {
    Self {
      inner: Arc::new(ListingInner {
        reconciler,
        probe,
        scheduler,
        prefetch_distance: 1,
        session: Mutex::new(Session::default()),
        items: Observable::new(ItemList::default()),
        state: Observable::new(OperationState::Idle),
      }),
    }
  }

  /// Items from the tail at which `on_item_visible` requests the next page.
  ///
  /// Only takes effect before the listing is shared.
  pub fn with_prefetch_distance(mut self, distance: usize) -> Self {
    if let Some(inner) = Arc::get_mut(&mut self.inner) {
      inner.prefetch_distance = distance;
    }
    self
  }

  /// Start browsing `section` from page 1, discarding the previous session.
  pub fn start(&self, section: Section) {
    self.inner.start(section, PageNumber::FIRST);
  }

  /// Start browsing `section` from an arbitrary page.
  ///
  /// Zero or negative pages are rejected before anything is scheduled and
  /// leave the current session untouched.
  pub fn start_at(&self, section: Section, page: i64) -> Result<(), CatalogError> {
    let page = PageNumber::new(page)?;
    self.inner.start(section, page);
    Ok(())
  }

  /// Request the next page. No-op while loading, after a failure (use
  /// `retry`), before `start`, or once the last page is loaded.
  ///
  /// Returns whether a request was issued.
  pub fn on_prefetch_trigger(&self) -> bool {
    self.inner.prefetch()
  }

  /// Report that the item at `index` became visible; triggers a prefetch when
  /// it is within the prefetch distance of the tail.
  pub fn on_item_visible(&self, index: usize) -> bool {
    let len = self.inner.items.get().len();
    if index
      .saturating_add(self.inner.prefetch_distance)
      .saturating_add(1)
      < len
    {
      return false;
    }
    self.on_prefetch_trigger()
  }

  /// Re-issue exactly the last failed page. No-op if nothing failed or a
  /// request is in flight.
  ///
  /// Returns whether a request was issued.
  pub fn retry(&self) -> bool {
    self.inner.retry()
  }

  /// Call `callback` with the current items and every later change.
  pub fn observe_items<F>(&self, callback: F)
  where
    F: FnMut(ItemList) + Send + 'static,
  {
    self
      .inner
      .items
      .observe(self.inner.scheduler.as_ref(), callback);
  }

  /// Call `callback` with the current state and every later change.
  pub fn observe_state<F>(&self, callback: F)
  where
    F: FnMut(OperationState) + Send + 'static,
  {
    self
      .inner
      .state
      .observe(self.inner.scheduler.as_ref(), callback);
  }

  pub fn subscribe_items(&self) -> watch::Receiver<ItemList> {
    self.inner.items.subscribe()
  }

  pub fn subscribe_state(&self) -> watch::Receiver<OperationState> {
    self.inner.state.subscribe()
  }

  pub fn items(&self) -> ItemList {
    self.inner.items.get()
  }

  pub fn state(&self) -> OperationState {
    self.inner.state.get()
  }

  pub fn section(&self) -> Option<Section> {
    self.inner.session().section
  }

  /// Last page appended, if any
  pub fn current_page(&self) -> Option<PageNumber> {
    self.inner.session().current_page
  }

  pub fn last_failed_page(&self) -> Option<PageNumber> {
    self.inner.session().last_failed_page
  }

  /// True once the last page of the section has been appended
  pub fn is_exhausted(&self) -> bool {
    self.inner.session().is_exhausted()
  }
}

impl<S, R> ListingInner<S, R>
where
  S: CatalogStore + 'static,
  R: RemoteSource + 'static,
{
  fn session(&self) -> MutexGuard<'_, Session> {
    // Session state stays consistent between statements, so recover
    self.session.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn start(self: &Arc<Self>, section: Section, first_page: PageNumber) {
    let task = {
      let mut session = self.session();
      let generation = session.generation.wrapping_add(1);
      *session = Session {
        section: Some(section),
        generation,
        next_page: first_page,
        ..Session::default()
      };
      self.items.set(Arc::clone(&session.items));
      info!(section = %section, page = %first_page, "listing started");
      self.issue(&mut session, section, first_page)
    };
    self.scheduler.submit(task);
  }

  fn prefetch(self: &Arc<Self>) -> bool {
    let task = {
      let mut session = self.session();
      let Some(section) = session.section else {
        return false;
      };
      if session.in_flight.is_some() || session.last_failed_page.is_some() {
        return false;
      }
      if session.is_exhausted() {
        debug!(section = %section, page = ?session.current_page, "no more pages");
        return false;
      }
      let next = session.next_page;
      self.issue(&mut session, section, next)
    };
    self.scheduler.submit(task);
    true
  }

  fn retry(self: &Arc<Self>) -> bool {
    let task = {
      let mut session = self.session();
      let (Some(section), Some(page)) = (session.section, session.last_failed_page) else {
        return false;
      };
      if session.in_flight.is_some() {
        return false;
      }
      info!(section = %section, page = %page, "retrying failed page");
      self.issue(&mut session, section, page)
    };
    self.scheduler.submit(task);
    true
  }

  /// Mark `page` in flight and build the task fetching it. The caller submits
  /// the task after releasing the session lock.
  fn issue(self: &Arc<Self>, session: &mut Session, section: Section, page: PageNumber) -> Task {
    session.in_flight = Some(page);
    self.state.set(if session.items.is_empty() {
      OperationState::LoadingFirst
    } else {
      OperationState::LoadingNext
    });

    let generation = session.generation;
    let inner = Arc::clone(self);
    Box::pin(async move {
      let is_current = || inner.is_current(generation);
      let result = inner
        .reconciler
        .get_page_for(section, page, &is_current)
        .await;
      inner.complete(generation, section, page, result);
    })
  }

  /// Whether `generation` still names the live session.
  fn is_current(&self, generation: u64) -> bool {
    self.session().generation == generation
  }

  fn complete(
    &self,
    generation: u64,
    section: Section,
    page: PageNumber,
    result: CacheResult<MoviePage>,
  ) {
    let mut session = self.session();
    if session.generation != generation || session.section != Some(section) {
      debug!(section = %section, page = %page, "dropping completion for a previous session");
      return;
    }
    if session.in_flight != Some(page) {
      debug!(section = %section, page = %page, "dropping completion that is not in flight");
      return;
    }
    session.in_flight = None;

    match result {
      CacheResult::Hit(fetched) => {
        let last_page_reached = fetched.is_last();
        let mut items = Vec::with_capacity(session.items.len() + fetched.items.len());
        items.extend(session.items.iter().cloned());
        items.extend(fetched.items);
        session.items = Arc::new(items);
        session.current_page = Some(page);
        session.next_page = page.next();
        session.last_page_reached = last_page_reached;
        session.last_failed_page = None;

        debug!(
          section = %section,
          page = %page,
          total_pages = fetched.total_pages,
          items = session.items.len(),
          "page appended"
        );
        self.items.set(Arc::clone(&session.items));
        self.state.set(OperationState::Loaded);
      }
      CacheResult::Miss => {
        let has_items = !session.items.is_empty();
        let error = CatalogError::from_miss(self.probe.is_connected(), has_items);
        session.last_failed_page = Some(page);

        info!(section = %section, page = %page, error = %error, has_items, "page request failed");
        self.state.set(OperationState::from(error));
      }
    }
  }
}
