//! Fakes shared by unit tests.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};

use crate::catalog::types::{
  CastMember, Credits, Genre, ImageConfiguration, Movie, MovieDetail, MoviePage, PageNumber,
  Section,
};
use crate::tmdb::source::RemoteSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCall {
  Configuration,
  Page(Section, u32),
  Detail(u64),
  Credits(u64),
}

/// Scripted remote source.
///
/// Every call is recorded before it waits on the gate, so `count` reflects
/// issued requests even while they are held in flight. Failures are decided
/// after the gate opens.
pub struct FakeRemote {
  items_per_page: usize,
  total_pages: u32,
  calls: Mutex<Vec<RemoteCall>>,
  failing: Mutex<HashSet<RemoteCall>>,
  gate: Mutex<Option<Arc<Semaphore>>>,
  call_gates: Mutex<HashMap<RemoteCall, Arc<Semaphore>>>,
}

impl FakeRemote {
  pub fn new(items_per_page: usize, total_pages: u32) -> Self {
    Self {
      items_per_page,
      total_pages,
      calls: Mutex::new(Vec::new()),
      failing: Mutex::new(HashSet::new()),
      gate: Mutex::new(None),
      call_gates: Mutex::new(HashMap::new()),
    }
  }

  pub fn fail(&self, call: RemoteCall) {
    self.failing.lock().unwrap().insert(call);
  }

  pub fn heal(&self, call: RemoteCall) {
    self.failing.lock().unwrap().remove(&call);
  }

  pub fn calls(&self) -> Vec<RemoteCall> {
    self.calls.lock().unwrap().clone()
  }

  pub fn count(&self, call: RemoteCall) -> usize {
    self.calls().iter().filter(|c| **c == call).count()
  }

  /// Hold every subsequent fetch until a permit is added to the returned gate.
  pub fn hold(&self) -> Arc<Semaphore> {
    let gate = Arc::new(Semaphore::new(0));
    *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
    gate
  }

  /// Hold only fetches matching `call`, leaving the others untouched.
  pub fn hold_call(&self, call: RemoteCall) -> Arc<Semaphore> {
    let gate = Arc::new(Semaphore::new(0));
    self
      .call_gates
      .lock()
      .unwrap()
      .insert(call, Arc::clone(&gate));
    gate
  }

  async fn call(&self, call: RemoteCall) -> Result<()> {
    self.calls.lock().unwrap().push(call);

    let call_gate = self.call_gates.lock().unwrap().get(&call).cloned();
    let gate = call_gate.or_else(|| self.gate.lock().unwrap().clone());
    if let Some(gate) = gate {
      gate
        .acquire()
        .await
        .map_err(|e| eyre!("gate closed: {}", e))?
        .forget();
    }

    if self.failing.lock().unwrap().contains(&call) {
      return Err(eyre!("scripted failure for {:?}", call));
    }
    Ok(())
  }
}

#[async_trait]
impl RemoteSource for FakeRemote {
  async fn fetch_configuration(&self) -> Result<ImageConfiguration> {
    self.call(RemoteCall::Configuration).await?;
    Ok(sample_configuration())
  }

  async fn fetch_page(&self, section: Section, page: PageNumber) -> Result<MoviePage> {
    self.call(RemoteCall::Page(section, page.get())).await?;
    Ok(sample_page(section, page, self.items_per_page, self.total_pages))
  }

  async fn fetch_detail(&self, movie_id: u64) -> Result<MovieDetail> {
    self.call(RemoteCall::Detail(movie_id)).await?;
    Ok(sample_detail(movie_id))
  }

  async fn fetch_credits(&self, movie_id: u64) -> Result<Credits> {
    self.call(RemoteCall::Credits(movie_id)).await?;
    Ok(Credits {
      movie_id,
      cast: vec![CastMember {
        id: 1,
        name: "Lead Actor".to_string(),
        character: "Hero".to_string(),
        profile_path: Some("/lead.jpg".to_string()),
      }],
    })
  }
}

pub fn sample_movie(id: u64) -> Movie {
  Movie {
    id,
    title: format!("Movie {}", id),
    overview: String::new(),
    poster_path: Some(format!("/poster-{}.jpg", id)),
    backdrop_path: None,
    release_date: Some("2024-01-01".to_string()),
    popularity: 10.0,
    vote_average: 7.5,
    vote_count: 100,
  }
}

/// Page whose item ids are unique across sections and pages
pub fn sample_page(
  section: Section,
  page: PageNumber,
  items_per_page: usize,
  total_pages: u32,
) -> MoviePage {
  let section_base = (section as u64 + 1) * 1_000_000;
  let first = section_base + u64::from(page.get() - 1) * items_per_page as u64;

  MoviePage {
    section,
    page,
    items: (0..items_per_page as u64)
      .map(|i| sample_movie(first + i))
      .collect(),
    total_pages,
    total_results: u64::from(total_pages) * items_per_page as u64,
  }
}

pub fn sample_detail(movie_id: u64) -> MovieDetail {
  MovieDetail {
    movie: sample_movie(movie_id),
    genres: vec![Genre {
      id: 18,
      name: "Drama".to_string(),
    }],
    runtime: Some(120),
    tagline: None,
  }
}

pub fn sample_configuration() -> ImageConfiguration {
  ImageConfiguration {
    base_url: "https://image.tmdb.org/t/p/".to_string(),
    poster_sizes: vec!["w92".to_string(), "w342".to_string(), "original".to_string()],
    backdrop_sizes: vec!["w780".to_string(), "original".to_string()],
    profile_sizes: vec!["w185".to_string(), "original".to_string()],
  }
}

/// Wait until the watched value satisfies `predicate`, failing after a second.
pub async fn wait_until<T>(rx: &mut watch::Receiver<T>, predicate: impl FnMut(&T) -> bool) -> T
where
  T: Clone,
{
  tokio::time::timeout(Duration::from_secs(1), rx.wait_for(predicate))
    .await
    .expect("timed out waiting for value")
    .expect("sender dropped")
    .clone()
}

/// Let spawned tasks run until nothing is left to make progress.
pub async fn settle() {
  for _ in 0..20 {
    tokio::task::yield_now().await;
  }
}
