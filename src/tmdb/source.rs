use async_trait::async_trait;
use color_eyre::Result;

use crate::catalog::types::{Credits, ImageConfiguration, MovieDetail, MoviePage, PageNumber, Section};

/// Remote catalog source.
///
/// Any `Err` is a plain failure signal; the reconciler does not inspect it.
/// Timeouts, if any, are the implementor's business.
#[async_trait]
pub trait RemoteSource: Send + Sync {
  async fn fetch_configuration(&self) -> Result<ImageConfiguration>;

  async fn fetch_page(&self, section: Section, page: PageNumber) -> Result<MoviePage>;

  async fn fetch_detail(&self, movie_id: u64) -> Result<MovieDetail>;

  async fn fetch_credits(&self, movie_id: u64) -> Result<Credits>;
}
