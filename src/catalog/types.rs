use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CatalogError;

/// Catalog section a listing browses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
  NowPlaying,
  Popular,
  TopRated,
  Upcoming,
}

impl Section {
  pub const ALL: [Section; 4] = [
    Section::NowPlaying,
    Section::Popular,
    Section::TopRated,
    Section::Upcoming,
  ];

  /// Stable key used for storage and remote paths
  pub fn key(self) -> &'static str {
    match self {
      Section::NowPlaying => "now_playing",
      Section::Popular => "popular",
      Section::TopRated => "top_rated",
      Section::Upcoming => "upcoming",
    }
  }
}

impl fmt::Display for Section {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.key())
  }
}

impl FromStr for Section {
  type Err = CatalogError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
    Section::ALL
      .into_iter()
      .find(|section| section.key() == normalized)
      .ok_or_else(|| CatalogError::InvalidRequest(format!("unknown section '{}'", s)))
  }
}

/// 1-based page number within a listing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct PageNumber(u32);

impl PageNumber {
  pub const FIRST: PageNumber = PageNumber(1);

  /// Validate a caller-supplied page number. Zero and negatives are rejected.
  pub fn new(page: i64) -> Result<Self, CatalogError> {
    if page <= 0 {
      return Err(CatalogError::InvalidRequest(format!(
        "page number must be >= 1, got {}",
        page
      )));
    }
    u32::try_from(page)
      .map(PageNumber)
      .map_err(|_| CatalogError::InvalidRequest(format!("page number {} is out of range", page)))
  }

  pub fn get(self) -> u32 {
    self.0
  }

  pub fn next(self) -> PageNumber {
    PageNumber(self.0.saturating_add(1))
  }
}

impl Default for PageNumber {
  fn default() -> Self {
    PageNumber::FIRST
  }
}

impl TryFrom<i64> for PageNumber {
  type Error = CatalogError;

  fn try_from(value: i64) -> Result<Self, Self::Error> {
    PageNumber::new(value)
  }
}

impl From<PageNumber> for u32 {
  fn from(page: PageNumber) -> Self {
    page.0
  }
}

impl fmt::Display for PageNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Movie summary as shown in listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
  pub id: u64,
  pub title: String,
  pub overview: String,
  pub poster_path: Option<String>,
  pub backdrop_path: Option<String>,
  pub release_date: Option<String>,
  pub popularity: f64,
  pub vote_average: f64,
  pub vote_count: u32,
}

/// One page of a section listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoviePage {
  pub section: Section,
  pub page: PageNumber,
  pub items: Vec<Movie>,
  pub total_pages: u32,
  pub total_results: u64,
}

impl MoviePage {
  /// True if no page after this one exists
  pub fn is_last(&self) -> bool {
    self.page.get() >= self.total_pages
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
  pub id: u64,
  pub name: String,
}

/// Full movie details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
  pub movie: Movie,
  pub genres: Vec<Genre>,
  pub runtime: Option<u32>,
  pub tagline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastMember {
  pub id: u64,
  pub name: String,
  pub character: String,
  pub profile_path: Option<String>,
}

/// Cast list of a movie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credits {
  pub movie_id: u64,
  pub cast: Vec<CastMember>,
}

/// Image class with its own set of size variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageClass {
  Poster,
  Backdrop,
  Profile,
}

/// Image base URL and size variants per image class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfiguration {
  pub base_url: String,
  pub poster_sizes: Vec<String>,
  pub backdrop_sizes: Vec<String>,
  pub profile_sizes: Vec<String>,
}

impl ImageConfiguration {
  pub fn sizes(&self, class: ImageClass) -> &[String] {
    match class {
      ImageClass::Poster => &self.poster_sizes,
      ImageClass::Backdrop => &self.backdrop_sizes,
      ImageClass::Profile => &self.profile_sizes,
    }
  }

  /// Build a full image URL. Falls back to "original" when the requested size
  /// is not offered for that class.
  pub fn image_url(&self, class: ImageClass, size: &str, path: &str) -> String {
    let size = if self.sizes(class).iter().any(|s| s == size) {
      size
    } else {
      "original"
    };
    format!(
      "{}/{}/{}",
      self.base_url.trim_end_matches('/'),
      size,
      path.trim_start_matches('/')
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_section_parse_variants() {
    assert_eq!("popular".parse::<Section>().unwrap(), Section::Popular);
    assert_eq!("now-playing".parse::<Section>().unwrap(), Section::NowPlaying);
    assert_eq!(" Top Rated ".parse::<Section>().unwrap(), Section::TopRated);
    assert!(matches!(
      "trending".parse::<Section>(),
      Err(CatalogError::InvalidRequest(_))
    ));
  }

  #[test]
  fn test_page_number_rejects_non_positive() {
    assert!(matches!(PageNumber::new(0), Err(CatalogError::InvalidRequest(_))));
    assert!(matches!(PageNumber::new(-3), Err(CatalogError::InvalidRequest(_))));
    assert_eq!(PageNumber::new(2).unwrap().get(), 2);
    assert_eq!(PageNumber::FIRST.next().get(), 2);
  }

  #[test]
  fn test_image_url_falls_back_to_original() {
    let config = ImageConfiguration {
      base_url: "https://image.tmdb.org/t/p/".to_string(),
      poster_sizes: vec!["w92".to_string(), "w342".to_string(), "original".to_string()],
      backdrop_sizes: vec![],
      profile_sizes: vec![],
    };

    assert_eq!(
      config.image_url(ImageClass::Poster, "w342", "/abc.jpg"),
      "https://image.tmdb.org/t/p/w342/abc.jpg"
    );
    assert_eq!(
      config.image_url(ImageClass::Backdrop, "w780", "/abc.jpg"),
      "https://image.tmdb.org/t/p/original/abc.jpg"
    );
  }
}
