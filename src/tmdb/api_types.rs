//! Serde-deserializable types matching TMDB API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;

use crate::catalog::types::{
  CastMember, Credits, Genre, ImageConfiguration, Movie, MovieDetail, MoviePage, PageNumber,
  Section,
};

// ============================================================================
// Configuration endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiImages {
  #[serde(default)]
  pub base_url: String,
  #[serde(default)]
  pub secure_base_url: String,
  #[serde(default)]
  pub poster_sizes: Vec<String>,
  #[serde(default)]
  pub backdrop_sizes: Vec<String>,
  #[serde(default)]
  pub profile_sizes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiConfiguration {
  pub images: ApiImages,
}

impl From<ApiConfiguration> for ImageConfiguration {
  fn from(api: ApiConfiguration) -> Self {
    let images = api.images;
    // Prefer https when offered
    let base_url = if images.secure_base_url.is_empty() {
      images.base_url
    } else {
      images.secure_base_url
    };

    ImageConfiguration {
      base_url,
      poster_sizes: images.poster_sizes,
      backdrop_sizes: images.backdrop_sizes,
      profile_sizes: images.profile_sizes,
    }
  }
}

// ============================================================================
// Movie list endpoints (now_playing, popular, top_rated, upcoming)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiMovie {
  pub id: u64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub overview: String,
  pub poster_path: Option<String>,
  pub backdrop_path: Option<String>,
  pub release_date: Option<String>,
  #[serde(default)]
  pub popularity: f64,
  #[serde(default)]
  pub vote_average: f64,
  #[serde(default)]
  pub vote_count: u32,
}

impl From<ApiMovie> for Movie {
  fn from(api: ApiMovie) -> Self {
    Movie {
      id: api.id,
      title: api.title,
      overview: api.overview,
      poster_path: api.poster_path,
      backdrop_path: api.backdrop_path,
      // TMDB sends "" for unknown dates
      release_date: api.release_date.filter(|d| !d.is_empty()),
      popularity: api.popularity,
      vote_average: api.vote_average,
      vote_count: api.vote_count,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiMoviePage {
  pub page: i64,
  #[serde(default)]
  pub results: Vec<ApiMovie>,
  #[serde(default)]
  pub total_pages: u32,
  #[serde(default)]
  pub total_results: u64,
}

impl ApiMoviePage {
  /// Convert to a domain page. The requested page number wins over the echoed one.
  pub fn into_page(self, section: Section, requested: PageNumber) -> MoviePage {
    if self.page != i64::from(requested.get()) {
      tracing::warn!(
        section = %section,
        requested = %requested,
        echoed = self.page,
        "server echoed a different page number"
      );
    }

    MoviePage {
      section,
      page: requested,
      items: self.results.into_iter().map(Movie::from).collect(),
      total_pages: self.total_pages,
      total_results: self.total_results,
    }
  }
}

// ============================================================================
// Movie detail endpoint
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiGenre {
  pub id: u64,
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiMovieDetail {
  #[serde(flatten)]
  pub movie: ApiMovie,
  #[serde(default)]
  pub genres: Vec<ApiGenre>,
  pub runtime: Option<u32>,
  pub tagline: Option<String>,
}

impl From<ApiMovieDetail> for MovieDetail {
  fn from(api: ApiMovieDetail) -> Self {
    MovieDetail {
      movie: api.movie.into(),
      genres: api
        .genres
        .into_iter()
        .map(|g| Genre {
          id: g.id,
          name: g.name,
        })
        .collect(),
      runtime: api.runtime.filter(|r| *r > 0),
      tagline: api.tagline.filter(|t| !t.is_empty()),
    }
  }
}

// ============================================================================
// Credits endpoint
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiCastMember {
  pub id: u64,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub character: String,
  pub profile_path: Option<String>,
  #[serde(default)]
  pub order: u32,
}

#[derive(Debug, Deserialize)]
pub struct ApiCredits {
  pub id: u64,
  #[serde(default)]
  pub cast: Vec<ApiCastMember>,
}

impl From<ApiCredits> for Credits {
  fn from(api: ApiCredits) -> Self {
    let mut cast = api.cast;
    cast.sort_by_key(|c| c.order);

    Credits {
      movie_id: api.id,
      cast: cast
        .into_iter()
        .map(|c| CastMember {
          id: c.id,
          name: c.name,
          character: c.character,
          profile_path: c.profile_path,
        })
        .collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_movie_page_from_json() {
    let json = r#"{
      "dates": {"maximum": "2024-06-01", "minimum": "2024-04-20"},
      "page": 2,
      "results": [
        {
          "adult": false,
          "backdrop_path": "/back.jpg",
          "genre_ids": [28, 12],
          "id": 823464,
          "original_title": "Godzilla x Kong",
          "overview": "Two titans.",
          "popularity": 1834.5,
          "poster_path": "/poster.jpg",
          "release_date": "2024-03-27",
          "title": "Godzilla x Kong: The New Empire",
          "vote_average": 7.2,
          "vote_count": 1848
        },
        {
          "id": 1,
          "title": "No Poster",
          "poster_path": null,
          "release_date": ""
        }
      ],
      "total_pages": 40,
      "total_results": 800
    }"#;

    let api: ApiMoviePage = serde_json::from_str(json).unwrap();
    let page = api.into_page(Section::NowPlaying, PageNumber::new(2).unwrap());

    assert_eq!(page.page.get(), 2);
    assert_eq!(page.total_pages, 40);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, 823464);
    assert_eq!(page.items[0].poster_path.as_deref(), Some("/poster.jpg"));
    assert_eq!(page.items[1].poster_path, None);
    assert_eq!(page.items[1].release_date, None);
  }

  #[test]
  fn test_mismatched_page_number_uses_request() {
    let api: ApiMoviePage =
      serde_json::from_str(r#"{"page": 0, "results": [], "total_pages": 0, "total_results": 0}"#)
        .unwrap();
    let page = api.into_page(Section::Popular, PageNumber::new(3).unwrap());
    assert_eq!(page.page.get(), 3);
  }

  #[test]
  fn test_configuration_prefers_secure_base_url() {
    let json = r#"{
      "change_keys": ["adult"],
      "images": {
        "base_url": "http://image.tmdb.org/t/p/",
        "secure_base_url": "https://image.tmdb.org/t/p/",
        "backdrop_sizes": ["w300", "w780", "original"],
        "logo_sizes": ["w45"],
        "poster_sizes": ["w92", "w342", "original"],
        "profile_sizes": ["w45", "w185", "original"],
        "still_sizes": ["w92"]
      }
    }"#;

    let config: ImageConfiguration = serde_json::from_str::<ApiConfiguration>(json)
      .unwrap()
      .into();

    assert_eq!(config.base_url, "https://image.tmdb.org/t/p/");
    assert_eq!(config.poster_sizes, vec!["w92", "w342", "original"]);
  }

  #[test]
  fn test_detail_includes_genres() {
    let json = r#"{
      "id": 550,
      "title": "Fight Club",
      "overview": "A ticking-time-bomb insomniac...",
      "genres": [{"id": 18, "name": "Drama"}],
      "runtime": 139,
      "tagline": "",
      "popularity": 61.4,
      "vote_average": 8.4,
      "vote_count": 26280,
      "poster_path": "/pB8BM7pdSp6B6Ih7QZ4DrQ3PmJK.jpg",
      "backdrop_path": null,
      "release_date": "1999-10-15"
    }"#;

    let detail: MovieDetail = serde_json::from_str::<ApiMovieDetail>(json)
      .unwrap()
      .into();

    assert_eq!(detail.movie.id, 550);
    assert_eq!(detail.genres.len(), 1);
    assert_eq!(detail.genres[0].name, "Drama");
    assert_eq!(detail.runtime, Some(139));
    assert_eq!(detail.tagline, None);
  }

  #[test]
  fn test_credits_sorted_by_billing_order() {
    let json = r#"{
      "id": 550,
      "cast": [
        {"id": 2, "name": "Brad Pitt", "character": "Tyler Durden", "order": 1, "profile_path": null},
        {"id": 1, "name": "Edward Norton", "character": "The Narrator", "order": 0, "profile_path": "/n.jpg"}
      ],
      "crew": []
    }"#;

    let credits: Credits = serde_json::from_str::<ApiCredits>(json).unwrap().into();

    assert_eq!(credits.movie_id, 550);
    assert_eq!(credits.cast[0].name, "Edward Norton");
    assert_eq!(credits.cast[1].character, "Tyler Durden");
  }
}
