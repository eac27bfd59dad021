use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::api_types::{ApiConfiguration, ApiCredits, ApiMovieDetail, ApiMoviePage};
use super::source::RemoteSource;
use crate::catalog::types::{Credits, ImageConfiguration, MovieDetail, MoviePage, PageNumber, Section};
use crate::config::{Config, TmdbConfig};
use crate::probe::{ConnectivityProbe, Reachability};

/// TMDB API client
#[derive(Clone)]
pub struct TmdbClient {
  http: reqwest::Client,
  base_url: Url,
  api_key: String,
  language: Option<String>,
  reachability: Arc<Reachability>,
}

impl TmdbClient {
  pub fn new(config: &Config) -> Result<Self> {
    let api_key = Config::get_api_key()?;
    Self::with_api_key(&config.tmdb, api_key)
  }

  pub fn with_api_key(config: &TmdbConfig, api_key: String) -> Result<Self> {
    // Url::join drops the last segment unless the base ends with a slash
    let mut api_url = config.api_url.clone();
    if !api_url.ends_with('/') {
      api_url.push('/');
    }
    let base_url =
      Url::parse(&api_url).map_err(|e| eyre!("Invalid TMDB api_url '{}': {}", api_url, e))?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      api_key,
      language: config.language.clone(),
      reachability: Arc::new(Reachability::default()),
    })
  }

  /// Reachability as observed by this client's requests
  pub fn reachability(&self) -> Arc<Reachability> {
    Arc::clone(&self.reachability)
  }

  fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
    let mut url = self
      .base_url
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint '{}': {}", path, e))?;

    {
      let mut pairs = url.query_pairs_mut();
      pairs.append_pair("api_key", &self.api_key);
      if let Some(language) = &self.language {
        pairs.append_pair("language", language);
      }
      for (key, value) in query {
        pairs.append_pair(key, value);
      }
    }

    Ok(url)
  }

  async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
    let url = self.endpoint(path, query)?;
    tracing::debug!(path, "requesting");

    let response = match self.http.get(url).send().await {
      Ok(response) => response,
      Err(e) => {
        if e.is_connect() || e.is_timeout() {
          self.reachability.set_connected(false);
        }
        return Err(eyre!("Request to {} failed: {}", path, e));
      }
    };

    // Any response at all means the network is up
    self.reachability.set_connected(true);

    let response = response
      .error_for_status()
      .map_err(|e| eyre!("Request to {} failed: {}", path, e))?;

    response
      .json::<T>()
      .await
      .map_err(|e| eyre!("Failed to parse response from {}: {}", path, e))
  }
}

#[async_trait]
impl RemoteSource for TmdbClient {
  async fn fetch_configuration(&self) -> Result<ImageConfiguration> {
    let response: ApiConfiguration = self.get("configuration", &[]).await?;
    Ok(response.into())
  }

  async fn fetch_page(&self, section: Section, page: PageNumber) -> Result<MoviePage> {
    let path = format!("movie/{}", section.key());
    let response: ApiMoviePage = self
      .get(&path, &[("page", page.to_string())])
      .await?;

    Ok(response.into_page(section, page))
  }

  async fn fetch_detail(&self, movie_id: u64) -> Result<MovieDetail> {
    let path = format!("movie/{}", movie_id);
    let response: ApiMovieDetail = self.get(&path, &[]).await?;
    Ok(response.into())
  }

  async fn fetch_credits(&self, movie_id: u64) -> Result<Credits> {
    let path = format!("movie/{}/credits", movie_id);
    let response: ApiCredits = self.get(&path, &[]).await?;
    Ok(response.into())
  }
}

impl ConnectivityProbe for TmdbClient {
  fn is_connected(&self) -> bool {
    self.reachability.is_connected()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client(api_url: &str, language: Option<&str>) -> TmdbClient {
    let config = TmdbConfig {
      api_url: api_url.to_string(),
      language: language.map(String::from),
      timeout_secs: 1,
    };
    TmdbClient::with_api_key(&config, "secret".to_string()).unwrap()
  }

  #[test]
  fn test_endpoint_keeps_api_version_segment() {
    let client = client("https://api.themoviedb.org/3", None);
    let url = client
      .endpoint("movie/popular", &[("page", "2".to_string())])
      .unwrap();

    assert_eq!(
      url.as_str(),
      "https://api.themoviedb.org/3/movie/popular?api_key=secret&page=2"
    );
  }

  #[test]
  fn test_endpoint_adds_language() {
    let client = client("https://api.themoviedb.org/3/", Some("en-US"));
    let url = client.endpoint("configuration", &[]).unwrap();

    assert_eq!(
      url.as_str(),
      "https://api.themoviedb.org/3/configuration?api_key=secret&language=en-US"
    );
  }

  #[tokio::test]
  async fn test_unreachable_host_marks_disconnected() {
    // Nothing listens on port 9 of localhost
    let client = client("http://127.0.0.1:9/3/", None);
    assert!(client.is_connected());

    let result = client.fetch_configuration().await;

    assert!(result.is_err());
    assert!(!client.is_connected());
  }
}
