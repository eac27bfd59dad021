//! Offline-first cache and paging engine for the TMDB movie catalog.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod listing;
pub mod logging;
pub mod probe;
pub mod resolver;
pub mod scheduler;
pub mod tmdb;

#[cfg(test)]
mod testing;

pub use cache::{CacheReconciler, CacheResult, MemoryStore, SqliteStore};
pub use catalog::types::{Movie, MovieDetail, MoviePage, PageNumber, Section};
pub use catalog::Catalog;
pub use config::Config;
pub use error::CatalogError;
pub use listing::{Listing, OperationState};
pub use probe::{ConnectivityProbe, Reachability};
pub use scheduler::{TaskScheduler, TokioScheduler};
pub use tmdb::{RemoteSource, TmdbClient};
