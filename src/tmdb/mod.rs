//! TMDB v3 API access.

pub mod api_types;
pub mod client;
pub mod source;

pub use client::TmdbClient;
pub use source::RemoteSource;
