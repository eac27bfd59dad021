//! User-facing error taxonomy for listing and lookups.
//!
//! Infrastructure failures (SQLite, HTTP, decoding) travel as `color_eyre`
//! reports. Only the variants here reach the presentation layer.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
  /// The probe reported no network at the time of failure
  #[error("no network connectivity")]
  NoConnectivity { has_items: bool },

  /// The network is up but the remote source failed
  #[error("remote source failed")]
  RemoteUnknown { has_items: bool },

  /// Malformed request, rejected before anything is scheduled
  #[error("invalid request: {0}")]
  InvalidRequest(String),
}

impl CatalogError {
  /// Whether previously loaded items are still displayable
  pub fn has_items(&self) -> bool {
    match self {
      CatalogError::NoConnectivity { has_items } | CatalogError::RemoteUnknown { has_items } => {
        *has_items
      }
      CatalogError::InvalidRequest(_) => false,
    }
  }

  /// Classify a miss given the probe's verdict
  pub fn from_miss(connected: bool, has_items: bool) -> Self {
    if connected {
      CatalogError::RemoteUnknown { has_items }
    } else {
      CatalogError::NoConnectivity { has_items }
    }
  }
}
