use crate::error::CatalogError;

/// Externally observable status of a listing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationState {
  /// No session started
  #[default]
  Idle,
  /// The first page of a session is in flight
  LoadingFirst,
  /// A further page is in flight while earlier items stay visible
  LoadingNext,
  /// The last request succeeded
  Loaded,
  /// The last request failed while the network was up
  ErrorUnknown { has_items: bool },
  /// The last request failed while the network was down
  ErrorNoConnectivity { has_items: bool },
}

impl OperationState {
  pub fn is_loading(&self) -> bool {
    matches!(self, OperationState::LoadingFirst | OperationState::LoadingNext)
  }

  pub fn is_loaded(&self) -> bool {
    matches!(self, OperationState::Loaded)
  }

  pub fn is_error(&self) -> bool {
    self.error().is_some()
  }

  /// The user-facing error, if the session is in an error state
  pub fn error(&self) -> Option<CatalogError> {
    match *self {
      OperationState::ErrorUnknown { has_items } => Some(CatalogError::RemoteUnknown { has_items }),
      OperationState::ErrorNoConnectivity { has_items } => {
        Some(CatalogError::NoConnectivity { has_items })
      }
      _ => None,
    }
  }
}

impl From<CatalogError> for OperationState {
  fn from(error: CatalogError) -> Self {
    match error {
      CatalogError::NoConnectivity { has_items } => OperationState::ErrorNoConnectivity { has_items },
      CatalogError::RemoteUnknown { has_items } => OperationState::ErrorUnknown { has_items },
      // Never scheduled, so never reached through a session
      CatalogError::InvalidRequest(_) => OperationState::ErrorUnknown { has_items: false },
    }
  }
}
