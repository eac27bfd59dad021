//! Network reachability.

use std::sync::atomic::{AtomicBool, Ordering};

/// Reports whether the network is currently reachable.
pub trait ConnectivityProbe: Send + Sync {
  fn is_connected(&self) -> bool;
}

/// Reachability flag updated by whoever observes the network.
///
/// The HTTP client flips it on transport failures and back on any response;
/// tests and hosts with their own signal set it directly.
#[derive(Debug)]
pub struct Reachability {
  connected: AtomicBool,
}

impl Reachability {
  pub fn new(connected: bool) -> Self {
    Self {
      connected: AtomicBool::new(connected),
    }
  }

  pub fn set_connected(&self, connected: bool) {
    let previous = self.connected.swap(connected, Ordering::SeqCst);
    if previous != connected {
      tracing::info!(connected, "network reachability changed");
    }
  }
}

impl Default for Reachability {
  fn default() -> Self {
    Self::new(true)
  }
}

impl ConnectivityProbe for Reachability {
  fn is_connected(&self) -> bool {
    self.connected.load(Ordering::SeqCst)
  }
}
