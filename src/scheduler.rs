//! Executes fetch work off the caller's thread.

use futures::future::BoxFuture;
use tokio::runtime::Handle;

/// A unit of work handed to a scheduler
pub type Task = BoxFuture<'static, ()>;

pub trait TaskScheduler: Send + Sync {
  /// Run `task` in the background. Must not run it inline on the caller.
  fn submit(&self, task: Task);
}

/// Spawns tasks on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
  handle: Handle,
}

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self {
    Self { handle }
  }

  /// Scheduler for the runtime the caller is running on.
  ///
  /// Panics outside a tokio runtime, like `tokio::spawn`.
  pub fn current() -> Self {
    Self::new(Handle::current())
  }
}

impl TaskScheduler for TokioScheduler {
  fn submit(&self, task: Task) {
    self.handle.spawn(task);
  }
}
