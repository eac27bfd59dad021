//! Last-value-wins observable.
//!
//! Holds the latest value and notifies subscribers on change. A new
//! subscriber immediately receives the current value, so late subscribers
//! (e.g. a re-attached view) see the same state as everyone else.
//! Intermediate values may be skipped when updates outpace a subscriber.

use tokio::sync::watch;

use crate::scheduler::TaskScheduler;

#[derive(Debug)]
pub struct Observable<T> {
  tx: watch::Sender<T>,
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
  pub fn new(initial: T) -> Self {
    let (tx, _rx) = watch::channel(initial);
    Self { tx }
  }

  /// Current value
  pub fn get(&self) -> T {
    self.tx.borrow().clone()
  }

  /// Replace the value and wake subscribers.
  pub fn set(&self, value: T) {
    self.tx.send_replace(value);
  }

  /// Receiver whose first read yields the current value.
  pub fn subscribe(&self) -> watch::Receiver<T> {
    let mut rx = self.tx.subscribe();
    rx.mark_changed();
    rx
  }

  /// Invoke `callback` with the current value, then with every later change.
  ///
  /// Callbacks run on `scheduler`, never inside `set`, so they may call back
  /// into whatever owns this observable. Delivery stops once the observable
  /// is dropped.
  pub fn observe<F>(&self, scheduler: &dyn TaskScheduler, mut callback: F)
  where
    F: FnMut(T) + Send + 'static,
  {
    let mut rx = self.subscribe();
    scheduler.submit(Box::pin(async move {
      while rx.changed().await.is_ok() {
        let value = rx.borrow_and_update().clone();
        callback(value);
      }
    }));
  }
}
