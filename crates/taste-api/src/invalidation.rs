//! Journal view invalidation.
//!
//! Every successful write bumps a revision counter carried on a
//! [`tokio::sync::watch`] channel. Anything holding a cached rendering of
//! the journal subscribes and re-fetches when the revision moves.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable handle to the journal revision channel.
#[derive(Debug, Clone)]
pub struct Invalidation {
  tx: Arc<watch::Sender<u64>>,
}

impl Invalidation {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(0);
    Self { tx: Arc::new(tx) }
  }

  /// Signal that the journal changed. Returns the new revision.
  pub fn invalidate(&self) -> u64 {
    let mut revision = 0;
    self.tx.send_modify(|r| {
      *r += 1;
      revision = *r;
    });
    revision
  }

  /// The current revision; `0` until the first write.
  pub fn revision(&self) -> u64 { *self.tx.borrow() }

  pub fn subscribe(&self) -> watch::Receiver<u64> { self.tx.subscribe() }
}

impl Default for Invalidation {
  fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn invalidate_without_subscribers_still_advances() {
    let inv = Invalidation::new();
    assert_eq!(inv.revision(), 0);
    assert_eq!(inv.invalidate(), 1);
    assert_eq!(inv.invalidate(), 2);
    assert_eq!(inv.revision(), 2);
  }

  #[tokio::test]
  async fn subscribers_observe_each_bump() {
    let inv = Invalidation::new();
    let mut rx = inv.subscribe();
    assert!(!rx.has_changed().unwrap());

    let clone = inv.clone();
    clone.invalidate();

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), 1);
  }
}
