use crate::types::ThreatEvent;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use uuid::Uuid;

pub mod mock_sdk;

pub use mock_sdk::MockSdkFeed;

/// Boundary to the device-security telemetry source.
#[async_trait]
pub trait EventFeed: Send + Sync {
  async fn fetch_all(&self) -> anyhow::Result<Vec<ThreatEvent>>;

  fn subscribe(&self) -> Subscription;
}

type Registry = Mutex<HashMap<Uuid, mpsc::UnboundedSender<ThreatEvent>>>;

/// Live-event subscribers of one producer. Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct Subscribers {
  inner: Arc<Registry>,
}

impl Subscribers {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&self) -> Subscription {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::unbounded_channel();
    lock(&self.inner).insert(id, tx);
    tracing::debug!(subscription_id = %id, "live event subscriber registered");
    Subscription {
      id,
      rx,
      registry: Arc::downgrade(&self.inner),
    }
  }

  /// Delivers to every open subscriber and returns how many remain.
  pub fn publish(&self, event: &ThreatEvent) -> usize {
    let mut subs = lock(&self.inner);
    subs.retain(|id, tx| {
      let open = tx.send(event.clone()).is_ok();
      if !open {
        tracing::debug!(subscription_id = %id, "pruning closed subscriber");
      }
      open
    });
    subs.len()
  }

  pub fn len(&self) -> usize {
    lock(&self.inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Receiving side of a live-event registration. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
  id: Uuid,
  rx: mpsc::UnboundedReceiver<ThreatEvent>,
  registry: Weak<Registry>,
}

impl Subscription {
  pub fn id(&self) -> Uuid {
    self.id
  }

  pub async fn recv(&mut self) -> Option<ThreatEvent> {
    self.rx.recv().await
  }

  pub fn try_recv(&mut self) -> Option<ThreatEvent> {
    self.rx.try_recv().ok()
  }

  pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(registry) = self.registry.upgrade() {
      if lock(&registry).remove(&self.id).is_some() {
        tracing::debug!(subscription_id = %self.id, "live event subscriber removed");
      }
    }
  }
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
  m.lock().unwrap_or_else(PoisonError::into_inner)
}
