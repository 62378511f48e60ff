use crate::feed::{EventFeed, Subscription};
use crate::types::ThreatEvent;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const FETCH_ERROR_MESSAGE: &str = "Failed to fetch threat events.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
  Idle,
  Loading,
  Loaded,
  Error,
}

#[derive(Debug, Clone)]
pub struct HookState {
  pub status: FetchStatus,
  pub events: Vec<ThreatEvent>,
  pub error: Option<String>,
  generation: u64,
}

impl Default for HookState {
  fn default() -> Self {
    Self {
      status: FetchStatus::Idle,
      events: Vec::new(),
      error: None,
      generation: 0,
    }
  }
}

impl HookState {
  pub fn is_loading(&self) -> bool {
    self.status == FetchStatus::Loading
  }
}

/// Fetch/refresh state for a threat event list.
///
/// Every fetch takes a generation number when it starts; a result is only
/// applied if no newer fetch was started in the meantime. There is no timeout:
/// a feed that never answers leaves the state in `Loading`.
#[derive(Clone)]
pub struct EventsHook {
  feed: Arc<dyn EventFeed>,
  state: Arc<watch::Sender<HookState>>,
}

impl EventsHook {
  pub fn new(feed: Arc<dyn EventFeed>) -> Self {
    let (tx, _rx) = watch::channel(HookState::default());
    Self {
      feed,
      state: Arc::new(tx),
    }
  }

  pub fn snapshot(&self) -> HookState {
    self.state.borrow().clone()
  }

  pub fn watch(&self) -> watch::Receiver<HookState> {
    self.state.subscribe()
  }

  /// Initial fetch; like [`EventsHook::refresh`] it needs a tokio runtime.
  pub fn mount(&self) -> JoinHandle<()> {
    tracing::debug!("threat events hook mounted");
    self.refresh()
  }

  /// Moves to `Loading` immediately and runs the fetch on the runtime.
  ///
  /// Spawns onto the current tokio runtime, so it panics when called outside
  /// one. Use [`EventsHook::fetch`] to drive a fetch from your own task.
  pub fn refresh(&self) -> JoinHandle<()> {
    let generation = self.begin_fetch();
    let hook = self.clone();
    tokio::spawn(async move { hook.complete_fetch(generation).await })
  }

  pub async fn fetch(&self) {
    let generation = self.begin_fetch();
    self.complete_fetch(generation).await;
  }

  fn begin_fetch(&self) -> u64 {
    let mut generation = 0;
    self.state.send_modify(|s| {
      s.generation += 1;
      s.status = FetchStatus::Loading;
      s.error = None;
      generation = s.generation;
    });
    tracing::debug!(generation, "fetching threat events");
    generation
  }

  async fn complete_fetch(&self, generation: u64) {
    let result = self.feed.fetch_all().await;
    self.state.send_if_modified(|s| {
      if s.generation != generation {
        tracing::debug!(
          generation,
          latest = s.generation,
          "discarding stale threat event fetch result"
        );
        return false;
      }

      match result {
        Ok(events) => {
          tracing::info!(count = events.len(), "threat events loaded");
          s.events = events;
          s.status = FetchStatus::Loaded;
        }
        Err(e) => {
          tracing::error!(error = ?e, "threat event fetch failed");
          s.error = Some(FETCH_ERROR_MESSAGE.to_string());
          s.status = FetchStatus::Error;
        }
      }
      true
    });
  }

  pub fn apply_live_event(&self, event: ThreatEvent) {
    tracing::debug!(event_id = %event.id, "applying live threat event");
    self.state.send_modify(|s| merge_live_event(&mut s.events, event));
  }

  /// Applies every event received on `subscription` until the stream closes
  /// or the returned task is aborted.
  pub fn attach(&self, mut subscription: Subscription) -> JoinHandle<()> {
    let hook = self.clone();
    tokio::spawn(async move {
      tracing::info!(subscription_id = %subscription.id(), "live threat event updates attached");
      while let Some(event) = subscription.recv().await {
        hook.apply_live_event(event);
      }
      tracing::debug!(subscription_id = %subscription.id(), "live threat event stream closed");
    })
  }

  pub fn subscribe_live(&self) -> JoinHandle<()> {
    self.attach(self.feed.subscribe())
  }
}

/// Replaces an event with the same id in place, otherwise prepends it.
pub fn merge_live_event(events: &mut Vec<ThreatEvent>, event: ThreatEvent) {
  match events.iter_mut().find(|e| e.id == event.id) {
    Some(existing) => *existing = event,
    None => events.insert(0, event),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::feed::{lock, MockSdkFeed, Subscribers};
  use crate::log_capture::CapturedLogs;
  use crate::service::ThreatEventsService;
  use crate::types::{EventKind, ProxyEventDetails, ThreatEventType};
  use async_trait::async_trait;
  use std::sync::Mutex;
  use std::time::Duration;
  use tokio::sync::oneshot;

  type Gate = oneshot::Sender<anyhow::Result<Vec<ThreatEvent>>>;

  #[derive(Default)]
  struct GatedFeed {
    pending: Mutex<Vec<Gate>>,
  }

  impl GatedFeed {
    fn pending(&self) -> usize {
      lock(&self.pending).len()
    }

    fn take(&self) -> Vec<Gate> {
      std::mem::take(&mut *lock(&self.pending))
    }
  }

  #[async_trait]
  impl EventFeed for GatedFeed {
    async fn fetch_all(&self) -> anyhow::Result<Vec<ThreatEvent>> {
      let (tx, rx) = oneshot::channel();
      lock(&self.pending).push(tx);
      rx.await
        .unwrap_or_else(|_| Err(anyhow::anyhow!("gate dropped")))
    }

    fn subscribe(&self) -> Subscription {
      Subscribers::new().register()
    }
  }

  fn event(id: &str) -> ThreatEvent {
    ThreatEvent::new(id, EventKind::Known(ThreatEventType::RootedDevice), 1)
  }

  async fn wait_for_pending(feed: &GatedFeed, n: usize) {
    while feed.pending() < n {
      tokio::task::yield_now().await;
    }
  }

  #[test]
  fn starts_idle_and_empty() {
    let hook = EventsHook::new(Arc::new(ThreatEventsService::new()));
    let st = hook.snapshot();
    assert_eq!(st.status, FetchStatus::Idle);
    assert!(!st.is_loading());
    assert!(st.events.is_empty());
    assert!(st.error.is_none());
  }

  #[tokio::test]
  async fn mount_loads_seeded_events() {
    let hook = EventsHook::new(Arc::new(ThreatEventsService::new()));
    let handle = hook.mount();
    assert!(hook.snapshot().is_loading());

    handle.await.unwrap();
    let st = hook.snapshot();
    assert_eq!(st.status, FetchStatus::Loaded);
    let ids: Vec<&str> = st.events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["evt-1", "evt-2", "evt-3"]);
  }

  #[tokio::test]
  async fn failure_sets_message_and_keeps_events() {
    let feed = Arc::new(MockSdkFeed::new(Duration::ZERO));
    let hook = EventsHook::new(feed.clone());

    hook.fetch().await;
    assert_eq!(hook.snapshot().events.len(), 5);

    feed.set_fail_fetches(true);
    hook.refresh().await.unwrap();
    let st = hook.snapshot();
    assert_eq!(st.status, FetchStatus::Error);
    assert_eq!(st.error.as_deref(), Some(FETCH_ERROR_MESSAGE));
    assert!(!st.is_loading());
    assert_eq!(st.events.len(), 5);

    feed.set_fail_fetches(false);
    let handle = hook.refresh();
    assert!(hook.snapshot().error.is_none());
    handle.await.unwrap();
    assert_eq!(hook.snapshot().status, FetchStatus::Loaded);
  }

  #[tokio::test]
  async fn failure_detail_is_logged_not_shown() {
    let feed = Arc::new(MockSdkFeed::new(Duration::ZERO));
    feed.set_fail_fetches(true);
    let hook = EventsHook::new(feed);

    let logs = CapturedLogs::default();
    {
      let _guard = logs.set_default();
      hook.fetch().await;
    }

    let errors = logs.lines_at("ERROR");
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("threat event fetch failed"));
    assert!(errors[0].contains("mock SDK: initial event fetch failed"));
    assert_eq!(hook.snapshot().error.as_deref(), Some(FETCH_ERROR_MESSAGE));
  }

  #[tokio::test]
  async fn stale_result_is_discarded() {
    let feed = Arc::new(GatedFeed::default());
    let hook = EventsHook::new(feed.clone());

    let first = hook.refresh();
    wait_for_pending(&feed, 1).await;
    let second = hook.refresh();
    wait_for_pending(&feed, 2).await;

    let mut gates = feed.take();
    let older = gates.remove(0);
    let newer = gates.remove(0);

    newer.send(Ok(vec![event("new")])).unwrap();
    second.await.unwrap();
    assert_eq!(hook.snapshot().status, FetchStatus::Loaded);

    older.send(Ok(vec![event("old-1"), event("old-2")])).unwrap();
    first.await.unwrap();

    let st = hook.snapshot();
    assert_eq!(st.status, FetchStatus::Loaded);
    assert_eq!(st.events.len(), 1);
    assert_eq!(st.events[0].id, "new");
  }

  #[tokio::test]
  async fn stale_failure_does_not_mask_newer_success() {
    let feed = Arc::new(GatedFeed::default());
    let hook = EventsHook::new(feed.clone());

    let first = hook.refresh();
    wait_for_pending(&feed, 1).await;
    let second = hook.refresh();
    wait_for_pending(&feed, 2).await;

    let mut gates = feed.take();
    let older = gates.remove(0);
    let newer = gates.remove(0);

    newer.send(Ok(vec![event("a")])).unwrap();
    second.await.unwrap();
    older.send(Err(anyhow::anyhow!("network down"))).unwrap();
    first.await.unwrap();

    let st = hook.snapshot();
    assert_eq!(st.status, FetchStatus::Loaded);
    assert!(st.error.is_none());
  }

  #[tokio::test]
  async fn watchers_see_transitions() {
    let hook = EventsHook::new(Arc::new(ThreatEventsService::new()));
    let mut rx = hook.watch();

    hook.fetch().await;
    assert!(rx.has_changed().unwrap());
    let st = rx.borrow_and_update().clone();
    assert_eq!(st.status, FetchStatus::Loaded);
  }

  #[test]
  fn live_merge_replaces_or_prepends() {
    let mut events = vec![event("a"), event("b")];

    let mut updated = event("b");
    updated.is_active = Some(false);
    merge_live_event(&mut events, updated);
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].is_active, Some(false));

    merge_live_event(&mut events, event("c"));
    let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
  }

  #[tokio::test]
  async fn attached_subscription_feeds_the_list() {
    let svc = Arc::new(ThreatEventsService::new());
    let hook = EventsHook::new(svc.clone());
    hook.fetch().await;

    let mut rx = hook.watch();
    let _ = rx.borrow_and_update();
    let task = hook.subscribe_live();
    // registered before the task is spawned, so this event is not missed
    let ev = svc.simulate_network_proxy_configured_event(ProxyEventDetails::default());

    tokio::time::timeout(Duration::from_secs(5), rx.changed())
      .await
      .unwrap()
      .unwrap();
    let st = hook.snapshot();
    assert_eq!(st.events.len(), 4);
    assert_eq!(st.events[0].id, ev.id);

    task.abort();
  }
}
