use crate::feed::{lock, EventFeed, Subscribers, Subscription};
use crate::types::{now_unix_ms, ProxyEventDetails, ThreatEvent};
use async_trait::async_trait;
use std::sync::Mutex;

pub const ID_PREFIX: &str = "evt-";

const MINUTE_MS: i64 = 60 * 1000;

#[derive(Debug)]
struct EventLog {
  events: Vec<ThreatEvent>,
  next_id: u64,
}

impl EventLog {
  fn append(&mut self, details: ProxyEventDetails, timestamp_unix_ms: i64) -> ThreatEvent {
    let id = format!("{ID_PREFIX}{}", self.next_id);
    self.next_id += 1;
    let event = details.into_event(id, timestamp_unix_ms);
    self.events.push(event.clone());
    event
  }
}

/// In-memory, append-only event log standing in for the telemetry feed.
#[derive(Debug)]
pub struct ThreatEventsService {
  log: Mutex<EventLog>,
  subscribers: Subscribers,
}

impl Default for ThreatEventsService {
  fn default() -> Self {
    Self::new()
  }
}

impl ThreatEventsService {
  pub fn new() -> Self {
    let now = now_unix_ms();
    let mut log = EventLog {
      events: Vec::new(),
      next_id: 1,
    };
    for (minutes_ago, details) in seed_events() {
      log.append(details, now - minutes_ago * MINUTE_MS);
    }

    Self {
      log: Mutex::new(log),
      subscribers: Subscribers::new(),
    }
  }

  /// Snapshot of every event, in insertion order.
  pub fn get_all_events(&self) -> Vec<ThreatEvent> {
    lock(&self.log).events.clone()
  }

  /// Appends a proxy event and pushes it to live subscribers in id order.
  pub fn simulate_network_proxy_configured_event(&self, details: ProxyEventDetails) -> ThreatEvent {
    let mut log = lock(&self.log);
    let event = log.append(details, now_unix_ms());
    // publish under the log lock so subscribers never see ids out of order
    let delivered = self.subscribers.publish(&event);
    drop(log);

    tracing::info!(
      event_id = %event.id,
      event_name = %event.event_name(),
      "simulated threat event appended"
    );
    tracing::debug!(event_id = %event.id, subscribers = delivered, "live event published");
    event
  }

  pub fn len(&self) -> usize {
    lock(&self.log).events.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[async_trait]
impl EventFeed for ThreatEventsService {
  async fn fetch_all(&self) -> anyhow::Result<Vec<ThreatEvent>> {
    Ok(self.get_all_events())
  }

  fn subscribe(&self) -> Subscription {
    self.subscribers.register()
  }
}

fn seed_events() -> Vec<(i64, ProxyEventDetails)> {
  let proxy = |host: &str, port: i64, kind: &str, conn: &str, state: &str| ProxyEventDetails {
    proxy_host: Some(host.to_string()),
    proxy_port: Some(port),
    proxy_type: Some(kind.to_string()),
    connection_type: Some(conn.to_string()),
    application_state: Some(state.to_string()),
  };

  vec![
    (120, proxy("proxy.example.com", 8080, "HTTP", "WiFi", "foreground")),
    (30, proxy("secproxy.example.net", 3128, "SOCKS", "Cellular", "background")),
    (5, proxy("another.proxy.org", 1080, "HTTP", "WiFi", "foreground")),
  ]
}
