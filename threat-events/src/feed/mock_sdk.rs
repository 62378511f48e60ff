use super::{EventFeed, Subscribers, Subscription};
use crate::normalize::normalize_records;
use crate::types::{now_unix_ms, ThreatEvent};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub const DEFAULT_LATENCY: Duration = Duration::from_millis(1000);

/// Stand-in for the device-security SDK. It never pushes events on its own;
/// `emit` is the only way to reach subscribers.
#[derive(Debug)]
pub struct MockSdkFeed {
  latency: Duration,
  fail_fetches: AtomicBool,
  subscribers: Subscribers,
}

impl Default for MockSdkFeed {
  fn default() -> Self {
    Self::new(DEFAULT_LATENCY)
  }
}

impl MockSdkFeed {
  pub fn new(latency: Duration) -> Self {
    Self {
      latency,
      fail_fetches: AtomicBool::new(false),
      subscribers: Subscribers::new(),
    }
  }

  pub fn set_fail_fetches(&self, fail: bool) {
    self.fail_fetches.store(fail, Ordering::SeqCst);
  }

  pub fn emit(&self, event: ThreatEvent) -> usize {
    tracing::info!(event_id = %event.id, event_name = %event.event_name(), "mock SDK push");
    self.subscribers.publish(&event)
  }
}

#[async_trait]
impl EventFeed for MockSdkFeed {
  async fn fetch_all(&self) -> anyhow::Result<Vec<ThreatEvent>> {
    if !self.latency.is_zero() {
      tokio::time::sleep(self.latency).await;
    }
    if self.fail_fetches.load(Ordering::SeqCst) {
      anyhow::bail!("mock SDK: initial event fetch failed");
    }
    Ok(normalize_records(&mock_records(now_unix_ms())))
  }

  fn subscribe(&self) -> Subscription {
    self.subscribers.register()
  }
}

fn minutes_ago_iso(now_ms: i64, minutes: i64) -> String {
  DateTime::<Utc>::from_timestamp_millis(now_ms - minutes * 60 * 1000)
    .unwrap_or_default()
    .to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn mock_records(now_ms: i64) -> Vec<Value> {
  vec![
    json!({
      "id": "evt-mock-1",
      "type": "RootedDevice",
      "timestamp": minutes_ago_iso(now_ms, 37),
      "isActive": true,
      "description": "Device has superuser access enabled."
    }),
    json!({
      "id": "evt-mock-2",
      "type": "NetworkProxyConfigured",
      "timestamp": minutes_ago_iso(now_ms, 84),
      "isActive": true,
      "proxyHost": "192.168.1.100",
      "proxyPort": 8888,
      "description": "Network proxy is configured, potentially intercepting traffic."
    }),
    json!({
      "id": "evt-mock-3",
      "type": "DeveloperOptionsEnabled",
      "timestamp": minutes_ago_iso(now_ms, 12),
      "isActive": true,
      "description": "Developer options are enabled on this device."
    }),
    json!({
      "id": "evt-mock-4",
      "type": "SslCertificateValidationFailed",
      "timestamp": minutes_ago_iso(now_ms, 4),
      "isActive": true,
      "description": "An SSL certificate validation failed for a connection."
    }),
    json!({
      "id": "evt-mock-5",
      "type": "EmulatorFound",
      "timestamp": minutes_ago_iso(now_ms, 190),
      "isActive": false,
      "description": "Application is running on an emulator environment."
    }),
  ]
}
