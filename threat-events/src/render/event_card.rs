use super::format::{detected_at, display_text, display_value, field_label, type_label};
use super::{Card, DetailRow};
use crate::types::ThreatEvent;
use serde_json::Value;

pub fn event_card(event: &ThreatEvent) -> Card {
  let mut card = Card::new(type_label(event.event_name()));

  if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
    card.push_row("Description:", description);
  }
  let status = if event.is_active == Some(true) {
    "Active"
  } else {
    "Resolved"
  };
  card.push_row("Status:", status);
  card.push_row("Detected At:", detected_at(event.timestamp_unix_ms));
  card.push_row("Event ID:", display_text(&event.id));

  card.additional = additional_fields(event)
    .into_iter()
    .map(|(key, value)| DetailRow {
      label: format!("{}:", field_label(&key)),
      value: display_value(&value),
    })
    .collect();

  card
}

/// Every field outside the common header, in a stable order.
fn additional_fields(event: &ThreatEvent) -> Vec<(String, Value)> {
  let mut out = Vec::new();
  if let Some(state) = &event.application_state {
    out.push(("applicationState".to_string(), Value::from(state.clone())));
  }
  if let Some(p) = event.kind.proxy() {
    let fields = [
      ("proxyHost", p.proxy_host.clone().map(Value::from)),
      ("proxyPort", p.proxy_port.map(Value::from)),
      ("proxyType", p.proxy_type.clone().map(Value::from)),
      ("connectionType", p.connection_type.clone().map(Value::from)),
    ];
    out.extend(
      fields
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v))),
    );
  }
  out.extend(event.extra.iter().cloned());
  out
}
