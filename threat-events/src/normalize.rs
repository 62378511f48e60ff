use crate::types::{EventKind, ThreatEvent, ThreatEventType};
use anyhow::Context;
use serde_json::{Map, Value};

// Producers disagree on the discriminant key; `eventName` wins when both are sent.
const DISCRIMINANT_KEYS: &[&str] = &["eventName", "type"];

pub fn normalize_record(record: &Value) -> anyhow::Result<ThreatEvent> {
  let obj = record
    .as_object()
    .ok_or_else(|| anyhow::anyhow!("record is not a JSON object"))?;

  let id = match obj.get("id") {
    Some(Value::String(s)) if !s.is_empty() => s.clone(),
    _ => anyhow::bail!("record has no id"),
  };

  let tag = DISCRIMINANT_KEYS
    .iter()
    .find_map(|k| obj.get(*k).and_then(Value::as_str))
    .ok_or_else(|| anyhow::anyhow!("record {id} has no eventName/type"))?;

  let timestamp_unix_ms =
    parse_timestamp(obj.get("timestamp")).with_context(|| format!("record {id}"))?;

  let mut kind = match tag.parse::<ThreatEventType>() {
    Ok(t) => EventKind::from(t),
    Err(_) => EventKind::Unknown(tag.to_string()),
  };

  let mut event = ThreatEvent::new(id, EventKind::Unknown(String::new()), timestamp_unix_ms);
  let mut extra = Vec::new();

  for (key, value) in obj {
    match key.as_str() {
      "id" | "eventName" | "type" | "timestamp" => {}
      "applicationState" => {
        event.application_state = string_field(&event.id, key, value, &mut extra);
      }
      "description" => {
        event.description = string_field(&event.id, key, value, &mut extra);
      }
      "isActive" => match value {
        Value::Bool(b) => event.is_active = Some(*b),
        Value::Null => {}
        other => keep_mistyped(&event.id, key, other, &mut extra),
      },
      _ => {
        if let EventKind::NetworkProxyConfigured(proxy) = &mut kind {
          match key.as_str() {
            "proxyHost" => {
              proxy.proxy_host = string_field(&event.id, key, value, &mut extra);
              continue;
            }
            "proxyType" => {
              proxy.proxy_type = string_field(&event.id, key, value, &mut extra);
              continue;
            }
            "connectionType" => {
              proxy.connection_type = string_field(&event.id, key, value, &mut extra);
              continue;
            }
            "proxyPort" => {
              match value {
                Value::Number(n) if n.as_i64().is_some() => proxy.proxy_port = n.as_i64(),
                Value::Null => {}
                other => keep_mistyped(&event.id, key, other, &mut extra),
              }
              continue;
            }
            _ => {}
          }
        }
        extra.push((key.clone(), value.clone()));
      }
    }
  }

  event.kind = kind;
  event.extra = extra;
  Ok(event)
}

/// Normalizes a batch, dropping records that cannot be represented.
pub fn normalize_records(records: &[Value]) -> Vec<ThreatEvent> {
  records
    .iter()
    .enumerate()
    .filter_map(|(index, record)| match normalize_record(record) {
      Ok(ev) => Some(ev),
      Err(e) => {
        tracing::warn!(index, error = %format!("{e:#}"), "dropping malformed threat event record");
        None
      }
    })
    .collect()
}

pub fn to_record(event: &ThreatEvent) -> Value {
  let mut obj = Map::new();
  obj.insert("id".to_string(), Value::from(event.id.clone()));
  obj.insert("eventName".to_string(), Value::from(event.event_name()));
  obj.insert("timestamp".to_string(), Value::from(event.timestamp_unix_ms));
  if let Some(s) = &event.application_state {
    obj.insert("applicationState".to_string(), Value::from(s.clone()));
  }
  if let Some(b) = event.is_active {
    obj.insert("isActive".to_string(), Value::from(b));
  }
  if let Some(d) = &event.description {
    obj.insert("description".to_string(), Value::from(d.clone()));
  }
  if let Some(p) = event.kind.proxy() {
    let fields = [
      ("proxyHost", p.proxy_host.clone().map(Value::from)),
      ("proxyPort", p.proxy_port.map(Value::from)),
      ("proxyType", p.proxy_type.clone().map(Value::from)),
      ("connectionType", p.connection_type.clone().map(Value::from)),
    ];
    for (key, value) in fields {
      if let Some(v) = value {
        obj.insert(key.to_string(), v);
      }
    }
  }
  for (key, value) in &event.extra {
    obj.entry(key.clone()).or_insert_with(|| value.clone());
  }
  Value::Object(obj)
}

fn parse_timestamp(value: Option<&Value>) -> anyhow::Result<i64> {
  match value {
    Some(Value::Number(n)) => n
      .as_i64()
      .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
      .ok_or_else(|| anyhow::anyhow!("timestamp out of range: {n}")),
    Some(Value::String(s)) => {
      let dt = chrono::DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("invalid ISO-8601 timestamp: {s}"))?;
      Ok(dt.timestamp_millis())
    }
    Some(other) => anyhow::bail!("unsupported timestamp value: {other}"),
    None => anyhow::bail!("missing timestamp"),
  }
}

fn string_field(
  event_id: &str,
  key: &str,
  value: &Value,
  extra: &mut Vec<(String, Value)>,
) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Null => None,
    other => {
      keep_mistyped(event_id, key, other, extra);
      None
    }
  }
}

fn keep_mistyped(event_id: &str, key: &str, value: &Value, extra: &mut Vec<(String, Value)>) {
  tracing::warn!(
    event_id = %event_id,
    field = %key,
    value = %value,
    "unexpected value type; keeping as additional detail"
  );
  extra.push((key.to_string(), value.clone()));
}
