use super::PLACEHOLDER;
use chrono::{Local, TimeZone};
use serde_json::Value;
use std::fmt::Display;

/// en-US `toLocaleString` layout, e.g. `10/26/2023, 10:30:00 AM`.
pub const DETECTED_AT_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

pub const INVALID_DATE: &str = "Invalid Date";

/// "NetworkProxyConfigured" -> "Network Proxy Configured".
pub fn type_label(tag: &str) -> String {
  let mut out = String::with_capacity(tag.len() + 4);
  for c in tag.chars() {
    if c.is_ascii_uppercase() {
      out.push(' ');
    }
    out.push(c);
  }
  out.trim().to_string()
}

/// "proxyHost" -> "Proxy Host".
pub fn field_label(key: &str) -> String {
  let mut out = String::with_capacity(key.len() + 4);
  for (i, c) in key.chars().enumerate() {
    if i == 0 {
      out.extend(c.to_uppercase());
      continue;
    }
    if c.is_ascii_uppercase() {
      out.push(' ');
    }
    out.push(c);
  }
  out
}

pub fn display_text(s: &str) -> String {
  if s.is_empty() {
    PLACEHOLDER.to_string()
  } else {
    s.to_string()
  }
}

pub fn display_value(value: &Value) -> String {
  match value {
    Value::Null => PLACEHOLDER.to_string(),
    Value::String(s) => display_text(s),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    Value::Array(_) | Value::Object(_) => value.to_string(),
  }
}

pub fn detected_at(timestamp_unix_ms: i64) -> String {
  detected_at_in(timestamp_unix_ms, &Local)
}

pub fn detected_at_in<Tz>(timestamp_unix_ms: i64, tz: &Tz) -> String
where
  Tz: TimeZone,
  Tz::Offset: Display,
{
  match tz.timestamp_millis_opt(timestamp_unix_ms).single() {
    Some(dt) => dt.format(DETECTED_AT_FORMAT).to_string(),
    None => INVALID_DATE.to_string(),
  }
}
