mod event_card;
pub mod format;
mod proxy_card;

use crate::types::ThreatEvent;
use std::fmt;

pub use event_card::event_card;
pub use proxy_card::proxy_card;

/// Shown in place of a missing or empty value.
pub const PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
  pub label: String,
  pub value: String,
}

/// A tracked field that was absent or empty when the card was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
  pub field: &'static str,
  pub event_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Card {
  pub title: String,
  pub rows: Vec<DetailRow>,
  pub additional: Vec<DetailRow>,
  pub warnings: Vec<MissingField>,
}

impl Card {
  fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      ..Self::default()
    }
  }

  fn push_row(&mut self, label: impl Into<String>, value: impl Into<String>) {
    self.rows.push(DetailRow {
      label: label.into(),
      value: value.into(),
    });
  }

  /// Value of the first row (main or additional) with this label.
  pub fn value(&self, label: &str) -> Option<&str> {
    self
      .rows
      .iter()
      .chain(self.additional.iter())
      .find(|r| r.label == label)
      .map(|r| r.value.as_str())
  }
}

impl fmt::Display for Card {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", self.title)?;
    for row in &self.rows {
      writeln!(f, "  {} {}", row.label, row.value)?;
    }
    if !self.additional.is_empty() {
      writeln!(f, "  Additional Details:")?;
      for row in &self.additional {
        writeln!(f, "    {} {}", row.label, row.value)?;
      }
    }
    Ok(())
  }
}

/// Proxy events get the proxy card, everything else the generic card.
pub fn render_event(event: &ThreatEvent) -> Card {
  match event.kind.proxy() {
    Some(proxy) => proxy_card(event, proxy),
    None => event_card(event),
  }
}
