use super::format::detected_at;
use super::{Card, MissingField, PLACEHOLDER};
use crate::types::{ProxyDetails, ThreatEvent};

const TITLE: &str = "Network Proxy Detected";

pub fn proxy_card(event: &ThreatEvent, proxy: &ProxyDetails) -> Card {
  let mut card = Card::new(TITLE);
  let port = proxy.proxy_port.map(|p| p.to_string());

  let tracked: [(&str, &'static str, Option<&str>); 5] = [
    ("Proxy Host:", "proxyHost", proxy.proxy_host.as_deref()),
    ("Proxy Port:", "proxyPort", port.as_deref()),
    ("Proxy Type:", "proxyType", proxy.proxy_type.as_deref()),
    ("Connection Type:", "connectionType", proxy.connection_type.as_deref()),
    (
      "Application State:",
      "applicationState",
      event.application_state.as_deref(),
    ),
  ];

  for (label, field, value) in tracked {
    // Only absent and "" count as missing; a port of 0 is a real value.
    let display = match value {
      Some(v) if !v.is_empty() => v.to_string(),
      _ => {
        tracing::warn!(
          field,
          event_id = %event.id,
          "proxy event field is missing or empty"
        );
        card.warnings.push(MissingField {
          field,
          event_id: event.id.clone(),
        });
        PLACEHOLDER.to_string()
      }
    };
    card.push_row(label, display);
  }

  card.push_row("Detected At:", detected_at(event.timestamp_unix_ms));
  card
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::log_capture::CapturedLogs;
  use crate::types::EventKind;

  fn base_event() -> ThreatEvent {
    let mut ev = ThreatEvent::new(
      "evt-test-123",
      EventKind::NetworkProxyConfigured(ProxyDetails {
        proxy_host: Some("secure.proxy.info".to_string()),
        proxy_port: Some(3128),
        proxy_type: Some("SOCKS5".to_string()),
        connection_type: Some("WiFi".to_string()),
      }),
      1_698_316_200_000,
    );
    ev.application_state = Some("foreground".to_string());
    ev
  }

  fn render(ev: &ThreatEvent) -> Card {
    proxy_card(ev, ev.kind.proxy().unwrap())
  }

  fn proxy_mut(ev: &mut ThreatEvent) -> &mut ProxyDetails {
    match &mut ev.kind {
      EventKind::NetworkProxyConfigured(p) => p,
      _ => unreachable!(),
    }
  }

  fn warned_fields(card: &Card) -> Vec<&'static str> {
    card.warnings.iter().map(|w| w.field).collect()
  }

  #[test]
  fn complete_event_renders_without_warnings() {
    let ev = base_event();
    let card = render(&ev);

    assert_eq!(card.title, "Network Proxy Detected");
    assert_eq!(card.value("Proxy Host:"), Some("secure.proxy.info"));
    assert_eq!(card.value("Proxy Port:"), Some("3128"));
    assert_eq!(card.value("Proxy Type:"), Some("SOCKS5"));
    assert_eq!(card.value("Connection Type:"), Some("WiFi"));
    assert_eq!(card.value("Application State:"), Some("foreground"));
    assert_eq!(
      card.value("Detected At:"),
      Some(detected_at(1_698_316_200_000).as_str())
    );
    assert!(card.warnings.is_empty());
    assert!(card.additional.is_empty());
  }

  #[test]
  fn missing_and_empty_strings_become_placeholders() {
    let mut ev = base_event();
    ev.id = "evt-missing-strings".to_string();
    proxy_mut(&mut ev).proxy_host = None;
    proxy_mut(&mut ev).proxy_type = Some(String::new());
    let card = render(&ev);

    assert_eq!(card.value("Proxy Host:"), Some(PLACEHOLDER));
    assert_eq!(card.value("Proxy Type:"), Some(PLACEHOLDER));
    assert_eq!(warned_fields(&card), vec!["proxyHost", "proxyType"]);
    assert!(card.warnings.iter().all(|w| w.event_id == "evt-missing-strings"));
  }

  #[test]
  fn missing_port_is_reported() {
    let mut ev = base_event();
    ev.id = "evt-missing-port".to_string();
    proxy_mut(&mut ev).proxy_port = None;
    let card = render(&ev);

    assert_eq!(card.value("Proxy Port:"), Some(PLACEHOLDER));
    assert_eq!(
      card.warnings,
      vec![MissingField {
        field: "proxyPort",
        event_id: "evt-missing-port".to_string(),
      }]
    );
  }

  #[test]
  fn zero_port_is_not_missing() {
    let mut ev = base_event();
    proxy_mut(&mut ev).proxy_port = Some(0);
    let card = render(&ev);

    assert_eq!(card.value("Proxy Port:"), Some("0"));
    assert!(card.warnings.is_empty());
  }

  #[test]
  fn connection_type_and_application_state() {
    let mut ev = base_event();
    ev.id = "evt-missing-other".to_string();
    proxy_mut(&mut ev).connection_type = None;
    ev.application_state = Some(String::new());
    let card = render(&ev);

    assert_eq!(card.value("Connection Type:"), Some(PLACEHOLDER));
    assert_eq!(card.value("Application State:"), Some(PLACEHOLDER));
    assert_eq!(warned_fields(&card), vec!["connectionType", "applicationState"]);
    assert_eq!(card.value("Proxy Host:"), Some("secure.proxy.info"));
  }

  #[test]
  fn empty_event_warns_once_per_field() {
    let ev = ThreatEvent::new(
      "evt-bare",
      EventKind::NetworkProxyConfigured(ProxyDetails::default()),
      0,
    );
    let card = render(&ev);

    assert_eq!(
      warned_fields(&card),
      vec!["proxyHost", "proxyPort", "proxyType", "connectionType", "applicationState"]
    );
    assert_eq!(card.rows.len(), 6);
    assert_eq!(
      card.rows.iter().filter(|r| r.value == PLACEHOLDER).count(),
      5
    );
  }

  #[test]
  fn each_missing_field_logs_one_warning() {
    let mut ev = ThreatEvent::new(
      "evt-x",
      EventKind::NetworkProxyConfigured(ProxyDetails::default()),
      0,
    );
    ev.application_state = Some("foreground".to_string());

    let logs = CapturedLogs::default();
    logs.capture(|| render(&ev));
    let warns = logs.lines_at("WARN");

    assert_eq!(warns.len(), 4, "{warns:?}");
    for (line, field) in warns
      .iter()
      .zip(["proxyHost", "proxyPort", "proxyType", "connectionType"])
    {
      assert!(line.contains(&format!("field=\"{field}\"")), "{line}");
      assert!(line.contains("event_id=evt-x"), "{line}");
    }
  }

  #[test]
  fn zero_port_logs_nothing() {
    let mut ev = base_event();
    proxy_mut(&mut ev).proxy_port = Some(0);

    let logs = CapturedLogs::default();
    logs.capture(|| render(&ev));
    assert!(logs.lines_at("WARN").is_empty());
  }
}
