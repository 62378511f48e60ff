use std::fmt;
use std::str::FromStr;

pub const NETWORK_PROXY_CONFIGURED: &str = "NetworkProxyConfigured";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreatEventType {
  RootedDevice,
  UnknownSourcesEnabled,
  DeveloperOptionsEnabled,
  SslCertificateValidationFailed,
  SslNonSslConnection,
  SslIncompatibleVersion,
  NetworkProxyConfigured,
  DebuggerThreatDetected,
  AppIsDebuggable,
  AppIntegrityError,
  EmulatorFound,
  GoogleEmulatorDetected,
}

impl ThreatEventType {
  pub const ALL: &'static [ThreatEventType] = &[
    Self::RootedDevice,
    Self::UnknownSourcesEnabled,
    Self::DeveloperOptionsEnabled,
    Self::SslCertificateValidationFailed,
    Self::SslNonSslConnection,
    Self::SslIncompatibleVersion,
    Self::NetworkProxyConfigured,
    Self::DebuggerThreatDetected,
    Self::AppIsDebuggable,
    Self::AppIntegrityError,
    Self::EmulatorFound,
    Self::GoogleEmulatorDetected,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::RootedDevice => "RootedDevice",
      Self::UnknownSourcesEnabled => "UnknownSourcesEnabled",
      Self::DeveloperOptionsEnabled => "DeveloperOptionsEnabled",
      Self::SslCertificateValidationFailed => "SslCertificateValidationFailed",
      Self::SslNonSslConnection => "SslNonSslConnection",
      Self::SslIncompatibleVersion => "SslIncompatibleVersion",
      Self::NetworkProxyConfigured => NETWORK_PROXY_CONFIGURED,
      Self::DebuggerThreatDetected => "DebuggerThreatDetected",
      Self::AppIsDebuggable => "AppIsDebuggable",
      Self::AppIntegrityError => "AppIntegrityError",
      Self::EmulatorFound => "EmulatorFound",
      Self::GoogleEmulatorDetected => "GoogleEmulatorDetected",
    }
  }

  pub fn description(self) -> &'static str {
    match self {
      Self::RootedDevice => "Device integrity compromised: Root access has been detected. This could allow unauthorized actions.",
      Self::UnknownSourcesEnabled => "Security risk: Installation of applications from unknown sources is enabled. Only install apps from trusted stores.",
      Self::DeveloperOptionsEnabled => "Potential risk: Developer options are enabled on this device. These settings are intended for development purposes only.",
      Self::SslCertificateValidationFailed => "Network security warning: SSL certificate validation failed for a connection. This could indicate a man-in-the-middle attack.",
      Self::SslNonSslConnection => "Network security risk: Application attempted to establish a non-SSL connection to a host configured for SSL.",
      Self::SslIncompatibleVersion => "Network security risk: SSL connection failed due to an incompatible SSL/TLS version.",
      Self::NetworkProxyConfigured => "Network warning: A network proxy is configured. All network traffic may be routed through this proxy.",
      Self::DebuggerThreatDetected => "Security risk: A debugger is attached to the application. This could be used to inspect or modify app behavior.",
      Self::AppIsDebuggable => "Security configuration warning: The application is currently debuggable. This should be disabled in production builds.",
      Self::AppIntegrityError => "Application integrity compromised: The application code or its resources may have been tampered with.",
      Self::EmulatorFound => "Informational: Application is running in an emulated environment. Some functionalities might behave differently.",
      Self::GoogleEmulatorDetected => "Informational: Application is running on a Google-provided emulator.",
    }
  }
}

impl FromStr for ThreatEventType {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .iter()
      .copied()
      .find(|t| t.as_str() == s)
      .ok_or_else(|| anyhow::anyhow!("unknown threat event type: {s}"))
  }
}

impl fmt::Display for ThreatEventType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Human-readable description for a discriminant; unknown tags get a fallback.
pub fn get_event_description(tag: &str) -> String {
  match tag.parse::<ThreatEventType>() {
    Ok(t) => t.description().to_string(),
    Err(_) => format!("Unknown event type: {tag}"),
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyDetails {
  pub proxy_host: Option<String>,
  pub proxy_port: Option<i64>,
  pub proxy_type: Option<String>,
  pub connection_type: Option<String>,
}

static NO_PROXY_DETAILS: ProxyDetails = ProxyDetails {
  proxy_host: None,
  proxy_port: None,
  proxy_type: None,
  connection_type: None,
};

/// `Known(NetworkProxyConfigured)` is treated as a proxy event with no details;
/// build kinds from a type with `EventKind::from` to get the proxy variant.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
  NetworkProxyConfigured(ProxyDetails),
  Known(ThreatEventType),
  Unknown(String),
}

impl EventKind {
  pub fn tag(&self) -> &str {
    match self {
      Self::NetworkProxyConfigured(_) => NETWORK_PROXY_CONFIGURED,
      Self::Known(t) => t.as_str(),
      Self::Unknown(tag) => tag,
    }
  }

  pub fn proxy(&self) -> Option<&ProxyDetails> {
    match self {
      Self::NetworkProxyConfigured(p) => Some(p),
      Self::Known(ThreatEventType::NetworkProxyConfigured) => Some(&NO_PROXY_DETAILS),
      _ => None,
    }
  }
}

impl From<ThreatEventType> for EventKind {
  fn from(t: ThreatEventType) -> Self {
    match t {
      ThreatEventType::NetworkProxyConfigured => Self::NetworkProxyConfigured(ProxyDetails::default()),
      other => Self::Known(other),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreatEvent {
  pub id: String,
  pub kind: EventKind,
  pub timestamp_unix_ms: i64,
  pub application_state: Option<String>,
  pub is_active: Option<bool>,
  pub description: Option<String>,
  /// Unrecognised top-level fields, in the order the producer sent them.
  pub extra: Vec<(String, serde_json::Value)>,
}

impl ThreatEvent {
  pub fn new(id: impl Into<String>, kind: EventKind, timestamp_unix_ms: i64) -> Self {
    Self {
      id: id.into(),
      kind,
      timestamp_unix_ms,
      application_state: None,
      is_active: None,
      description: None,
      extra: Vec::new(),
    }
  }

  pub fn event_name(&self) -> &str {
    self.kind.tag()
  }

  pub fn describe(&self) -> String {
    get_event_description(self.event_name())
  }
}

/// Proxy event fields a caller may supply; id, name and timestamp are assigned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyEventDetails {
  pub proxy_host: Option<String>,
  pub proxy_port: Option<i64>,
  pub proxy_type: Option<String>,
  pub connection_type: Option<String>,
  pub application_state: Option<String>,
}

impl ProxyEventDetails {
  pub fn into_event(self, id: String, timestamp_unix_ms: i64) -> ThreatEvent {
    let mut event = ThreatEvent::new(
      id,
      EventKind::NetworkProxyConfigured(ProxyDetails {
        proxy_host: self.proxy_host,
        proxy_port: self.proxy_port,
        proxy_type: self.proxy_type,
        connection_type: self.connection_type,
      }),
      timestamp_unix_ms,
    );
    event.application_state = self.application_state;
    event
  }
}

pub fn now_unix_ms() -> i64 {
  use std::time::{SystemTime, UNIX_EPOCH};
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_millis() as i64
}
