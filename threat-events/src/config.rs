use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Config {
  pub logging: LoggingConfig,
  pub feed: FeedConfig,
  pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
  #[serde(default = "default_log_level")]
  pub level: String,

  #[serde(default = "default_retention_days")]
  pub retention_days: u64,
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_retention_days() -> u64 {
  14
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      retention_days: default_retention_days(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSource {
  Service,
  MockSdk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
  #[serde(default = "default_feed_source")]
  pub source: FeedSource,

  #[serde(default = "default_latency_ms")]
  pub latency_ms: u64,

  #[serde(default)]
  pub live_updates: bool,
}

fn default_feed_source() -> FeedSource {
  FeedSource::Service
}

fn default_latency_ms() -> u64 {
  1000
}

impl Default for FeedConfig {
  fn default() -> Self {
    Self {
      source: default_feed_source(),
      latency_ms: default_latency_ms(),
      live_updates: false,
    }
  }
}

impl FeedConfig {
  pub fn latency(&self) -> Duration {
    Duration::from_millis(self.latency_ms)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
  #[serde(default = "default_watch_interval_ms")]
  pub watch_interval_ms: u64,
}

fn default_watch_interval_ms() -> u64 {
  5000
}

impl Default for DisplayConfig {
  fn default() -> Self {
    Self {
      watch_interval_ms: default_watch_interval_ms(),
    }
  }
}

impl DisplayConfig {
  pub fn watch_interval(&self) -> Duration {
    Duration::from_millis(self.watch_interval_ms)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
  #[serde(default)]
  pub logging: Option<LoggingConfig>,

  #[serde(default)]
  pub feed: Option<FeedConfig>,

  #[serde(default)]
  pub display: Option<DisplayConfig>,
}

impl ConfigFile {
  fn normalize(self) -> Config {
    let mut cfg = Config::default();
    if let Some(l) = self.logging {
      cfg.logging = l;
    }
    if let Some(f) = self.feed {
      cfg.feed = f;
    }
    if let Some(d) = self.display {
      cfg.display = d;
    }

    if cfg.display.watch_interval_ms == 0 {
      tracing::warn!(
        default = default_watch_interval_ms(),
        "display.watch_interval_ms must be > 0; using default"
      );
      cfg.display.watch_interval_ms = default_watch_interval_ms();
    }

    cfg
  }

  fn needs_upgrade(&self) -> bool {
    self.logging.is_none() || self.feed.is_none() || self.display.is_none()
  }
}

fn to_config_file(cfg: &Config) -> ConfigFile {
  ConfigFile {
    logging: Some(cfg.logging.clone()),
    feed: Some(cfg.feed.clone()),
    display: Some(cfg.display.clone()),
  }
}

pub fn parse(raw: &str) -> anyhow::Result<Config> {
  let file: ConfigFile = toml::from_str(raw)?;
  Ok(file.normalize())
}

/// Loads the config, writing defaults for a missing file or missing sections.
/// An unparseable file is moved aside and replaced with defaults.
pub fn load_or_create_default(path: &Path) -> anyhow::Result<Config> {
  let parent = path
    .parent()
    .ok_or_else(|| anyhow::anyhow!("config path has no parent: {}", path.display()))?;
  fs::create_dir_all(parent)
    .with_context(|| format!("create config dir {}", parent.display()))?;

  if !path.exists() {
    let cfg = Config::default();
    write_atomic(path, &toml::to_string_pretty(&to_config_file(&cfg))?)?;
    return Ok(cfg);
  }

  let raw =
    fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
  let ts = crate::types::now_unix_ms() / 1000;
  match toml::from_str::<ConfigFile>(&raw) {
    Ok(file) => {
      let upgrade = file.needs_upgrade();
      let cfg = file.normalize();
      if upgrade {
        let backup = parent.join(format!("config.toml.bak-{ts}"));
        let _ = fs::copy(path, &backup);
        write_atomic(path, &toml::to_string_pretty(&to_config_file(&cfg))?)?;
        eprintln!(
          "threat-events: upgraded config defaults written to {} (backup: {})",
          path.display(),
          backup.display()
        );
      }
      Ok(cfg)
    }
    Err(e) => {
      let cfg = Config::default();
      let backup = parent.join(format!("config.toml.bad-{ts}"));
      let _ = fs::rename(path, &backup);
      write_atomic(path, &toml::to_string_pretty(&to_config_file(&cfg))?)?;
      eprintln!(
        "threat-events: invalid config at {} (backed up to {}): {e}",
        path.display(),
        backup.display()
      );
      Ok(cfg)
    }
  }
}

fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
  let parent = path
    .parent()
    .ok_or_else(|| anyhow::anyhow!("file path has no parent: {}", path.display()))?;
  let tmp = parent.join(format!(
    ".{}.tmp",
    path.file_name().unwrap_or_default().to_string_lossy()
  ));

  fs::write(&tmp, contents)?;
  fs::rename(&tmp, path)?;
  Ok(())
}
