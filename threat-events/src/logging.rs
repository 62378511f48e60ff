use crate::config::LoggingConfig;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const LOG_FILE_NAME: &str = "threat-events.log";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
  FileOnly,
  FileAndStderr,
}

pub fn init(log_dir: &Path, cfg: &LoggingConfig, output: Output) -> anyhow::Result<()> {
  fs::create_dir_all(log_dir)?;
  let removed = cleanup_old_logs(log_dir, cfg.retention_days);

  let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
  let _ = FILE_GUARD.set(guard);

  let filter = tracing_subscriber::EnvFilter::try_new(&cfg.level)
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

  let file_layer = tracing_subscriber::fmt::layer()
    .with_ansi(false)
    .with_writer(file_writer)
    .with_target(true);

  let stderr_layer = (output == Output::FileAndStderr).then(|| {
    tracing_subscriber::fmt::layer()
      .with_ansi(false)
      .with_writer(std::io::stderr)
      .with_target(true)
  });

  tracing_subscriber::registry()
    .with(filter)
    .with(file_layer)
    .with(stderr_layer)
    .try_init()?;

  if removed > 0 {
    tracing::debug!(removed, "pruned old log files");
  }
  Ok(())
}

/// Deletes rolled log files older than `retention_days`; 0 keeps everything.
fn cleanup_old_logs(log_dir: &Path, retention_days: u64) -> usize {
  if retention_days == 0 {
    return 0;
  }

  let cutoff = SystemTime::now()
    .checked_sub(Duration::from_secs(retention_days.saturating_mul(24 * 60 * 60)))
    .unwrap_or(SystemTime::UNIX_EPOCH);

  let Ok(entries) = fs::read_dir(log_dir) else {
    return 0;
  };

  let mut removed = 0;
  for entry in entries.flatten() {
    let path = entry.path();
    if !is_log_file(&path) {
      continue;
    }

    let modified = match entry.metadata().and_then(|m| m.modified()) {
      Ok(t) => t,
      Err(_) => continue,
    };

    if modified < cutoff && fs::remove_file(&path).is_ok() {
      removed += 1;
    }
  }

  removed
}

fn is_log_file(path: &Path) -> bool {
  match path.file_name().and_then(|n| n.to_str()) {
    Some(name) => name == LOG_FILE_NAME || name.starts_with(&format!("{LOG_FILE_NAME}.")),
    None => false,
  }
}
