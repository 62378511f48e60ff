use std::io;
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// In-memory log sink for asserting on emitted tracing events.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
  fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
      .with_ansi(false)
      .with_max_level(tracing::Level::TRACE)
      .with_writer(self.clone())
      .finish()
  }

  pub fn capture<R>(&self, f: impl FnOnce() -> R) -> R {
    tracing::subscriber::with_default(self.subscriber(), f)
  }

  /// Captures on the current thread until the guard is dropped.
  pub fn set_default(&self) -> DefaultGuard {
    tracing::subscriber::set_default(self.subscriber())
  }

  pub fn lines_at(&self, level: &str) -> Vec<String> {
    let buf = self.0.lock().unwrap();
    String::from_utf8_lossy(&buf)
      .lines()
      .filter(|l| l.split_whitespace().nth(1) == Some(level))
      .map(str::to_string)
      .collect()
  }
}

impl io::Write for CapturedLogs {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.0.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
  type Writer = CapturedLogs;

  fn make_writer(&'a self) -> Self::Writer {
    self.clone()
  }
}
