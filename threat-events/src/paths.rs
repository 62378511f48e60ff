use std::path::{Path, PathBuf};

pub const HOME_ENV: &str = "THREAT_EVENTS_HOME";

pub fn base_dir() -> anyhow::Result<PathBuf> {
  if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
    return Ok(PathBuf::from(dir));
  }
  let home = std::env::var_os("HOME")
    .or_else(|| std::env::var_os("USERPROFILE"))
    .ok_or_else(|| anyhow::anyhow!("neither {HOME_ENV} nor HOME is set"))?;
  Ok(PathBuf::from(home).join(".threat-events"))
}

pub fn config_path(base: &Path) -> PathBuf {
  base.join("config.toml")
}

pub fn logs_dir(base: &Path) -> PathBuf {
  base.join("logs")
}
