pub mod config;
pub mod console;
pub mod feed;
pub mod hook;
pub mod logging;
#[cfg(test)]
mod log_capture;
pub mod normalize;
pub mod paths;
pub mod render;
pub mod screen;
pub mod service;
pub mod types;

pub async fn run_console(args: &[String]) -> anyhow::Result<()> {
  let base = paths::base_dir()?;
  let cfg = config::load_or_create_default(&paths::config_path(&base))?;

  let output = if args.iter().any(|a| a == "--verbose" || a == "-v") {
    logging::Output::FileAndStderr
  } else {
    logging::Output::FileOnly
  };
  logging::init(&paths::logs_dir(&base), &cfg.logging, output)?;

  tracing::info!(
    version = env!("CARGO_PKG_VERSION"),
    base_dir = %base.display(),
    "starting threat events console"
  );
  console::run_console_command(&cfg, args).await
}
