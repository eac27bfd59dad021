//! Logging setup: a non-blocking log file plus optional stderr mirror.

use color_eyre::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::{data_dir, LogConfig};

/// Overrides the configured level when set
pub const LOG_ENV: &str = "REELCACHE_LOG";
pub const LOG_FILE: &str = "reelcache.log";

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the program, dropping it
/// flushes pending file writes.
pub fn init(config: &LogConfig, verbose: bool) -> Result<WorkerGuard> {
  let directory = log_directory(config)?;
  std::fs::create_dir_all(&directory)?;

  let appender = tracing_appender::rolling::never(&directory, LOG_FILE);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let file_layer = fmt::layer()
    .with_writer(writer)
    .with_ansi(false)
    .with_filter(build_filter(config)?);

  let stderr_layer = if verbose {
    Some(
      fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(build_filter(config)?),
    )
  } else {
    None
  };

  tracing_subscriber::registry()
    .with(file_layer)
    .with(stderr_layer)
    .try_init()?;

  Ok(guard)
}

fn log_directory(config: &LogConfig) -> Result<PathBuf> {
  match &config.directory {
    Some(directory) => Ok(directory.clone()),
    None => data_dir(),
  }
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
  if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
    return Ok(filter);
  }
  Ok(EnvFilter::try_new(&config.level)?)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_configured_directory_wins() {
    let config = LogConfig {
      directory: Some(PathBuf::from("/tmp/reelcache-logs")),
      ..LogConfig::default()
    };
    assert_eq!(
      log_directory(&config).unwrap(),
      PathBuf::from("/tmp/reelcache-logs")
    );
  }

  #[test]
  fn test_filter_directives() {
    let valid = LogConfig {
      level: "warn,reelcache=debug".to_string(),
      ..LogConfig::default()
    };
    assert!(build_filter(&valid).is_ok());

    let invalid = LogConfig {
      level: "reelcache=loud".to_string(),
      ..LogConfig::default()
    };
    if std::env::var_os(LOG_ENV).is_none() {
      assert!(build_filter(&invalid).is_err());
    }
  }
}
