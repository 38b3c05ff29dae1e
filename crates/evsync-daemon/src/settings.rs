//! Daemon configuration: an optional TOML file overlaid by `EVSYNC_*`
//! environment variables.

use std::{path::{Path, PathBuf}, time::Duration};

use anyhow::Context as _;
use config::{Config, Environment, File};
use evsync_client::{ApiConfig, Endpoints};
use evsync_sync::SyncOptions;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Upstream bearer token. Without it every cycle aborts.
  pub token:                Option<String>,
  pub api_base:             String,
  pub store_path:           PathBuf,
  pub interval_secs:        u64,
  pub request_timeout_secs: u64,
  pub cycle_deadline_secs:  u64,
  pub concurrency:          usize,
  pub host:                 String,
  pub port:                 u16,
  pub schedule_on_start:    bool,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      token:                None,
      api_base:             Endpoints::DEFAULT_BASE.to_owned(),
      store_path:           PathBuf::from("~/.local/share/evsync/events.db"),
      interval_secs:        3600,
      request_timeout_secs: 30,
      cycle_deadline_secs:  600,
      concurrency:          4,
      host:                 "127.0.0.1".to_owned(),
      port:                 8620,
      schedule_on_start:    true,
    }
  }
}

impl SyncConfig {
  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      token:   self.token.clone(),
      timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
    }
  }

  pub fn sync_options(&self) -> SyncOptions {
    SyncOptions {
      concurrency:    self.concurrency.max(1),
      cycle_deadline: Duration::from_secs(self.cycle_deadline_secs.max(1)),
    }
  }

  pub fn interval(&self) -> Duration { Duration::from_secs(self.interval_secs.max(1)) }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Read `path` (if it exists) and the environment.
pub fn load(path: &Path) -> anyhow::Result<SyncConfig> {
  let settings = Config::builder()
    .add_source(File::from(path).required(false))
    .add_source(Environment::with_prefix("EVSYNC").try_parsing(true))
    .build()
    .with_context(|| format!("failed to read config from {path:?}"))?;

  settings
    .try_deserialize()
    .context("failed to deserialise SyncConfig")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::FileFormat;

  use super::*;

  fn from_toml(toml: &str) -> SyncConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_gives_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.token, None);
    assert_eq!(cfg.api_base, "https://www.eventbriteapi.com/v3");
    assert_eq!(cfg.interval(), Duration::from_secs(3600));
    assert_eq!(cfg.sync_options().concurrency, 4);
    assert_eq!(cfg.sync_options().cycle_deadline, Duration::from_secs(600));
    assert_eq!(cfg.api_config().timeout, Duration::from_secs(30));
    assert!(cfg.schedule_on_start);
  }

  #[test]
  fn file_values_override_defaults() {
    let cfg = from_toml(
      r#"
        token = "secret"
        interval_secs = 900
        concurrency = 0
        host = "0.0.0.0"
        port = 9000
        schedule_on_start = false
      "#,
    );
    assert_eq!(cfg.api_config().token.as_deref(), Some("secret"));
    assert_eq!(cfg.interval(), Duration::from_secs(900));
    assert_eq!(cfg.sync_options().concurrency, 1);
    assert_eq!(cfg.address(), "0.0.0.0:9000");
    assert!(!cfg.schedule_on_start);
  }

  #[test]
  fn missing_file_is_not_an_error() {
    let cfg = load(Path::new("/nonexistent/evsync.toml")).unwrap();
    assert!(cfg.concurrency >= 1);
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }
}
