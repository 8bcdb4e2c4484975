//! Runtime configuration, deserialised from `pulse.toml` and `PULSE__*`
//! environment variables (e.g. `PULSE__BACKEND__KIND=supabase`).

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use pulse_api::SnapstatsConfig;
use pulse_core::{hooks::HookOptions, query::QueryOptions};
use pulse_store_remote::{FirestoreConfig, SupabaseConfig};
use serde::Deserialize;

// ─── Server ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  /// Include panic detail in error responses.
  #[serde(default)]
  pub dev_mode:         bool,
  /// Theme preferences database, used when the backend is not SQLite.
  #[serde(default = "default_preferences_path")]
  pub preferences_path: PathBuf,
  #[serde(default)]
  pub backend:          BackendConfig,
  #[serde(default)]
  pub snapstats:        SnapstatsConfig,
  #[serde(default)]
  pub queries:          QueriesConfig,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_preferences_path() -> PathBuf { PathBuf::from("prefs.db") }

impl ServerConfig {
  /// Layer `path` (optional) under the `PULSE` environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("PULSE")
          .prefix_separator("__")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Backend ─────────────────────────────────────────────────────────────────

/// Which data source to read from, selected by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
  Sqlite {
    #[serde(default = "default_sqlite_path")]
    path: PathBuf,
  },
  Firestore(FirestoreConfig),
  Supabase(SupabaseConfig),
}

fn default_sqlite_path() -> PathBuf { PathBuf::from("pulse.db") }

impl Default for BackendConfig {
  fn default() -> Self { BackendConfig::Sqlite { path: default_sqlite_path() } }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Cache timings for the two classes of data.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct QueriesConfig {
  pub volatile_stale_secs:   u64,
  pub volatile_refetch_secs: u64,
  pub static_stale_secs:     u64,
  pub static_refetch_secs:   u64,
  pub retry:                 u32,
  pub retry_delay_ms:        u64,
}

impl Default for QueriesConfig {
  fn default() -> Self {
    Self {
      volatile_stale_secs:   300,
      volatile_refetch_secs: 600,
      static_stale_secs:     1800,
      static_refetch_secs:   3600,
      retry:                 2,
      retry_delay_ms:        1000,
    }
  }
}

impl QueriesConfig {
  fn options(&self, stale_secs: u64, refetch_secs: u64) -> QueryOptions {
    QueryOptions {
      stale_time:       Duration::from_secs(stale_secs),
      // A zero period would make `tokio::time::interval` panic.
      refetch_interval: Duration::from_secs(refetch_secs.max(1)),
      retry:            self.retry,
      retry_delay:      Duration::from_millis(self.retry_delay_ms),
    }
  }

  pub fn hook_options(&self) -> HookOptions {
    HookOptions {
      volatile: self.options(self.volatile_stale_secs, self.volatile_refetch_secs),
      slow:     self.static_options(),
    }
  }

  /// Demographics, GeoJSON and the Snapstats tables.
  pub fn static_options(&self) -> QueryOptions {
    self.options(self.static_stale_secs, self.static_refetch_secs)
  }
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
