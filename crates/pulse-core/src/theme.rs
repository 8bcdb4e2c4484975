//! Theme context: the dark-mode flag, persisted through a swappable
//! [`PreferenceStore`].

use std::{
  collections::HashMap,
  convert::Infallible,
  future::Future,
  sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
  },
};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Preference key holding `"1"` (dark) or `"0"` (light).
pub const DARK_MODE_KEY: &str = "pulsetrack.dark";

// ─── Storage interface ───────────────────────────────────────────────────────

/// Key/value persistence for user preferences.
pub trait PreferenceStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn load<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  fn save<'a>(
    &'a self,
    key: &'a str,
    value: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Preferences kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
  values: Mutex<HashMap<String, String>>,
}

impl PreferenceStore for MemoryPreferences {
  type Error = Infallible;

  async fn load(&self, key: &str) -> Result<Option<String>, Infallible> {
    let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
    Ok(values.get(key).cloned())
  }

  async fn save(&self, key: &str, value: &str) -> Result<(), Infallible> {
    self
      .values
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .insert(key.to_owned(), value.to_owned());
    Ok(())
  }
}

// ─── Context ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
  pub dark_mode: bool,
}

/// Explicit theme state handed to whatever renders the dashboard.
pub struct ThemeContext<P> {
  store:     P,
  dark_mode: AtomicBool,
}

impl<P: PreferenceStore> ThemeContext<P> {
  /// Read the persisted flag. An unreadable store means light mode.
  pub async fn load(store: P) -> Self {
    let dark_mode = match store.load(DARK_MODE_KEY).await {
      Ok(value) => value.as_deref() == Some("1"),
      Err(e) => {
        warn!(error = %e, "could not read theme preference");
        false
      }
    };
    Self { store, dark_mode: AtomicBool::new(dark_mode) }
  }

  pub fn theme(&self) -> Theme { Theme { dark_mode: self.dark_mode.load(Ordering::SeqCst) } }

  pub async fn set_dark_mode(&self, dark_mode: bool) -> Theme {
    self.dark_mode.store(dark_mode, Ordering::SeqCst);
    self.persist(dark_mode).await;
    Theme { dark_mode }
  }

  pub async fn toggle(&self) -> Theme {
    let dark_mode = !self.dark_mode.fetch_xor(true, Ordering::SeqCst);
    self.persist(dark_mode).await;
    Theme { dark_mode }
  }

  /// A failed save keeps the in-memory value and is only logged.
  async fn persist(&self, dark_mode: bool) {
    let value = if dark_mode { "1" } else { "0" };
    if let Err(e) = self.store.save(DARK_MODE_KEY, value).await {
      warn!(error = %e, "could not save theme preference");
    }
  }
}
