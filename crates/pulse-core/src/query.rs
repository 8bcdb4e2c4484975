//! A framework-free cached query: stale-time caching, bounded retries and
//! interval polling around an async fetcher.
//!
//! Each query owns exactly one cache entry. Concurrent fetches are never
//! cancelled; whichever finishes last writes the entry.

use std::{
  fmt::Display,
  future::Future,
  sync::Arc,
  time::Duration,
};

use tokio::{
  sync::RwLock,
  task::JoinHandle,
  time::{Instant, MissedTickBehavior},
};
use tracing::{debug, warn};

/// Upper bound on the delay between retries.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

// ─── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
  /// How long a successful result is served without refetching.
  pub stale_time:       Duration,
  /// Period of the background refetch started by [`CachedQuery::spawn_polling`].
  pub refetch_interval: Duration,
  /// Retries after the first failed attempt.
  pub retry:            u32,
  /// Delay before the first retry; doubles on each further retry.
  pub retry_delay:      Duration,
}

impl QueryOptions {
  /// Approval and sentiment data: stale after 5 minutes, refetched every 10.
  pub const fn volatile() -> Self {
    Self {
      stale_time:       Duration::from_secs(5 * 60),
      refetch_interval: Duration::from_secs(10 * 60),
      retry:            2,
      retry_delay:      Duration::from_secs(1),
    }
  }

  /// Demographics and static assets: stale after 30 minutes, refetched hourly.
  pub const fn slow() -> Self {
    Self {
      stale_time:       Duration::from_secs(30 * 60),
      refetch_interval: Duration::from_secs(60 * 60),
      retry:            2,
      retry_delay:      Duration::from_secs(1),
    }
  }

  fn delay_for(&self, attempt: u32) -> Duration {
    self
      .retry_delay
      .saturating_mul(2u32.saturating_pow(attempt))
      .min(MAX_RETRY_DELAY)
  }
}

impl Default for QueryOptions {
  fn default() -> Self { Self::volatile() }
}

// ─── State ───────────────────────────────────────────────────────────────────

/// Snapshot of a query, as a section renders it.
#[derive(Debug)]
pub struct QueryState<T> {
  pub data:       Option<Arc<T>>,
  /// A fetch is in flight and there is nothing cached yet.
  pub is_loading: bool,
  /// The latest fetch failed after all retries and there is no earlier
  /// result to fall back on. Stale-but-valid data is never an error.
  pub is_error:   bool,
  /// Cause of the most recent failed fetch, if the latest fetch failed.
  pub last_error: Option<String>,
  pub updated_at: Option<Instant>,
}

impl<T> Clone for QueryState<T> {
  fn clone(&self) -> Self {
    Self {
      data:       self.data.clone(),
      is_loading: self.is_loading,
      is_error:   self.is_error,
      last_error: self.last_error.clone(),
      updated_at: self.updated_at,
    }
  }
}

struct Entry<T> {
  data:       Option<Arc<T>>,
  fetched_at: Option<Instant>,
  in_flight:  usize,
  last_error: Option<String>,
}

impl<T> Entry<T> {
  fn snapshot(&self) -> QueryState<T> {
    QueryState {
      data:       self.data.clone(),
      is_loading: self.data.is_none() && self.in_flight > 0,
      is_error:   self.data.is_none() && self.last_error.is_some(),
      last_error: self.last_error.clone(),
      updated_at: self.fetched_at,
    }
  }
}

// ─── CachedQuery ─────────────────────────────────────────────────────────────

/// One cached query, identified by `key` in logs.
pub struct CachedQuery<T> {
  key:     &'static str,
  options: QueryOptions,
  entry:   RwLock<Entry<T>>,
}

impl<T: Send + Sync + 'static> CachedQuery<T> {
  pub fn new(key: &'static str, options: QueryOptions) -> Self {
    Self {
      key,
      options,
      entry: RwLock::new(Entry {
        data:       None,
        fetched_at: None,
        in_flight:  0,
        last_error: None,
      }),
    }
  }

  pub fn key(&self) -> &'static str { self.key }

  pub fn options(&self) -> QueryOptions { self.options }

  /// Current snapshot without fetching.
  pub async fn state(&self) -> QueryState<T> { self.entry.read().await.snapshot() }

  /// Serve the cached result while it is fresh, otherwise fetch.
  pub async fn get<F, Fut, E>(&self, fetch: F) -> QueryState<T>
  where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
  {
    {
      let entry = self.entry.read().await;
      if let Some(at) = entry.fetched_at
        && entry.data.is_some()
        && at.elapsed() < self.options.stale_time
      {
        debug!(key = self.key, "query cache hit");
        return entry.snapshot();
      }
    }
    self.refetch(fetch).await
  }

  /// Fetch unconditionally (with retries) and store the outcome.
  pub async fn refetch<F, Fut, E>(&self, fetch: F) -> QueryState<T>
  where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
  {
    self.entry.write().await.in_flight += 1;
    let result = self.fetch_with_retry(&fetch).await;

    let mut entry = self.entry.write().await;
    entry.in_flight -= 1;
    match result {
      Ok(value) => {
        entry.data = Some(Arc::new(value));
        entry.fetched_at = Some(Instant::now());
        entry.last_error = None;
      }
      Err(e) => {
        warn!(
          key = self.key,
          error = %e,
          has_data = entry.data.is_some(),
          "query failed after retries"
        );
        entry.last_error = Some(e.to_string());
      }
    }
    entry.snapshot()
  }

  async fn fetch_with_retry<F, Fut, E>(&self, fetch: &F) -> Result<T, E>
  where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
  {
    let mut attempt = 0;
    loop {
      match fetch().await {
        Ok(value) => return Ok(value),
        Err(e) if attempt < self.options.retry => {
          let delay = self.options.delay_for(attempt);
          debug!(key = self.key, attempt, error = %e, ?delay, "query attempt failed, retrying");
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }

  /// Refetch every `refetch_interval` on a background task. The first poll
  /// fires one interval from now. Dropping the handle stops the timer.
  pub fn spawn_polling<F, Fut, E>(self: &Arc<Self>, fetch: F) -> PollHandle
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send,
    E: Display + Send,
  {
    let query = Arc::clone(self);
    let period = self.options.refetch_interval;
    let task: JoinHandle<()> = tokio::spawn(async move {
      let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      loop {
        ticker.tick().await;
        debug!(key = query.key, "polling refetch");
        query.refetch(&fetch).await;
      }
    });
    PollHandle { key: self.key, task }
  }
}

// ─── Polling handle ──────────────────────────────────────────────────────────

/// Owns a polling task; aborts it on drop.
pub struct PollHandle {
  key:  &'static str,
  task: JoinHandle<()>,
}

impl PollHandle {
  pub fn key(&self) -> &'static str { self.key }
}

impl Drop for PollHandle {
  fn drop(&mut self) { self.task.abort(); }
}
