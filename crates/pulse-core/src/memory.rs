//! [`MemorySource`]: an in-process [`DataSource`] for tests and local demos.

use std::sync::{
  RwLock,
  atomic::{AtomicBool, AtomicUsize, Ordering},
};

use crate::{
  Error, Result,
  model::{ApprovalRating, RawInput, SentimentBreakdown, StateDemographics},
  source::{ApprovalQuery, DataSource},
};

/// Rows held in memory, ordered on read like a real backend would order them.
///
/// Reads and writes can be made to fail to exercise error paths.
#[derive(Default)]
pub struct MemorySource {
  approval:     RwLock<Vec<ApprovalRating>>,
  sentiment:    RwLock<Vec<SentimentBreakdown>>,
  demographics: RwLock<Vec<StateDemographics>>,
  raw_inputs:   RwLock<Vec<RawInput>>,
  fail_reads:   AtomicBool,
  fail_writes:  AtomicBool,
  reads:        AtomicUsize,
}

fn read<T: Clone>(lock: &RwLock<Vec<T>>) -> Vec<T> {
  lock.read().unwrap_or_else(|e| e.into_inner()).clone()
}

fn push<T>(lock: &RwLock<Vec<T>>, value: T) {
  lock.write().unwrap_or_else(|e| e.into_inner()).push(value);
}

impl MemorySource {
  pub fn new() -> Self { Self::default() }

  pub fn with_approval(self, rows: Vec<ApprovalRating>) -> Self {
    *self.approval.write().unwrap_or_else(|e| e.into_inner()) = rows;
    self
  }

  pub fn with_sentiment(self, rows: Vec<SentimentBreakdown>) -> Self {
    *self.sentiment.write().unwrap_or_else(|e| e.into_inner()) = rows;
    self
  }

  pub fn with_demographics(self, rows: Vec<StateDemographics>) -> Self {
    *self.demographics.write().unwrap_or_else(|e| e.into_inner()) = rows;
    self
  }

  /// Make every read fail with [`Error::Unavailable`].
  pub fn set_fail_reads(&self, fail: bool) { self.fail_reads.store(fail, Ordering::SeqCst); }

  /// Make every write fail with [`Error::WriteRejected`], as a backend
  /// security rule would.
  pub fn set_fail_writes(&self, fail: bool) { self.fail_writes.store(fail, Ordering::SeqCst); }

  /// Number of read calls served or refused so far.
  pub fn reads(&self) -> usize { self.reads.load(Ordering::SeqCst) }

  pub fn raw_inputs(&self) -> Vec<RawInput> { read(&self.raw_inputs) }

  pub fn approval(&self) -> Vec<ApprovalRating> { read(&self.approval) }

  pub fn sentiment(&self) -> Vec<SentimentBreakdown> { read(&self.sentiment) }

  pub fn demographics(&self) -> Vec<StateDemographics> { read(&self.demographics) }

  fn check_read(&self) -> Result<()> {
    self.reads.fetch_add(1, Ordering::SeqCst);
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(Error::Unavailable("memory source reads disabled".into()));
    }
    Ok(())
  }

  fn check_write(&self) -> Result<()> {
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(Error::WriteRejected("memory source is read-only".into()));
    }
    Ok(())
  }
}

impl DataSource for MemorySource {
  type Error = Error;

  async fn approval_ratings(&self, query: ApprovalQuery) -> Result<Vec<ApprovalRating>> {
    self.check_read()?;
    let mut rows = read(&self.approval);
    if let Some(since) = query.since {
      rows.retain(|r| r.timestamp >= since);
    }
    rows.sort_by_key(|r| r.timestamp);
    Ok(rows)
  }

  async fn sentiment_breakdown(&self) -> Result<Vec<SentimentBreakdown>> {
    self.check_read()?;
    let mut rows = read(&self.sentiment);
    rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(rows)
  }

  async fn state_demographics(&self) -> Result<Vec<StateDemographics>> {
    self.check_read()?;
    let mut rows = read(&self.demographics);
    rows.sort_by(|a, b| b.registered_voters.cmp(&a.registered_voters));
    Ok(rows)
  }

  async fn insert_raw_input(&self, input: RawInput) -> Result<()> {
    self.check_write()?;
    push(&self.raw_inputs, input);
    Ok(())
  }

  async fn insert_approval_rating(&self, row: ApprovalRating) -> Result<()> {
    self.check_write()?;
    push(&self.approval, row);
    Ok(())
  }

  async fn insert_sentiment(&self, row: SentimentBreakdown) -> Result<()> {
    self.check_write()?;
    push(&self.sentiment, row);
    Ok(())
  }

  async fn upsert_demographics(&self, row: StateDemographics) -> Result<()> {
    self.check_write()?;
    let mut rows = self.demographics.write().unwrap_or_else(|e| e.into_inner());
    match rows.iter_mut().find(|r| r.state == row.state) {
      Some(existing) => *existing = row,
      None => rows.push(row),
    }
    Ok(())
  }
}
