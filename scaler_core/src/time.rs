//! Clock abstraction so cooldowns and quarantine timers are testable without sleeping.
//!
//! Mirrors the unified time-handling entry point of the teacher crate's
//! `TimeManager`, generalised into a trait so tests can advance a fake clock
//! instead of calling `Utc::now()` directly.

use chrono::{DateTime, FixedOffset, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// UTC+5:30 — the fixed timezone the original deployment logs in.
pub fn ist_offset() -> FixedOffset {
  FixedOffset::east_opt(5 * 3600 + 30 * 60).expect("IST offset is a valid fixed offset")
}

/// Clock abstraction consumed by every component that needs "now".
pub trait TimeSource: Send + Sync {
  fn now_utc(&self) -> DateTime<Utc>;

  fn now_local(&self) -> DateTime<FixedOffset> {
    self.now_utc().with_timezone(&ist_offset())
  }

  /// Seconds elapsed since `since`. Negative durations clamp to zero so a
  /// clock that is mocked backwards in a test never produces a negative
  /// cooldown remainder.
  fn elapsed_since(&self, since: DateTime<Utc>) -> i64 {
    (self.now_utc() - since).num_seconds().max(0)
  }
}

/// Production clock: reads the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
  fn now_utc(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Deterministic clock for tests: holds an explicit instant that only moves
/// when `advance`/`set` is called.
#[derive(Debug, Clone)]
pub struct MockTimeSource {
  millis: Arc<AtomicI64>,
}

impl MockTimeSource {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self {
      millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
    }
  }

  pub fn advance(&self, seconds: i64) {
    self.millis.fetch_add(seconds * 1000, Ordering::SeqCst);
  }

  pub fn set(&self, at: DateTime<Utc>) {
    self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
  }
}

impl TimeSource for MockTimeSource {
  fn now_utc(&self) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
      .expect("mock clock millis always in range")
  }
}
