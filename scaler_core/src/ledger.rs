//! Process-local scale history (component "ScaleLedger" in §3).

use crate::time::TimeSource;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

const MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleDirection {
  Up,
  Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScaleHistoryEntry {
  pub timestamp: DateTime<Utc>,
  pub action: ScaleDirection,
  pub old_count: u32,
  pub new_count: u32,
  pub reason: String,
}

/// Tracks the last time a scale action of a given kind succeeded, gating
/// future actions by a cooldown. Shared shape used by the replica controller
/// (no history needed) and the node-pool scaler (bounded history of 50).
#[derive(Debug, Default)]
pub struct Cooldown {
  last_scale_time: Option<DateTime<Utc>>,
}

impl Cooldown {
  pub fn last_scale_time(&self) -> Option<DateTime<Utc>> {
    self.last_scale_time
  }

  /// `true` when a non-bypassing action is allowed right now.
  pub fn has_elapsed(&self, clock: &dyn TimeSource, cooldown_seconds: i64) -> bool {
    match self.last_scale_time {
      None => true,
      Some(last) => clock.elapsed_since(last) >= cooldown_seconds,
    }
  }

  pub fn remaining_seconds(&self, clock: &dyn TimeSource, cooldown_seconds: i64) -> i64 {
    match self.last_scale_time {
      None => 0,
      Some(last) => (cooldown_seconds - clock.elapsed_since(last)).max(0),
    }
  }

  pub fn record(&mut self, clock: &dyn TimeSource) {
    self.last_scale_time = Some(clock.now_utc());
  }
}

/// Bounded-history ledger for the node-pool scaler (last 50 actions).
#[derive(Debug, Default)]
pub struct NodePoolLedger {
  pub cooldown: Cooldown,
  history: VecDeque<ScaleHistoryEntry>,
}

impl NodePoolLedger {
  pub fn record(&mut self, clock: &dyn TimeSource, entry_without_timestamp: (ScaleDirection, u32, u32, String)) {
    let (action, old_count, new_count, reason) = entry_without_timestamp;
    self.cooldown.record(clock);
    if self.history.len() == MAX_HISTORY {
      self.history.pop_front();
    }
    self.history.push_back(ScaleHistoryEntry {
      timestamp: clock.now_utc(),
      action,
      old_count,
      new_count,
      reason,
    });
  }

  pub fn history(&self) -> impl Iterator<Item = &ScaleHistoryEntry> {
    self.history.iter()
  }

  pub fn len(&self) -> usize {
    self.history.len()
  }

  pub fn is_empty(&self) -> bool {
    self.history.is_empty()
  }
}
