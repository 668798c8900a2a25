//! # Record Model
//!
//! A record is `{ts, data}`: the milliseconds-precision write timestamp and
//! the stored value. Timestamps come from [`MonotonicClock`], which never
//! moves backwards within one store even when the OS clock steps.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// One stored record: write timestamp plus value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Milliseconds since the Unix epoch at write time.
    pub ts: u64,
    /// The stored value.
    pub data: Value,
}

impl Record {
    pub fn new(ts: u64, data: Value) -> Self {
        Self { ts, data }
    }
}

/// Wall-clock milliseconds that only move forward.
///
/// Successive calls return strictly increasing values, so two writes to the
/// same URI in one store always order by `ts`.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicU64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time in milliseconds, at least one past the previous call.
    pub fn now_millis(&self) -> u64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = wall.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(observed) => prev = observed,
            }
        }
    }
}
