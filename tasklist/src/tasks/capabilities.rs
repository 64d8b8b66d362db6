//! Injectable sources of time and identity.
//!
//! The manager never calls the system clock or a random generator directly;
//! it asks a [`Clock`] and an [`IdGenerator`], so tests can pin both.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tasklist_proto::task::TaskId;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// The current time in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that returns a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Creates a clock frozen at `at`.
    #[must_use]
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(at),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Errors produced by an [`IdGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The generator has no more identifiers to hand out.
    #[error("identifier source exhausted")]
    Exhausted,
    /// The generator failed for another reason.
    #[error("identifier generation failed: {0}")]
    Failed(String),
}

/// Source of fresh task identifiers.
pub trait IdGenerator: Send + Sync {
    /// Returns an identifier not previously returned by this generator.
    ///
    /// # Errors
    ///
    /// Returns [`IdError`] if no identifier can be produced.
    fn next_id(&self) -> Result<TaskId, IdError>;
}

/// Generates UUID v7 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> Result<TaskId, IdError> {
        Ok(TaskId::new())
    }
}

/// Hands out a fixed list of identifiers, then fails with [`IdError::Exhausted`].
#[derive(Debug, Default)]
pub struct ScriptedIds {
    remaining: Mutex<VecDeque<TaskId>>,
}

impl ScriptedIds {
    /// Creates a generator that yields `ids` in order.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            remaining: Mutex::new(ids.into_iter().map(TaskId::from_string).collect()),
        }
    }

    /// Creates a generator yielding `"{prefix}-1"` through `"{prefix}-{count}"`.
    #[must_use]
    pub fn sequential(prefix: &str, count: usize) -> Self {
        Self::new((1..=count).map(|n| format!("{prefix}-{n}")))
    }
}

impl IdGenerator for ScriptedIds {
    fn next_id(&self) -> Result<TaskId, IdError> {
        self.remaining.lock().pop_front().ok_or(IdError::Exhausted)
    }
}
