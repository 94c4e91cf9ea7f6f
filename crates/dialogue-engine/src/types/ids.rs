//! Identifier and timestamp newtypes shared across the entity types.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A monotonic logical clock, not wall-clock time.
///
/// Rule effects must be pure functions of `(config, state, input)`; reading
/// the wall clock inside an effect would break that purity and the
/// determinism property the engine is tested against. `Timestamp::next()`
/// draws from a process-wide counter instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

static CLOCK: AtomicU64 = AtomicU64::new(0);

impl Timestamp {
    /// The logical origin, used for deterministic test fixtures.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Draw the next tick from the process-wide counter.
    pub fn next() -> Self {
        Timestamp(CLOCK.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// Construct an explicit timestamp, for replay/testing fixtures.
    pub fn from_raw(value: u64) -> Self {
        Timestamp(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Identifies a [`Question`](crate::types::question::Question) instance
/// independent of its structural content, so `refines`/`depends` can refer
/// to a question even after it moves between `issues`, `qud`, and
/// `commitments`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuestionId(u64);

static QUESTION_IDS: AtomicU64 = AtomicU64::new(0);

impl QuestionId {
    pub fn fresh() -> Self {
        QuestionId(QUESTION_IDS.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(value: u64) -> Self {
        QuestionId(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Identifies an [`Action`](crate::types::action::Action) instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionId(u64);

static ACTION_IDS: AtomicU64 = AtomicU64::new(0);

impl ActionId {
    pub fn fresh() -> Self {
        ActionId(ACTION_IDS.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(value: u64) -> Self {
        ActionId(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_strictly_increasing() {
        let a = Timestamp::next();
        let b = Timestamp::next();
        assert!(b > a);
    }

    #[test]
    fn question_ids_are_unique() {
        let a = QuestionId::fresh();
        let b = QuestionId::fresh();
        assert_ne!(a, b);
    }
}
