//! Scheduler error types.
//!
//! Every variant is a contract violation surfaced to the caller. The
//! scheduler never retries or masks one of these internally.

use thiserror::Error;

use crate::model::{ItemId, ItemState};

/// Errors that can occur when driving the scheduler or the intake lifecycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    /// The item exists for this learner but is in the wrong lifecycle state.
    #[error("item {id} is {actual}, expected {expected}")]
    PreconditionViolation {
        id: ItemId,
        expected: ItemState,
        actual: ItemState,
    },

    /// The identity is unknown to the collection that was consulted.
    #[error("item not found: {0}")]
    NotFound(ItemId),

    /// The next interval no longer fits in the representable time range.
    #[error("interval for item {0} overflowed the representable time range")]
    IntervalOverflow(ItemId),

    /// Scheduler configuration failed validation.
    #[error("invalid scheduler config: {0}")]
    InvalidConfig(String),
}

impl SchedulerError {
    /// Returns `true` if an outcome was applied to an item outside the active set.
    pub fn is_not_scheduled(&self) -> bool {
        matches!(
            self,
            SchedulerError::PreconditionViolation {
                expected: ItemState::Active,
                ..
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
