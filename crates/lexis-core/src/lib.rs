//! lexis-core — spaced-repetition scheduling for vocabulary learners.
//!
//! This crate holds the data model, the review scheduler, the intake
//! lifecycle that feeds it, and the catalog and session types the rest of
//! the lexis workspace builds on. Everything here is synchronous and free
//! of I/O except topic loading in [`catalog`].

pub mod catalog;
pub mod error;
pub mod intake;
pub mod model;
pub mod prompt;
pub mod scheduler;
pub mod session;
pub mod statistics;
pub mod traits;

pub use error::SchedulerError;
pub use model::{ItemId, ItemState, LearnerProgress, LearningItem, LexicalPayload, Recall};
pub use scheduler::{Scheduler, SchedulerConfig};
