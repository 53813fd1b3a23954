//! lexis-store — persistence and configuration for lexis.
//!
//! Implements the `ProgressStore` trait from `lexis-core` with a JSON file
//! store and an in-memory store, and loads the `lexis.toml` configuration.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;

pub use config::{load_config_from, LexisConfig};
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
