//! Subcommand implementations and the pieces they share.

pub mod add;
pub mod browse;
pub mod due;
pub mod init;
pub mod know;
pub mod learn;
pub mod learners;
pub mod review;
pub mod stats;
pub mod topics;
pub mod validate;

use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};

use lexis_core::catalog::{parse_topic, Topic};
use lexis_core::Scheduler;
use lexis_store::{load_config_from, FileStore, LexisConfig};

/// Everything a command needs: config, progress store, and scheduler.
pub struct Workspace {
    pub config: LexisConfig,
    pub store: FileStore,
    pub scheduler: Scheduler,
}

impl Workspace {
    pub fn open(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config_from(config_path)?;
        let scheduler = config.scheduler()?;
        let store = FileStore::new(&config.data_dir)
            .with_mastery_threshold(config.scheduler.mastery_threshold);
        tracing::debug!(
            data_dir = %config.data_dir.display(),
            topics_dir = %config.topics_dir.display(),
            "workspace opened"
        );
        Ok(Self {
            config,
            store,
            scheduler,
        })
    }

    /// Load one topic by name from the topics directory.
    pub fn topic(&self, name: &str) -> Result<Topic> {
        let path = self.config.topics_dir.join(format!("{name}.json"));
        if !path.is_file() {
            anyhow::bail!(
                "topic '{name}' not found in {}",
                self.config.topics_dir.display()
            );
        }
        parse_topic(&path)
    }

    pub fn learner(&self, explicit: Option<String>) -> Result<String> {
        self.config.learner(explicit)
    }
}

/// The instant commands act at.
pub fn clock(now: Option<DateTime<Utc>>) -> DateTime<Utc> {
    now.unwrap_or_else(Utc::now)
}

/// Read one line of input, trimmed. `None` at end of input.
pub fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Human-readable interval, in hours below two days and days above.
pub fn format_interval(hours: f64) -> String {
    if hours < 48.0 {
        format!("{hours:.1}h")
    } else {
        format!("{:.1}d", hours / 24.0)
    }
}

pub fn format_instant(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string()
}
