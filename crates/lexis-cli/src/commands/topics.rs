//! The `lexis topics` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table};

use lexis_core::catalog::load_topic_directory;
use lexis_core::traits::ProgressStore;

use super::Workspace;

pub fn execute(config: Option<&Path>, learner: Option<String>) -> Result<()> {
    let ws = Workspace::open(config)?;
    let library = load_topic_directory(&ws.config.topics_dir)?;
    if library.is_empty() {
        println!("No topics in {}.", ws.config.topics_dir.display());
        return Ok(());
    }

    let progress = match learner.or_else(|| ws.config.default_learner.clone()) {
        Some(name) => Some(ws.store.load(&name)?),
        None => None,
    };

    let mut table = Table::new();
    let mut header = vec!["Topic", "Words"];
    if progress.is_some() {
        header.extend(["Unseen", "Pending"]);
    }
    table.set_header(header);

    for topic in library.topics() {
        let mut row = vec![Cell::new(topic.name()), Cell::new(topic.len())];
        if let Some(progress) = &progress {
            row.push(Cell::new(topic.unseen_entries(progress).count()));
            row.push(Cell::new(topic.pending_count(progress)));
        }
        table.add_row(row);
    }

    println!("{table}");
    Ok(())
}
