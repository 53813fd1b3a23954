//! The `lexis learners` command.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Table};

use lexis_core::statistics::Dashboard;
use lexis_core::traits::ProgressStore;

use super::{clock, Workspace};

pub fn execute(config: Option<&Path>, now: Option<DateTime<Utc>>) -> Result<()> {
    let ws = Workspace::open(config)?;
    let names = ws.store.learners()?;
    if names.is_empty() {
        println!("No learners in {}.", ws.config.data_dir.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Learner", "Words", "Learn queue", "Due now", "Mastered"]);
    for name in names {
        let progress = match ws.store.load(&name) {
            Ok(progress) => progress,
            Err(e) => {
                tracing::warn!(learner = %name, "skipping unreadable document: {e:#}");
                continue;
            }
        };
        let dashboard = Dashboard::compute(&progress, clock(now));
        let marker = if ws.config.default_learner.as_deref() == Some(name.as_str()) {
            format!("{name} (default)")
        } else {
            name
        };
        table.add_row(vec![
            Cell::new(marker),
            Cell::new(dashboard.total_words),
            Cell::new(dashboard.pending),
            Cell::new(dashboard.due_now),
            Cell::new(dashboard.words_mastered),
        ]);
    }

    println!("{table}");
    Ok(())
}
