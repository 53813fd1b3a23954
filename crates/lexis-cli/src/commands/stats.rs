//! The `lexis stats` command.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Table};

use lexis_core::statistics::Dashboard;
use lexis_core::traits::ProgressStore;

use super::{clock, Workspace};

pub fn execute(
    config: Option<&Path>,
    now: Option<DateTime<Utc>>,
    learner: Option<String>,
    json: bool,
) -> Result<()> {
    let ws = Workspace::open(config)?;
    let learner = ws.learner(learner)?;
    let progress = ws.store.load(&learner)?;
    let dashboard = Dashboard::compute(&progress, clock(now));

    if json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
        return Ok(());
    }

    println!("Learner: {learner}");
    let mut table = Table::new();
    table.set_header(vec!["Words", "Learn queue", "Known", "Due now", "Mastered", "Reviews"]);
    table.add_row(vec![
        Cell::new(dashboard.total_words),
        Cell::new(dashboard.pending),
        Cell::new(dashboard.set_aside),
        Cell::new(dashboard.due_now),
        Cell::new(dashboard.words_mastered),
        Cell::new(dashboard.total_reviews),
    ]);
    println!("{table}");

    if !dashboard.review_distribution.is_empty() {
        let mut dist = Table::new();
        dist.set_header(vec!["Times reviewed", "Words"]);
        for (count, words) in &dashboard.review_distribution {
            dist.add_row(vec![Cell::new(count), Cell::new(words)]);
        }
        println!("{dist}");
    }
    Ok(())
}
