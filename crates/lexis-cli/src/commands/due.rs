//! The `lexis due` command.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Table};

use lexis_core::model::LearnerProgress;
use lexis_core::scheduler::{due_items, next_due, upcoming};
use lexis_core::traits::ProgressStore;

use super::{clock, format_instant, format_interval, Workspace};

pub fn execute(
    config: Option<&Path>,
    now: Option<DateTime<Utc>>,
    learner: Option<String>,
) -> Result<()> {
    let ws = Workspace::open(config)?;
    let learner = ws.learner(learner)?;
    let progress = ws.store.load(&learner)?;
    let now = clock(now);

    let due = due_items(&progress.words, now);
    if due.is_empty() {
        println!("Nothing due.");
        print_schedule(&progress, now);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Word", "Meaning", "Reviews", "Interval", "Due since"]);
    for id in &due {
        let item = &progress.words[id];
        table.add_row(vec![
            Cell::new(&item.payload().word),
            Cell::new(&item.payload().meaning),
            Cell::new(item.review_count()),
            Cell::new(format_interval(item.interval_hours())),
            Cell::new(format_instant(item.due_at())),
        ]);
    }
    println!("{table}");
    println!("{} word(s) due.", due.len());
    Ok(())
}

/// The upcoming review schedule, shown when nothing is due.
pub fn print_schedule(progress: &LearnerProgress, now: DateTime<Utc>) {
    let Some(next) = next_due(&progress.words, now) else {
        println!("No words scheduled yet.");
        return;
    };
    let wait = (next - now).num_minutes() as f64 / 60.0;
    println!("Next review in {}.", format_interval(wait));

    let mut table = Table::new();
    table.set_header(vec!["Word", "Meaning", "Example", "Example meaning", "Next review"]);
    for (_, item) in upcoming(&progress.words) {
        let payload = item.payload();
        table.add_row(vec![
            Cell::new(&payload.word),
            Cell::new(&payload.meaning),
            Cell::new(&payload.example),
            Cell::new(&payload.example_meaning),
            Cell::new(format_instant(item.due_at())),
        ]);
    }
    println!("{table}");
}
