//! The `lexis browse` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table};

use lexis_core::traits::ProgressStore;

use super::Workspace;

pub fn execute(config: Option<&Path>, topic_name: &str, learner: Option<String>) -> Result<()> {
    let ws = Workspace::open(config)?;
    let learner = ws.learner(learner)?;
    let topic = ws.topic(topic_name)?;
    let progress = ws.store.load(&learner)?;

    let mut table = Table::new();
    table.set_header(vec!["Key", "Word", "Type", "Meaning", "Example"]);
    let mut unseen = 0;
    for (id, payload) in topic.unseen_entries(&progress) {
        let key = id.as_str().split_once('/').map_or(id.as_str(), |(_, k)| k);
        table.add_row(vec![
            Cell::new(key),
            Cell::new(&payload.word),
            Cell::new(&payload.pos),
            Cell::new(&payload.meaning),
            Cell::new(&payload.example),
        ]);
        unseen += 1;
    }

    if unseen == 0 {
        println!("No new words in '{}'.", topic.name());
    } else {
        println!("{table}");
        println!("{unseen} new word(s) in '{}'.", topic.name());
    }

    let pending = topic.pending_count(&progress);
    if pending > 0 {
        println!("{pending} word(s) from this topic are waiting in the learn queue.");
    }
    Ok(())
}
