//! The `lexis add` command.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use lexis_core::intake::Transition;
use lexis_core::model::{ItemId, ItemState};
use lexis_core::traits::ProgressStore;

use super::{clock, Workspace};

pub fn execute(
    config: Option<&Path>,
    now: Option<DateTime<Utc>>,
    topic_name: &str,
    keys: Vec<String>,
    all: bool,
    learner: Option<String>,
) -> Result<()> {
    let ws = Workspace::open(config)?;
    let learner = ws.learner(learner)?;
    let topic = ws.topic(topic_name)?;
    let now = clock(now);

    let results = ws.store.update(&learner, |progress| {
        let ids: Vec<ItemId> = if all {
            topic.unseen_entries(progress).map(|(id, _)| id).collect()
        } else {
            keys.iter()
                .map(|key| ItemId::qualified(topic.name(), key))
                .collect()
        };

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let transition = ws
                .scheduler
                .add_to_learning(progress, &topic, &id, now)
                .with_context(|| format!("cannot add {id}"))?;
            results.push((id, transition));
        }
        Ok(results)
    })?;

    if results.is_empty() {
        println!("No new words to add from '{topic_name}'.");
        return Ok(());
    }
    for (id, transition) in &results {
        match transition {
            Transition::Moved {
                to: ItemState::Active,
                ..
            } => println!("Scheduled {id}"),
            Transition::Moved { .. } => println!("Added {id} to the learn queue"),
            Transition::Unchanged(state) => println!("{id} is already {state}"),
            Transition::PendingCleared => println!("{id} is already active"),
        }
    }
    Ok(())
}
