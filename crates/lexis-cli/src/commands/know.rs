//! The `lexis know` command.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use lexis_core::intake::Transition;
use lexis_core::model::ItemId;
use lexis_core::traits::ProgressStore;

use super::{clock, Workspace};

pub fn execute(
    config: Option<&Path>,
    now: Option<DateTime<Utc>>,
    topic_name: &str,
    keys: Vec<String>,
    learner: Option<String>,
) -> Result<()> {
    let ws = Workspace::open(config)?;
    let learner = ws.learner(learner)?;
    let topic = ws.topic(topic_name)?;
    let now = clock(now);

    let results = ws.store.update(&learner, |progress| {
        keys.iter()
            .map(|key| {
                let id = ItemId::qualified(topic.name(), key);
                let transition = ws
                    .scheduler
                    .set_aside(progress, &topic, &id, now)
                    .with_context(|| format!("cannot mark {id} as known"))?;
                Ok((id, transition))
            })
            .collect::<Result<Vec<_>>>()
    })?;

    for (id, transition) in &results {
        match transition {
            Transition::Unchanged(_) => println!("{id} was already marked as known"),
            _ => println!("Marked {id} as known"),
        }
    }
    Ok(())
}
