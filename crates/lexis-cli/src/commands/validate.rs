//! The `lexis validate` command.

use std::path::{Path, PathBuf};

use anyhow::Result;

use lexis_core::catalog::{list_topics, parse_topic, validate_topic};

pub fn execute(config: Option<&Path>, topics: Option<PathBuf>) -> Result<()> {
    let path = match topics {
        Some(path) => path,
        None => lexis_store::load_config_from(config)?.topics_dir,
    };

    let files: Vec<PathBuf> = if path.is_dir() {
        list_topics(&path)?
            .into_iter()
            .map(|name| path.join(format!("{name}.json")))
            .collect()
    } else {
        vec![path]
    };

    let mut total_warnings = 0;
    for file in &files {
        let topic = parse_topic(file)?;
        println!("Topic: {} ({} words)", topic.name(), topic.len());

        let warnings = validate_topic(&topic);
        for w in &warnings {
            let prefix = w
                .entry
                .as_ref()
                .map(|key| format!("  [{key}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if files.is_empty() {
        println!("No topics found.");
    } else if total_warnings == 0 {
        println!("All topics valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
