//! lexis CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "lexis", version, about = "Spaced-repetition vocabulary trainer")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Act as if the current time were this RFC 3339 instant
    #[arg(long, global = true, hide = true)]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and a sample topic
    Init,

    /// List the available topics
    Topics {
        /// Also count what this learner has not seen yet (defaults to default_learner)
        #[arg(long)]
        learner: Option<String>,
    },

    /// List the learners with stored progress
    Learners,

    /// Show the words of a topic the learner has not added yet
    Browse {
        /// Topic name (file stem in the topics directory)
        #[arg(long)]
        topic: String,

        #[arg(long)]
        learner: Option<String>,
    },

    /// Add words to the learn queue
    Add {
        #[arg(long)]
        topic: String,

        /// Entry keys to add
        #[arg(required_unless_present = "all")]
        keys: Vec<String>,

        /// Add every word of the topic not seen yet
        #[arg(long, conflicts_with = "keys")]
        all: bool,

        #[arg(long)]
        learner: Option<String>,
    },

    /// Mark words as already known so they are never scheduled
    Know {
        #[arg(long)]
        topic: String,

        /// Entry keys to set aside
        #[arg(required = true)]
        keys: Vec<String>,

        #[arg(long)]
        learner: Option<String>,
    },

    /// Work through the learn queue once
    Learn {
        #[arg(long)]
        learner: Option<String>,

        /// Seed for prompt selection
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Review the words that are due
    Review {
        #[arg(long)]
        learner: Option<String>,
    },

    /// List due words, or the upcoming schedule when nothing is due
    Due {
        #[arg(long)]
        learner: Option<String>,
    },

    /// Show learner statistics
    Stats {
        #[arg(long)]
        learner: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check topic files for problems
    Validate {
        /// Topic file or directory (defaults to the configured topics directory)
        #[arg(long)]
        topics: Option<PathBuf>,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lexis_core=warn,lexis_store=warn,lexis=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let now = cli.now;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Topics { learner } => commands::topics::execute(config, learner),
        Commands::Learners => commands::learners::execute(config, now),
        Commands::Browse { topic, learner } => {
            commands::browse::execute(config, &topic, learner)
        }
        Commands::Add {
            topic,
            keys,
            all,
            learner,
        } => commands::add::execute(config, now, &topic, keys, all, learner),
        Commands::Know {
            topic,
            keys,
            learner,
        } => commands::know::execute(config, now, &topic, keys, learner),
        Commands::Learn { learner, seed } => commands::learn::execute(config, now, learner, seed),
        Commands::Review { learner } => commands::review::execute(config, now, learner),
        Commands::Due { learner } => commands::due::execute(config, now, learner),
        Commands::Stats { learner, json } => commands::stats::execute(config, now, learner, json),
        Commands::Validate { topics } => commands::validate::execute(config, topics),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
