//! The `lexis review` command.

use std::io;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};

use lexis_core::model::Recall;
use lexis_core::session::ReviewSession;
use lexis_core::traits::ProgressStore;

use super::{clock, due, format_interval, read_line, Workspace};

pub fn execute(
    config: Option<&Path>,
    now: Option<DateTime<Utc>>,
    learner: Option<String>,
) -> Result<()> {
    let ws = Workspace::open(config)?;
    let learner = ws.learner(learner)?;
    let mut progress = ws.store.load(&learner)?;

    let mut session = ReviewSession::start(&progress, clock(now));
    if session.is_empty() {
        println!("Nothing to review right now.");
        due::print_schedule(&progress, clock(now));
        return Ok(());
    }
    println!("{} word(s) to review.", session.len());

    let stdin = io::stdin();
    let mut input = stdin.lock();

    while let Some(id) = session.current().cloned() {
        let Some(item) = progress.words.get(&id) else {
            session.skip();
            continue;
        };
        let payload = item.payload().clone();
        println!(
            "\n[{}/{}] {}  (reviewed {} time(s))",
            session.position() + 1,
            session.len(),
            payload.word,
            item.review_count()
        );
        println!("Press Enter to show the answer, q to stop.");
        match read_line(&mut input)?.as_deref() {
            None | Some("q") => return stopped(&session),
            Some(_) => {}
        }

        session.reveal();
        println!("Meaning: {} {}", payload.meaning, payload.pos);
        if !payload.example.is_empty() {
            println!("Example: {}", payload.example);
        }
        if !payload.example_meaning.is_empty() {
            println!("         {}", payload.example_meaning);
        }

        let recall = loop {
            println!("Did you remember it? [y/n]");
            match read_line(&mut input)?.as_deref() {
                None | Some("q") => return stopped(&session),
                Some("y" | "Y" | "yes") => break Recall::Remembered,
                Some("n" | "N" | "no") => break Recall::Forgotten,
                Some(_) => {}
            }
        };

        match session.answer(&ws.scheduler, &mut progress, recall, clock(now)) {
            Ok(Some(report)) => {
                ws.store.save(&mut progress)?;
                println!("Next review in {}.", format_interval(report.interval_after));
                if report.became_mastered {
                    println!("Mastered \"{}\"!", payload.word);
                }
            }
            Ok(None) => break,
            Err(e) if e.is_not_scheduled() => {
                tracing::debug!(item = %id, "no longer scheduled");
                session.skip();
            }
            Err(e) => {
                tracing::warn!(item = %id, "skipping word: {e}");
                session.skip();
            }
        }
    }

    let (remembered, forgotten) = session.tally();
    println!("\nSession complete: {remembered} remembered, {forgotten} to practise again.");
    Ok(())
}

fn stopped(session: &ReviewSession) -> Result<()> {
    let (remembered, forgotten) = session.tally();
    println!("\nStopped after {} word(s). Progress is saved.", remembered + forgotten);
    Ok(())
}
