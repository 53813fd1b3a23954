//! The `lexis learn` command.

use std::io;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use lexis_core::prompt::{Answer, Prompt, PromptKind};
use lexis_core::session::LearnSession;
use lexis_core::traits::ProgressStore;

use super::{clock, read_line, Workspace};

pub fn execute(
    config: Option<&Path>,
    now: Option<DateTime<Utc>>,
    learner: Option<String>,
    seed: Option<u64>,
) -> Result<()> {
    let ws = Workspace::open(config)?;
    let learner = ws.learner(learner)?;
    let mut progress = ws.store.load(&learner)?;

    let mut session = LearnSession::start(&progress);
    if session.is_empty() {
        if progress.words.is_empty() {
            println!("Your learn queue is empty. Add words with `lexis add` first.");
        } else {
            println!("No new words waiting. Add more with `lexis add`.");
        }
        return Ok(());
    }
    println!("{} new word(s) to learn.", session.len());

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let stdin = io::stdin();
    let mut input = stdin.lock();

    while let Some(prompt) = session.prompt(&mut rng).cloned() {
        println!("\n[{}/{}]", session.position() + 1, session.len());
        show_prompt(&prompt);

        let Some(line) = read_line(&mut input)? else {
            println!("\nStopped. Answered words are saved.");
            return Ok(());
        };
        let answer = parse_answer(&prompt, &line);

        match session.answer(&ws.scheduler, &mut progress, &answer, clock(now)) {
            Ok(Some(outcome)) => {
                if outcome.correct {
                    println!("Correct!");
                } else {
                    println!("Not quite. The answer is: {}", outcome.prompt.solution());
                }
                show_example(&outcome.prompt);
                ws.store.save(&mut progress)?;
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("skipping word: {e}");
                session.skip();
            }
        }
    }

    println!(
        "\nDone: {}/{} correct. These words are now scheduled for review.",
        session.correct(),
        session.len()
    );
    Ok(())
}

fn show_prompt(prompt: &Prompt) {
    let payload = &prompt.payload;
    match &prompt.kind {
        PromptKind::MultipleChoice { choices } => {
            println!("\"{}\" {}", payload.word, payload.pos);
            println!("Pick the meaning:");
            for (i, choice) in choices.iter().enumerate() {
                println!("  {}. {}", i + 1, choice.text);
            }
        }
        PromptKind::FillIn { hint } => {
            println!("Meaning: {}", payload.meaning);
            if !payload.example.is_empty() {
                println!("Example: {}", payload.example);
            }
            println!("{hint}  ({} letters)", payload.word.chars().count());
            println!("Type the word:");
        }
    }
}

fn show_example(prompt: &Prompt) {
    let payload = &prompt.payload;
    if !payload.example.is_empty() {
        println!("  {}", payload.example);
    }
    if !payload.example_meaning.is_empty() {
        println!("  {}", payload.example_meaning);
    }
}

/// Choices are numbered from 1 on screen.
fn parse_answer(prompt: &Prompt, line: &str) -> Answer {
    match prompt.kind {
        PromptKind::MultipleChoice { .. } => match line.parse::<usize>() {
            Ok(n) if n >= 1 => Answer::Choice(n - 1),
            _ => Answer::Text(line.to_string()),
        },
        PromptKind::FillIn { .. } => Answer::Text(line.to_string()),
    }
}
