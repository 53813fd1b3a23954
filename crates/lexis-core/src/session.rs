//! Review and learning sessions.
//!
//! A session is a cursor over a snapshot taken when it starts. The caller
//! owns it and passes it back in for every step, so the queue cannot shift
//! under the cursor when the learner's document changes mid-session.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::intake::Transition;
use crate::model::{ItemId, LearnerProgress, LexicalPayload, Recall};
use crate::prompt::{Answer, Prompt};
use crate::scheduler::{due_items, OutcomeReport, Scheduler};

/// Walks through the items that were due when the session started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSession {
    id: Uuid,
    queue: Vec<ItemId>,
    position: usize,
    revealed: bool,
    remembered: usize,
    forgotten: usize,
}

impl ReviewSession {
    pub fn start(progress: &LearnerProgress, now: DateTime<Utc>) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            queue: due_items(&progress.words, now),
            position: 0,
            revealed: false,
            remembered: 0,
            forgotten: 0,
        };
        tracing::info!(
            session = %session.id,
            learner = %progress.learner,
            due = session.queue.len(),
            "review session started"
        );
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The item under the cursor, `None` once the session is complete.
    pub fn current(&self) -> Option<&ItemId> {
        self.queue.get(self.position)
    }

    /// Show the answer side of the current item.
    pub fn reveal(&mut self) {
        if self.current().is_some() {
            self.revealed = true;
        }
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Apply `recall` to the current item and move on.
    ///
    /// Returns `Ok(None)` when the session is already complete. On error
    /// the cursor stays put; use [`ReviewSession::skip`] to move past it.
    pub fn answer(
        &mut self,
        scheduler: &Scheduler,
        progress: &mut LearnerProgress,
        recall: Recall,
        now: DateTime<Utc>,
    ) -> Result<Option<OutcomeReport>> {
        let Some(id) = self.current().cloned() else {
            return Ok(None);
        };
        let report = scheduler.apply_outcome(progress, &id, recall, now)?;
        if recall.is_success() {
            self.remembered += 1;
        } else {
            self.forgotten += 1;
        }
        self.advance();
        if self.is_complete() {
            tracing::info!(
                session = %self.id,
                remembered = self.remembered,
                forgotten = self.forgotten,
                "review session complete"
            );
        }
        Ok(Some(report))
    }

    /// Move past the current item without recording an outcome.
    pub fn skip(&mut self) {
        if let Some(id) = self.current() {
            tracing::debug!(session = %self.id, item = %id, "skipped");
            self.advance();
        }
    }

    /// Start over with a fresh due snapshot, keeping the session id.
    pub fn restart(&mut self, progress: &LearnerProgress, now: DateTime<Utc>) {
        self.queue = due_items(&progress.words, now);
        self.position = 0;
        self.revealed = false;
        self.remembered = 0;
        self.forgotten = 0;
        tracing::info!(session = %self.id, due = self.queue.len(), "review session restarted");
    }

    pub fn is_complete(&self) -> bool {
        self.position >= self.queue.len()
    }

    /// Zero-based index of the current item.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// `(remembered, forgotten)` so far.
    pub fn tally(&self) -> (usize, usize) {
        (self.remembered, self.forgotten)
    }

    fn advance(&mut self) {
        self.position += 1;
        self.revealed = false;
    }
}

/// Result of answering one learning prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct LearnOutcome {
    pub id: ItemId,
    pub correct: bool,
    pub prompt: Prompt,
    pub transition: Transition,
}

/// One learning pass over the items that were pending when it started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnSession {
    id: Uuid,
    queue: Vec<(ItemId, LexicalPayload)>,
    position: usize,
    prompt: Option<Prompt>,
    correct: usize,
}

impl LearnSession {
    pub fn start(progress: &LearnerProgress) -> Self {
        let queue: Vec<(ItemId, LexicalPayload)> = progress
            .pending_in_order()
            .into_iter()
            .filter_map(|id| {
                let payload = progress.pending_words.get(&id)?.payload.clone();
                Some((id, payload))
            })
            .collect();
        let session = Self {
            id: Uuid::new_v4(),
            queue,
            position: 0,
            prompt: None,
            correct: 0,
        };
        tracing::info!(
            session = %session.id,
            learner = %progress.learner,
            pending = session.queue.len(),
            "learn session started"
        );
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn current(&self) -> Option<&ItemId> {
        self.queue.get(self.position).map(|(id, _)| id)
    }

    /// The prompt for the current item, built on first call.
    ///
    /// Repeated calls return the same prompt until it is answered.
    pub fn prompt<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<&Prompt> {
        let (_, target) = self.queue.get(self.position)?;
        if self.prompt.is_none() {
            let pool: Vec<&LexicalPayload> = self.queue.iter().map(|(_, p)| p).collect();
            self.prompt = Some(Prompt::build(target, &pool, rng));
        }
        self.prompt.as_ref()
    }

    /// Judge `answer` and promote the current item, right or wrong.
    ///
    /// If no prompt was requested yet the answer is judged as fill-in.
    /// Returns `Ok(None)` when the session is already complete.
    pub fn answer(
        &mut self,
        scheduler: &Scheduler,
        progress: &mut LearnerProgress,
        answer: &Answer,
        now: DateTime<Utc>,
    ) -> Result<Option<LearnOutcome>> {
        let Some((id, payload)) = self.queue.get(self.position) else {
            return Ok(None);
        };
        let id = id.clone();
        let prompt = match self.prompt.take() {
            Some(prompt) => prompt,
            None => Prompt::fill_in(payload),
        };
        let correct = prompt.check(answer);

        let transition = match scheduler.promote(progress, &id, now) {
            Ok(transition) => transition,
            Err(e) => {
                self.prompt = Some(prompt);
                return Err(e);
            }
        };
        if correct {
            self.correct += 1;
        }
        self.position += 1;
        tracing::debug!(session = %self.id, item = %id, correct, "learning pass answered");
        if self.is_complete() {
            tracing::info!(
                session = %self.id,
                correct = self.correct,
                total = self.queue.len(),
                "learn session complete"
            );
        }

        Ok(Some(LearnOutcome {
            id,
            correct,
            prompt,
            transition,
        }))
    }

    /// Move past the current item without promoting it.
    pub fn skip(&mut self) {
        if self.position < self.queue.len() {
            self.position += 1;
            self.prompt = None;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.position >= self.queue.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of prompts answered correctly so far.
    pub fn correct(&self) -> usize {
        self.correct
    }
}
