//! Intake lifecycle: how a catalog entry becomes a scheduled item.
//!
//! ```text
//! Unseen ──add──▶ Pending ──promote──▶ Active
//!    │               │
//!    └────know───────┴──────▶ SetAside
//! ```
//!
//! With [`IntakeMode::Immediate`] the pending stage is skipped and `add`
//! goes straight to `Active`. No transition ever leaves `Active`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::model::{ItemId, ItemState, LearnerProgress, PendingItem, SetAsideRecord};
use crate::scheduler::Scheduler;
use crate::traits::Catalog;

/// When an added item starts being scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntakeMode {
    /// Added items wait in pending until one learning pass is completed.
    #[default]
    Deferred,
    /// Added items are scheduled at once.
    Immediate,
}

/// What an intake call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// The item moved from `from` to `to`.
    Moved { from: ItemState, to: ItemState },
    /// The item was already where the call would have put it.
    Unchanged(ItemState),
    /// A stale pending entry was dropped next to an existing active item.
    PendingCleared,
}

impl Transition {
    fn moved(from: ItemState, to: ItemState) -> Self {
        Transition::Moved { from, to }
    }
}

fn violation(id: &ItemId, expected: ItemState, actual: ItemState) -> SchedulerError {
    SchedulerError::PreconditionViolation {
        id: id.clone(),
        expected,
        actual,
    }
}

impl Scheduler {
    /// "Add to learning": copy the catalog payload into the learner's record.
    ///
    /// In deferred mode the item becomes pending; in immediate mode it is
    /// activated and counted right away. Adding a pending item again is a
    /// no-op; adding an active or set-aside item is a precondition violation.
    pub fn add_to_learning(
        &self,
        progress: &mut LearnerProgress,
        catalog: &dyn Catalog,
        id: &ItemId,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let state = progress.state_of(id);
        match (self.config().intake_mode, state) {
            (IntakeMode::Deferred, ItemState::Pending) => return Ok(Transition::Unchanged(state)),
            (_, ItemState::Unseen) | (IntakeMode::Immediate, ItemState::Pending) => {}
            (_, actual) => return Err(violation(id, ItemState::Unseen, actual)),
        }

        let payload = match catalog.lookup(id) {
            Some(payload) => payload.clone(),
            None if state == ItemState::Pending => progress.pending_words[id].payload.clone(),
            None => return Err(SchedulerError::NotFound(id.clone())),
        };

        let transition = match self.config().intake_mode {
            IntakeMode::Deferred => {
                progress.pending_words.insert(
                    id.clone(),
                    PendingItem {
                        payload,
                        added_at: now,
                    },
                );
                Transition::moved(ItemState::Unseen, ItemState::Pending)
            }
            IntakeMode::Immediate => {
                let item = self.activate(id, payload, now)?;
                progress.pending_words.remove(id);
                progress.words.insert(id.clone(), item);
                progress.stats.total_words += 1;
                Transition::moved(state, ItemState::Active)
            }
        };

        tracing::debug!(learner = %progress.learner, item = %id, ?transition, "added to learning");
        Ok(transition)
    }

    /// Promote a pending item after one learning pass, whatever the answer was.
    ///
    /// Initialises the schedule from the global defaults and counts the item
    /// in `total_words` exactly once. If the item is already active only the
    /// pending entry is dropped; its schedule and the stats are untouched.
    pub fn promote(
        &self,
        progress: &mut LearnerProgress,
        id: &ItemId,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let is_pending = progress.pending_words.contains_key(id);
        let is_active = progress.words.contains_key(id);

        let transition = match (is_pending, is_active) {
            (true, true) => {
                progress.pending_words.remove(id);
                Transition::PendingCleared
            }
            (false, true) => Transition::Unchanged(ItemState::Active),
            (true, false) => {
                let payload = progress.pending_words[id].payload.clone();
                let item = self.activate(id, payload, now)?;
                progress.pending_words.remove(id);
                progress.words.insert(id.clone(), item);
                progress.stats.total_words += 1;
                Transition::moved(ItemState::Pending, ItemState::Active)
            }
            (false, false) => {
                return Err(match progress.state_of(id) {
                    ItemState::Unseen => SchedulerError::NotFound(id.clone()),
                    actual => violation(id, ItemState::Pending, actual),
                });
            }
        };

        tracing::debug!(learner = %progress.learner, item = %id, ?transition, "promoted");
        Ok(transition)
    }

    /// "I already know this": set the item aside for good.
    ///
    /// Takes priority over pending learning: a pending entry is dropped
    /// without promotion or stats changes. Active items cannot be set aside.
    pub fn set_aside(
        &self,
        progress: &mut LearnerProgress,
        catalog: &dyn Catalog,
        id: &ItemId,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let state = progress.state_of(id);
        let payload = match state {
            ItemState::SetAside => return Ok(Transition::Unchanged(state)),
            ItemState::Active => return Err(violation(id, ItemState::Unseen, state)),
            ItemState::Pending => match catalog.lookup(id) {
                Some(payload) => payload.clone(),
                None => progress.pending_words[id].payload.clone(),
            },
            ItemState::Unseen => catalog
                .lookup(id)
                .cloned()
                .ok_or_else(|| SchedulerError::NotFound(id.clone()))?,
        };

        progress.pending_words.remove(id);
        progress.known_words.insert(
            id.clone(),
            SetAsideRecord {
                payload,
                set_aside_at: now,
            },
        );

        let transition = Transition::moved(state, ItemState::SetAside);
        tracing::debug!(learner = %progress.learner, item = %id, ?transition, "set aside");
        Ok(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Topic;
    use crate::model::{LexicalPayload, Recall};
    use crate::scheduler::SchedulerConfig;
    use crate::statistics::Stats;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn topic() -> Topic {
        let mut topic = Topic::new("animals");
        topic.push("cat", LexicalPayload::new("cat", "con mèo"));
        topic.push("dog", LexicalPayload::new("dog", "con chó"));
        topic.push("owl", LexicalPayload::new("owl", "con cú"));
        topic
    }

    fn id(key: &str) -> ItemId {
        ItemId::qualified("animals", key)
    }

    fn immediate() -> Scheduler {
        Scheduler::new(SchedulerConfig {
            intake_mode: IntakeMode::Immediate,
            ..SchedulerConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn add_makes_item_pending_without_stats() {
        let scheduler = Scheduler::default();
        let mut progress = LearnerProgress::new("minh");

        let t = scheduler
            .add_to_learning(&mut progress, &topic(), &id("cat"), t0())
            .unwrap();

        assert_eq!(t, Transition::moved(ItemState::Unseen, ItemState::Pending));
        assert_eq!(progress.state_of(&id("cat")), ItemState::Pending);
        assert_eq!(progress.pending_words[&id("cat")].payload.meaning, "con mèo");
        assert_eq!(progress.stats, Stats::default());
    }

    #[test]
    fn add_twice_is_a_noop() {
        let scheduler = Scheduler::default();
        let mut progress = LearnerProgress::new("minh");
        scheduler
            .add_to_learning(&mut progress, &topic(), &id("cat"), t0())
            .unwrap();
        let t = scheduler
            .add_to_learning(&mut progress, &topic(), &id("cat"), t0() + Duration::hours(1))
            .unwrap();
        assert_eq!(t, Transition::Unchanged(ItemState::Pending));
        assert_eq!(progress.pending_words[&id("cat")].added_at, t0());
    }

    #[test]
    fn add_unknown_catalog_item_fails() {
        let mut progress = LearnerProgress::new("minh");
        let err = Scheduler::default()
            .add_to_learning(&mut progress, &topic(), &id("yak"), t0())
            .unwrap_err();
        assert_eq!(err, SchedulerError::NotFound(id("yak")));
    }

    #[test]
    fn add_active_or_set_aside_item_fails() {
        let scheduler = Scheduler::default();
        let mut progress = LearnerProgress::new("minh");
        scheduler
            .add_to_learning(&mut progress, &topic(), &id("cat"), t0())
            .unwrap();
        scheduler.promote(&mut progress, &id("cat"), t0()).unwrap();
        scheduler
            .set_aside(&mut progress, &topic(), &id("dog"), t0())
            .unwrap();

        for key in ["cat", "dog"] {
            let err = scheduler
                .add_to_learning(&mut progress, &topic(), &id(key), t0())
                .unwrap_err();
            assert!(matches!(err, SchedulerError::PreconditionViolation { .. }));
        }
    }

    #[test]
    fn promote_initialises_schedule_and_counts_once() {
        let scheduler = Scheduler::default();
        let mut progress = LearnerProgress::new("minh");
        scheduler
            .add_to_learning(&mut progress, &topic(), &id("cat"), t0())
            .unwrap();

        let now = t0() + Duration::minutes(3);
        let t = scheduler.promote(&mut progress, &id("cat"), now).unwrap();

        assert_eq!(t, Transition::moved(ItemState::Pending, ItemState::Active));
        assert!(progress.pending_words.is_empty());
        let item = &progress.words[&id("cat")];
        assert_eq!(item.interval_hours(), 4.0);
        assert_eq!(item.ease(), 2.5);
        assert_eq!(item.review_count(), 0);
        assert_eq!(item.due_at(), now + Duration::hours(4));
        assert_eq!(progress.stats.total_words, 1);

        let again = scheduler.promote(&mut progress, &id("cat"), now).unwrap();
        assert_eq!(again, Transition::Unchanged(ItemState::Active));
        assert_eq!(progress.stats.total_words, 1);
    }

    #[test]
    fn promote_with_existing_active_only_clears_pending() {
        let scheduler = Scheduler::default();
        let mut progress = LearnerProgress::new("minh");
        scheduler
            .add_to_learning(&mut progress, &topic(), &id("cat"), t0())
            .unwrap();
        scheduler.promote(&mut progress, &id("cat"), t0()).unwrap();
        scheduler
            .apply_outcome(&mut progress, &id("cat"), Recall::Remembered, t0())
            .unwrap();

        // A duplicate pending entry, e.g. from a document written by two tabs.
        progress.pending_words.insert(
            id("cat"),
            PendingItem {
                payload: LexicalPayload::new("cat", "con mèo"),
                added_at: t0(),
            },
        );
        let before_item = progress.words[&id("cat")].clone();
        let before_stats = progress.stats;

        let t = scheduler
            .promote(&mut progress, &id("cat"), t0() + Duration::hours(9))
            .unwrap();

        assert_eq!(t, Transition::PendingCleared);
        assert!(!progress.pending_words.contains_key(&id("cat")));
        assert_eq!(progress.words[&id("cat")], before_item);
        assert_eq!(progress.stats, before_stats);
    }

    #[test]
    fn promote_rejects_unknown_and_set_aside() {
        let scheduler = Scheduler::default();
        let mut progress = LearnerProgress::new("minh");
        assert_eq!(
            scheduler.promote(&mut progress, &id("cat"), t0()).unwrap_err(),
            SchedulerError::NotFound(id("cat"))
        );

        scheduler
            .set_aside(&mut progress, &topic(), &id("cat"), t0())
            .unwrap();
        let err = scheduler.promote(&mut progress, &id("cat"), t0()).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::PreconditionViolation {
                id: id("cat"),
                expected: ItemState::Pending,
                actual: ItemState::SetAside,
            }
        );
    }

    #[test]
    fn set_aside_cancels_pending_learning() {
        let scheduler = Scheduler::default();
        let mut progress = LearnerProgress::new("minh");
        scheduler
            .add_to_learning(&mut progress, &topic(), &id("owl"), t0())
            .unwrap();

        let t = scheduler
            .set_aside(&mut progress, &topic(), &id("owl"), t0())
            .unwrap();

        assert_eq!(t, Transition::moved(ItemState::Pending, ItemState::SetAside));
        assert!(progress.pending_words.is_empty());
        assert!(progress.words.is_empty());
        assert_eq!(progress.known_words[&id("owl")].payload.word, "owl");
        assert_eq!(progress.stats, Stats::default());
        assert!(progress.overlapping_ids().is_empty());
    }

    #[test]
    fn set_aside_is_terminal_and_excludes_active() {
        let scheduler = Scheduler::default();
        let mut progress = LearnerProgress::new("minh");
        scheduler
            .set_aside(&mut progress, &topic(), &id("dog"), t0())
            .unwrap();
        assert_eq!(
            scheduler
                .set_aside(&mut progress, &topic(), &id("dog"), t0())
                .unwrap(),
            Transition::Unchanged(ItemState::SetAside)
        );

        scheduler
            .add_to_learning(&mut progress, &topic(), &id("cat"), t0())
            .unwrap();
        scheduler.promote(&mut progress, &id("cat"), t0()).unwrap();
        let err = scheduler
            .set_aside(&mut progress, &topic(), &id("cat"), t0())
            .unwrap_err();
        assert!(matches!(err, SchedulerError::PreconditionViolation { .. }));
        assert_eq!(progress.state_of(&id("cat")), ItemState::Active);
    }

    #[test]
    fn immediate_mode_skips_pending() {
        let scheduler = immediate();
        let mut progress = LearnerProgress::new("minh");

        let t = scheduler
            .add_to_learning(&mut progress, &topic(), &id("cat"), t0())
            .unwrap();

        assert_eq!(t, Transition::moved(ItemState::Unseen, ItemState::Active));
        assert!(progress.pending_words.is_empty());
        assert_eq!(progress.stats.total_words, 1);
        assert_eq!(progress.words[&id("cat")].due_at(), t0() + Duration::hours(4));
    }

    fn pending(word: &str, meaning: &str) -> PendingItem {
        PendingItem {
            payload: LexicalPayload::new(word, meaning),
            added_at: t0(),
        }
    }

    #[test]
    fn immediate_mode_activates_items_left_pending() {
        let scheduler = immediate();
        let mut progress = LearnerProgress::new("minh");
        // Queued while the learner was still on deferred intake.
        progress
            .pending_words
            .insert(id("dog"), pending("dog", "con chó"));

        let t = scheduler
            .add_to_learning(&mut progress, &topic(), &id("dog"), t0())
            .unwrap();

        assert_eq!(t, Transition::moved(ItemState::Pending, ItemState::Active));
        assert!(progress.pending_words.is_empty());
        assert_eq!(progress.state_of(&id("dog")), ItemState::Active);
        assert_eq!(progress.stats.total_words, 1);
        assert_eq!(progress.stats, Stats::recompute(&progress, 5));
    }

    #[test]
    fn immediate_mode_keeps_pending_payload_of_removed_entry() {
        let scheduler = immediate();
        let mut progress = LearnerProgress::new("minh");
        progress
            .pending_words
            .insert(id("yak"), pending("yak", "bò Tây Tạng"));

        scheduler
            .add_to_learning(&mut progress, &topic(), &id("yak"), t0())
            .unwrap();

        let item = &progress.words[&id("yak")];
        assert_eq!(item.payload().word, "yak");
        assert_eq!(item.payload().meaning, "bò Tây Tạng");
        assert_eq!(progress.stats.total_words, 1);
    }

    #[test]
    fn set_aside_keeps_pending_payload_of_removed_entry() {
        let scheduler = Scheduler::default();
        let mut progress = LearnerProgress::new("minh");
        progress
            .pending_words
            .insert(id("yak"), pending("yak", "bò Tây Tạng"));

        let t = scheduler
            .set_aside(&mut progress, &topic(), &id("yak"), t0())
            .unwrap();

        assert_eq!(t, Transition::moved(ItemState::Pending, ItemState::SetAside));
        assert!(progress.pending_words.is_empty());
        assert_eq!(progress.known_words[&id("yak")].payload.meaning, "bò Tây Tạng");
        assert_eq!(progress.stats, Stats::default());
    }

    #[test]
    fn modes_differ_in_total_words_mid_session() {
        let catalog = topic();
        let mut deferred = LearnerProgress::new("a");
        let mut eager = LearnerProgress::new("b");
        for key in ["cat", "dog"] {
            Scheduler::default()
                .add_to_learning(&mut deferred, &catalog, &id(key), t0())
                .unwrap();
            immediate()
                .add_to_learning(&mut eager, &catalog, &id(key), t0())
                .unwrap();
        }
        assert_eq!(deferred.stats.total_words, 0);
        assert_eq!(eager.stats.total_words, 2);
    }

    #[test]
    fn stats_match_recompute_through_lifecycle() {
        let scheduler = Scheduler::default();
        let catalog = topic();
        let mut progress = LearnerProgress::new("minh");
        for key in ["cat", "dog", "owl"] {
            scheduler
                .add_to_learning(&mut progress, &catalog, &id(key), t0())
                .unwrap();
        }
        scheduler
            .set_aside(&mut progress, &catalog, &id("owl"), t0())
            .unwrap();
        scheduler.promote(&mut progress, &id("cat"), t0()).unwrap();
        scheduler.promote(&mut progress, &id("dog"), t0()).unwrap();
        for _ in 0..5 {
            scheduler
                .apply_outcome(&mut progress, &id("cat"), Recall::Remembered, t0())
                .unwrap();
        }
        assert_eq!(progress.stats, Stats::recompute(&progress, 5));
        assert_eq!(progress.stats.words_mastered, 1);
        assert_eq!(progress.stats.total_words, 2);
        assert_eq!(progress.stats.total_reviews, 5);
    }
}
