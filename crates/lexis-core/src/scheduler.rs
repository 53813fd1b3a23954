//! The review scheduler.
//!
//! A simplified SM-2 family update with a binary outcome: a remembered item
//! has its interval multiplied by its ease and its ease raised; a forgotten
//! item has its interval halved (down to a floor) and its ease lowered (down
//! to [`EASE_FLOOR`]). All intervals are fractional hours.
//!
//! Everything here is synchronous and computed from the snapshot the caller
//! hands in. Persisting the result is the caller's job.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::intake::IntakeMode;
use crate::model::{
    add_hours, scheduled_item, ItemId, ItemState, LearnerProgress, LearningItem, LexicalPayload,
    Recall, EASE_FLOOR,
};

/// Global scheduling constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Interval given to an item when it enters the active set.
    pub initial_interval_hours: f64,
    /// Ease given to an item when it enters the active set.
    pub initial_ease: f64,
    /// Ease added on every successful recall.
    pub ease_bonus: f64,
    /// Ease removed on every failed recall.
    pub ease_penalty: f64,
    /// Shortest interval a failed recall can produce.
    pub lapse_floor_hours: f64,
    /// Review count at which an item counts as mastered.
    pub mastery_threshold: u32,
    /// Optional ceiling on ease. Unbounded when `None`.
    pub max_ease: Option<f64>,
    /// Whether added items wait for a learning pass before being scheduled.
    pub intake_mode: IntakeMode,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_interval_hours: 4.0,
            initial_ease: 2.5,
            ease_bonus: 0.1,
            ease_penalty: 0.2,
            lapse_floor_hours: 2.0,
            mastery_threshold: 5,
            max_ease: None,
            intake_mode: IntakeMode::default(),
        }
    }
}

impl SchedulerConfig {
    /// Check that the constants can only ever produce valid item state.
    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        let non_negative = |v: f64| v.is_finite() && v >= 0.0;

        if !positive(self.initial_interval_hours) {
            return Err(invalid(format!(
                "initial_interval_hours must be positive, got {}",
                self.initial_interval_hours
            )));
        }
        if !positive(self.lapse_floor_hours) {
            return Err(invalid(format!(
                "lapse_floor_hours must be positive, got {}",
                self.lapse_floor_hours
            )));
        }
        if !(self.initial_ease.is_finite() && self.initial_ease >= EASE_FLOOR) {
            return Err(invalid(format!(
                "initial_ease must be at least {EASE_FLOOR}, got {}",
                self.initial_ease
            )));
        }
        if !non_negative(self.ease_bonus) || !non_negative(self.ease_penalty) {
            return Err(invalid(
                "ease_bonus and ease_penalty must be non-negative".to_string(),
            ));
        }
        if self.mastery_threshold == 0 {
            return Err(invalid("mastery_threshold must be at least 1".to_string()));
        }
        if let Some(max) = self.max_ease {
            if !(max.is_finite() && max >= self.initial_ease) {
                return Err(invalid(format!(
                    "max_ease must be at least initial_ease ({}), got {max}",
                    self.initial_ease
                )));
            }
        }
        Ok(())
    }
}

fn invalid(msg: String) -> SchedulerError {
    SchedulerError::InvalidConfig(msg)
}

/// What a single outcome application changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub id: ItemId,
    pub recall: Recall,
    pub interval_before: f64,
    pub interval_after: f64,
    pub ease_before: f64,
    pub ease_after: f64,
    pub due_at: DateTime<Utc>,
    pub review_count: u32,
    /// The item reached the mastery threshold with this outcome.
    pub became_mastered: bool,
}

/// Applies recall outcomes and initial schedules using a fixed configuration.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Build the initial schedule for an item entering the active set at `now`.
    pub fn activate(
        &self,
        id: &ItemId,
        payload: LexicalPayload,
        now: DateTime<Utc>,
    ) -> Result<LearningItem> {
        let interval = self.config.initial_interval_hours;
        let due_at =
            add_hours(now, interval).ok_or_else(|| SchedulerError::IntervalOverflow(id.clone()))?;
        Ok(scheduled_item(
            payload,
            interval,
            self.config.initial_ease,
            now,
            due_at,
            0,
        ))
    }

    /// Compute the state of `item` after one outcome at `now`.
    ///
    /// Pure: `item` is left untouched.
    pub fn next_state(
        &self,
        id: &ItemId,
        item: &LearningItem,
        recall: Recall,
        now: DateTime<Utc>,
    ) -> Result<LearningItem> {
        let (interval, ease) = match recall {
            Recall::Remembered => {
                let interval = item.interval_hours() * item.ease();
                let mut ease = item.ease() + self.config.ease_bonus;
                if let Some(max) = self.config.max_ease {
                    ease = ease.min(max);
                }
                (interval, ease)
            }
            Recall::Forgotten => (
                (item.interval_hours() / 2.0).max(self.config.lapse_floor_hours),
                (item.ease() - self.config.ease_penalty).max(EASE_FLOOR),
            ),
        };

        let due_at =
            add_hours(now, interval).ok_or_else(|| SchedulerError::IntervalOverflow(id.clone()))?;

        Ok(scheduled_item(
            item.payload().clone(),
            interval,
            ease,
            now,
            due_at,
            item.review_count() + 1,
        ))
    }

    /// Apply a recall outcome to the active item `id` of `progress`.
    ///
    /// Updates the item and the cached stats in place. Fails without touching
    /// `progress` if `id` is not active.
    pub fn apply_outcome(
        &self,
        progress: &mut LearnerProgress,
        id: &ItemId,
        recall: Recall,
        now: DateTime<Utc>,
    ) -> Result<OutcomeReport> {
        let Some(item) = progress.words.get(id) else {
            return Err(match progress.state_of(id) {
                ItemState::Unseen => SchedulerError::NotFound(id.clone()),
                actual => SchedulerError::PreconditionViolation {
                    id: id.clone(),
                    expected: ItemState::Active,
                    actual,
                },
            });
        };

        let updated = self.next_state(id, item, recall, now)?;
        let threshold = self.config.mastery_threshold;
        let became_mastered =
            item.review_count() < threshold && updated.review_count() >= threshold;

        let report = OutcomeReport {
            id: id.clone(),
            recall,
            interval_before: item.interval_hours(),
            interval_after: updated.interval_hours(),
            ease_before: item.ease(),
            ease_after: updated.ease(),
            due_at: updated.due_at(),
            review_count: updated.review_count(),
            became_mastered,
        };

        progress.stats.total_reviews += 1;
        if became_mastered {
            progress.stats.words_mastered += 1;
        }
        progress.words.insert(id.clone(), updated);

        tracing::debug!(
            learner = %progress.learner,
            item = %id,
            ?recall,
            interval = report.interval_after,
            ease = report.ease_after,
            due_at = %report.due_at,
            "outcome applied"
        );

        Ok(report)
    }
}

/// Identities of items due at `now`, earliest due first.
///
/// Ties on `due_at` are broken by identity order, so the result is a pure
/// function of `(items, now)`.
pub fn due_items(items: &BTreeMap<ItemId, LearningItem>, now: DateTime<Utc>) -> Vec<ItemId> {
    let mut due: Vec<(&ItemId, DateTime<Utc>)> = items
        .iter()
        .filter(|(_, item)| item.is_due(now))
        .map(|(id, item)| (id, item.due_at()))
        .collect();
    due.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    due.into_iter().map(|(id, _)| id.clone()).collect()
}

/// Number of items due at `now`.
pub fn due_count(items: &BTreeMap<ItemId, LearningItem>, now: DateTime<Utc>) -> usize {
    items.values().filter(|item| item.is_due(now)).count()
}

/// Earliest review instant strictly after `now`, if any item is still waiting.
pub fn next_due(items: &BTreeMap<ItemId, LearningItem>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    items
        .values()
        .map(LearningItem::due_at)
        .filter(|due_at| *due_at > now)
        .min()
}

/// All active items ordered by `due_at`, then identity.
pub fn upcoming(items: &BTreeMap<ItemId, LearningItem>) -> Vec<(&ItemId, &LearningItem)> {
    let mut all: Vec<(&ItemId, &LearningItem)> = items.iter().collect();
    all.sort_by(|a, b| a.1.due_at().cmp(&b.1.due_at()).then_with(|| a.0.cmp(b.0)));
    all
}
