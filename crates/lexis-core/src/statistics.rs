//! Aggregate learner statistics.
//!
//! [`Stats`] is a cached projection of a learner's collections. It is kept
//! up to date by the scheduler and intake operations and can always be
//! re-derived with [`Stats::recompute`]; the two must never disagree.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::LearnerProgress;
use crate::scheduler::due_count;

/// Cached aggregate counters stored alongside a learner's items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Number of active items.
    #[serde(default)]
    pub total_words: usize,
    /// Number of active items at or above the mastery threshold.
    #[serde(default)]
    pub words_mastered: usize,
    /// Lifetime count of applied outcomes.
    #[serde(default)]
    pub total_reviews: u64,
}

impl Stats {
    /// Derive the counters from the item collections.
    ///
    /// Active items are never removed and every outcome increments exactly one
    /// item's `review_count`, so the lifetime review count is their sum.
    pub fn recompute(progress: &LearnerProgress, mastery_threshold: u32) -> Stats {
        let mut stats = Stats {
            total_words: progress.words.len(),
            ..Stats::default()
        };
        for item in progress.words.values() {
            stats.total_reviews += u64::from(item.review_count());
            if item.review_count() >= mastery_threshold {
                stats.words_mastered += 1;
            }
        }
        stats
    }
}

/// Replace stale cached stats with the derived values.
///
/// Returns the previous (stale) value when a correction was made.
pub fn reconcile_stats(progress: &mut LearnerProgress, mastery_threshold: u32) -> Option<Stats> {
    let derived = Stats::recompute(progress, mastery_threshold);
    if derived == progress.stats {
        return None;
    }
    tracing::warn!(
        learner = %progress.learner,
        cached = ?progress.stats,
        derived = ?derived,
        "cached stats disagree with items, replacing"
    );
    Some(std::mem::replace(&mut progress.stats, derived))
}

/// Snapshot shown on the learner's dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub total_words: usize,
    pub pending: usize,
    pub set_aside: usize,
    pub due_now: usize,
    pub words_mastered: usize,
    pub total_reviews: u64,
    /// Number of active items per review count.
    pub review_distribution: BTreeMap<u32, usize>,
}

impl Dashboard {
    pub fn compute(progress: &LearnerProgress, now: DateTime<Utc>) -> Self {
        let mut review_distribution = BTreeMap::new();
        for item in progress.words.values() {
            *review_distribution.entry(item.review_count()).or_insert(0) += 1;
        }
        Self {
            total_words: progress.stats.total_words,
            pending: progress.pending_words.len(),
            set_aside: progress.known_words.len(),
            due_now: due_count(&progress.words, now),
            words_mastered: progress.stats.words_mastered,
            total_reviews: progress.stats.total_reviews,
            review_distribution,
        }
    }
}
