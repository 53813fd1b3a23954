//! Core data model types for lexis.
//!
//! A learner's progress is a single document holding three disjoint
//! collections (pending, active, set-aside) plus cached aggregate stats.
//! Records are validated when they are deserialized, so a loaded
//! [`LearningItem`] always satisfies the scheduling invariants.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::statistics::Stats;

/// Lowest ease factor an active item may carry.
pub const EASE_FLOOR: f64 = 1.3;

/// Allowed drift between a stored `next_review` and `scheduled_at + interval`.
const DUE_TOLERANCE_MS: i64 = 1_000;

/// Stable identity of a vocabulary item, shared with the catalog entry.
///
/// Catalog identities are qualified by topic (`"<topic>/<key>"`) so entry
/// keys from different topic files never collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the identity of entry `key` in topic `topic`.
    pub fn qualified(topic: &str, key: &str) -> Self {
        Self(format!("{topic}/{key}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The topic part of a qualified identity.
    pub fn topic(&self) -> Option<&str> {
        self.0.split_once('/').map(|(topic, _)| topic)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Immutable display content of a vocabulary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalPayload {
    /// The headword.
    pub word: String,
    /// Part of speech, e.g. "(n)".
    #[serde(default)]
    pub pos: String,
    /// Definition or translation of the headword.
    #[serde(default)]
    pub meaning: String,
    /// Example sentence using the headword.
    #[serde(default)]
    pub example: String,
    /// Translation of the example sentence.
    #[serde(default)]
    pub example_meaning: String,
}

impl LexicalPayload {
    pub fn new(word: impl Into<String>, meaning: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            pos: String::new(),
            meaning: meaning.into(),
            example: String::new(),
            example_meaning: String::new(),
        }
    }
}

/// Lifecycle state of an identity for one learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Catalog entry with no learner record.
    Unseen,
    /// Selected for learning, not yet schedulable.
    Pending,
    /// Participating in spaced-repetition scheduling.
    Active,
    /// Marked already-known; permanently excluded from scheduling.
    SetAside,
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemState::Unseen => write!(f, "unseen"),
            ItemState::Pending => write!(f, "pending"),
            ItemState::Active => write!(f, "active"),
            ItemState::SetAside => write!(f, "set-aside"),
        }
    }
}

/// Binary recall outcome of one review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recall {
    Remembered,
    Forgotten,
}

impl Recall {
    pub fn is_success(self) -> bool {
        matches!(self, Recall::Remembered)
    }
}

impl From<bool> for Recall {
    fn from(remembered: bool) -> Self {
        if remembered {
            Recall::Remembered
        } else {
            Recall::Forgotten
        }
    }
}

/// Convert a fractional hour count into a duration, or `None` if it does not fit.
pub fn hours_to_duration(hours: f64) -> Option<Duration> {
    let millis = hours * 3_600_000.0;
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis.round() as i64)
}

/// `at + hours`, or `None` when the result leaves the representable range.
pub fn add_hours(at: DateTime<Utc>, hours: f64) -> Option<DateTime<Utc>> {
    hours_to_duration(hours).and_then(|d| at.checked_add_signed(d))
}

/// A vocabulary item in the active set.
///
/// Fields are private: scheduling state is only produced by the scheduler or
/// by [`LearningItem::restore`], both of which enforce `interval > 0`,
/// `ease >= 1.3` and `due_at == scheduled_at + interval`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLearningItem")]
pub struct LearningItem {
    #[serde(flatten)]
    payload: LexicalPayload,
    #[serde(rename = "interval_hours")]
    interval: f64,
    #[serde(rename = "ease_factor")]
    ease: f64,
    #[serde(rename = "next_review")]
    due_at: DateTime<Utc>,
    scheduled_at: DateTime<Utc>,
    review_count: u32,
}

impl LearningItem {
    /// Rebuild an item from stored scheduling state, checking every invariant.
    pub fn restore(
        payload: LexicalPayload,
        interval: f64,
        ease: f64,
        scheduled_at: DateTime<Utc>,
        review_count: u32,
    ) -> Result<Self, String> {
        if !(interval.is_finite() && interval > 0.0) {
            return Err(format!("interval must be positive, got {interval}"));
        }
        if !(ease.is_finite() && ease >= EASE_FLOOR) {
            return Err(format!("ease must be at least {EASE_FLOOR}, got {ease}"));
        }
        let due_at = add_hours(scheduled_at, interval)
            .ok_or_else(|| format!("interval of {interval}h is out of range"))?;
        Ok(Self {
            payload,
            interval,
            ease,
            due_at,
            scheduled_at,
            review_count,
        })
    }

    pub fn payload(&self) -> &LexicalPayload {
        &self.payload
    }

    /// Hours until the next review, counted from `scheduled_at`.
    pub fn interval_hours(&self) -> f64 {
        self.interval
    }

    pub fn ease(&self) -> f64 {
        self.ease
    }

    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    /// Instant of the activation or outcome that produced the current schedule.
    pub fn scheduled_at(&self) -> DateTime<Utc> {
        self.scheduled_at
    }

    pub fn review_count(&self) -> u32 {
        self.review_count
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }
}

/// On-disk shape of a [`LearningItem`], validated into the real type.
#[derive(Debug, Deserialize)]
struct RawLearningItem {
    #[serde(flatten)]
    payload: LexicalPayload,
    interval_hours: f64,
    ease_factor: f64,
    #[serde(deserialize_with = "timestamp::deserialize")]
    next_review: DateTime<Utc>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    review_count: u32,
}

impl TryFrom<RawLearningItem> for LearningItem {
    type Error = String;

    fn try_from(raw: RawLearningItem) -> Result<Self, Self::Error> {
        let interval = hours_to_duration(raw.interval_hours)
            .ok_or_else(|| format!("interval of {}h is out of range", raw.interval_hours))?;
        // Older documents only carry `next_review`; the schedule origin is implied.
        let scheduled_at = match raw.scheduled_at {
            Some(at) => at,
            None => raw
                .next_review
                .checked_sub_signed(interval)
                .ok_or_else(|| "next_review is out of range".to_string())?,
        };
        let item = LearningItem::restore(
            raw.payload,
            raw.interval_hours,
            raw.ease_factor,
            scheduled_at,
            raw.review_count,
        )?;
        let drift = (item.due_at - raw.next_review).num_milliseconds().abs();
        if drift > DUE_TOLERANCE_MS {
            return Err(format!(
                "next_review {} disagrees with scheduled_at + interval ({})",
                raw.next_review, item.due_at
            ));
        }
        Ok(item)
    }
}

/// Crate-internal constructor used by the scheduler.
pub(crate) fn scheduled_item(
    payload: LexicalPayload,
    interval: f64,
    ease: f64,
    scheduled_at: DateTime<Utc>,
    due_at: DateTime<Utc>,
    review_count: u32,
) -> LearningItem {
    LearningItem {
        payload,
        interval,
        ease,
        due_at,
        scheduled_at,
        review_count,
    }
}

/// An item selected for learning but not yet scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingItem {
    #[serde(flatten)]
    pub payload: LexicalPayload,
    /// When the learner added the item; orders the learn queue.
    #[serde(default, deserialize_with = "timestamp::deserialize_or_default")]
    pub added_at: DateTime<Utc>,
}

/// An item the learner already knew, excluded from scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetAsideRecord {
    #[serde(flatten)]
    pub payload: LexicalPayload,
    #[serde(default, deserialize_with = "timestamp::deserialize_or_default")]
    pub set_aside_at: DateTime<Utc>,
}

/// Everything stored for one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerProgress {
    /// Learner name; also the document name in the file store.
    #[serde(alias = "username")]
    pub learner: String,
    /// Active items, keyed by identity.
    #[serde(default)]
    pub words: BTreeMap<ItemId, LearningItem>,
    /// Items added for learning but not yet through a learning pass.
    #[serde(default)]
    pub pending_words: BTreeMap<ItemId, PendingItem>,
    /// Items set aside as already known.
    #[serde(default, alias = "knew_words")]
    pub known_words: BTreeMap<ItemId, SetAsideRecord>,
    /// Cached aggregate projection of the collections above.
    #[serde(default)]
    pub stats: Stats,
    /// Incremented by the store on every successful save.
    #[serde(default)]
    pub revision: u64,
}

impl LearnerProgress {
    pub fn new(learner: impl Into<String>) -> Self {
        Self {
            learner: learner.into(),
            words: BTreeMap::new(),
            pending_words: BTreeMap::new(),
            known_words: BTreeMap::new(),
            stats: Stats::default(),
            revision: 0,
        }
    }

    /// Which of the disjoint collections `id` belongs to.
    ///
    /// Active wins over pending so that a duplicate pending entry left next to
    /// an active one is reported as active.
    pub fn state_of(&self, id: &ItemId) -> ItemState {
        if self.words.contains_key(id) {
            ItemState::Active
        } else if self.known_words.contains_key(id) {
            ItemState::SetAside
        } else if self.pending_words.contains_key(id) {
            ItemState::Pending
        } else {
            ItemState::Unseen
        }
    }

    /// Pending identities in the order they were added.
    pub fn pending_in_order(&self) -> Vec<ItemId> {
        let mut pending: Vec<(&ItemId, &PendingItem)> = self.pending_words.iter().collect();
        pending.sort_by(|a, b| a.1.added_at.cmp(&b.1.added_at).then_with(|| a.0.cmp(b.0)));
        pending.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Identities that sit in more than one collection.
    pub fn overlapping_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self
            .pending_words
            .keys()
            .chain(self.known_words.keys())
            .filter(|id| self.words.contains_key(*id))
            .cloned()
            .collect();
        ids.extend(
            self.pending_words
                .keys()
                .filter(|id| self.known_words.contains_key(*id))
                .cloned(),
        );
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Timestamp parsing that also accepts naive ISO-8601 values (read as UTC).
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub(super) fn parse(s: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp '{s}': {e}"))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn deserialize_opt<'de, D>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }

    pub(super) fn deserialize_or_default<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(deserialize_opt(deserializer)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn payload() -> LexicalPayload {
        LexicalPayload::new("hello", "xin chào")
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn qualified_ids_carry_topic() {
        let id = ItemId::qualified("animals", "word_1");
        assert_eq!(id.as_str(), "animals/word_1");
        assert_eq!(id.topic(), Some("animals"));
        assert_eq!(ItemId::new("bare").topic(), None);
    }

    #[test]
    fn restore_derives_due_at() {
        let item = LearningItem::restore(payload(), 4.0, 2.5, t0(), 0).unwrap();
        assert_eq!(item.due_at(), t0() + Duration::hours(4));
        assert!(!item.is_due(t0()));
        assert!(item.is_due(t0() + Duration::hours(4)));
    }

    #[test]
    fn restore_rejects_broken_invariants() {
        assert!(LearningItem::restore(payload(), 0.0, 2.5, t0(), 0).is_err());
        assert!(LearningItem::restore(payload(), -1.0, 2.5, t0(), 0).is_err());
        assert!(LearningItem::restore(payload(), f64::NAN, 2.5, t0(), 0).is_err());
        assert!(LearningItem::restore(payload(), 4.0, 1.29, t0(), 0).is_err());
        assert!(LearningItem::restore(payload(), 1e300, 2.5, t0(), 0).is_err());
    }

    #[test]
    fn legacy_item_without_scheduled_at() {
        let json = r#"{
            "word": "hello",
            "pos": "(n)",
            "meaning": "xin chào",
            "example": "Hello, how are you?",
            "example_meaning": "Xin chào, bạn khỏe không?",
            "interval_hours": 4,
            "ease_factor": 2.5,
            "next_review": "2025-03-01T13:00:00.123456",
            "review_count": 0
        }"#;
        let item: LearningItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.payload().pos, "(n)");
        assert_eq!(item.interval_hours(), 4.0);
        assert_eq!(item.scheduled_at() + Duration::hours(4), item.due_at());
    }

    #[test]
    fn invalid_item_fails_to_deserialize() {
        let json = r#"{
            "word": "hello",
            "interval_hours": 4,
            "ease_factor": 0.9,
            "next_review": "2025-03-01T13:00:00Z"
        }"#;
        let err = serde_json::from_str::<LearningItem>(json).unwrap_err();
        assert!(err.to_string().contains("ease"), "got: {err}");
    }

    #[test]
    fn mismatched_due_at_is_rejected() {
        let json = r#"{
            "word": "hello",
            "interval_hours": 4,
            "ease_factor": 2.5,
            "next_review": "2025-03-01T20:00:00Z",
            "scheduled_at": "2025-03-01T09:00:00Z"
        }"#;
        assert!(serde_json::from_str::<LearningItem>(json).is_err());
    }

    #[test]
    fn item_survives_document_roundtrip() {
        let mut progress = LearnerProgress::new("minh");
        progress.words.insert(
            ItemId::new("t/a"),
            LearningItem::restore(payload(), 10.0, 2.6, t0(), 1).unwrap(),
        );
        let json = serde_json::to_string(&progress).unwrap();
        let back: LearnerProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, progress);
    }

    #[test]
    fn state_of_reports_each_collection() {
        let mut progress = LearnerProgress::new("minh");
        let a = ItemId::new("t/a");
        let b = ItemId::new("t/b");
        let c = ItemId::new("t/c");
        progress.words.insert(
            a.clone(),
            LearningItem::restore(payload(), 4.0, 2.5, t0(), 0).unwrap(),
        );
        progress.pending_words.insert(
            b.clone(),
            PendingItem {
                payload: payload(),
                added_at: t0(),
            },
        );
        progress.known_words.insert(
            c.clone(),
            SetAsideRecord {
                payload: payload(),
                set_aside_at: t0(),
            },
        );
        assert_eq!(progress.state_of(&a), ItemState::Active);
        assert_eq!(progress.state_of(&b), ItemState::Pending);
        assert_eq!(progress.state_of(&c), ItemState::SetAside);
        assert_eq!(progress.state_of(&ItemId::new("t/d")), ItemState::Unseen);
        assert!(progress.overlapping_ids().is_empty());
    }

    #[test]
    fn legacy_document_field_names() {
        let json = r#"{
            "username": "minh",
            "words": {},
            "pending_words": {},
            "knew_words": { "t/x": { "word": "cat", "meaning": "con mèo" } },
            "stats": { "total_words": 0, "words_mastered": 0, "total_reviews": 0 }
        }"#;
        let progress: LearnerProgress = serde_json::from_str(json).unwrap();
        assert_eq!(progress.learner, "minh");
        assert_eq!(progress.known_words.len(), 1);
        assert_eq!(progress.revision, 0);
    }

    #[test]
    fn pending_order_follows_added_at() {
        let mut progress = LearnerProgress::new("minh");
        for (key, offset) in [("z", 0), ("a", 2), ("m", 1)] {
            progress.pending_words.insert(
                ItemId::new(key),
                PendingItem {
                    payload: payload(),
                    added_at: t0() + Duration::minutes(offset),
                },
            );
        }
        let order: Vec<String> = progress
            .pending_in_order()
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(order, ["z", "m", "a"]);
    }
}
