//! JSON file store: one document per learner.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;

use lexis_core::model::LearnerProgress;
use lexis_core::statistics::reconcile_stats;
use lexis_core::traits::ProgressStore;

use crate::error::StoreError;

type Result<T> = std::result::Result<T, StoreError>;

const MAX_LEARNER_LEN: usize = 64;

/// Check that `learner` is safe to use as a file name.
pub fn validate_learner(learner: &str) -> Result<()> {
    let valid = !learner.is_empty()
        && learner.chars().count() <= MAX_LEARNER_LEN
        && !learner.starts_with('.')
        && learner
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidLearner(learner.to_string()))
    }
}

/// Bring a freshly parsed document back in line with the model invariants.
///
/// A pending entry shadowed by a set-aside record is dropped, since setting
/// aside cancels pending learning. An item both active and set aside has no
/// valid reading and is rejected. Stale cached stats are replaced.
pub(crate) fn normalize(progress: &mut LearnerProgress, mastery_threshold: u32) -> Result<()> {
    if let Some(id) = progress
        .known_words
        .keys()
        .find(|id| progress.words.contains_key(*id))
    {
        return Err(StoreError::Corrupt {
            learner: progress.learner.clone(),
            reason: format!("item {id} is both active and set aside"),
        });
    }

    let shadowed: Vec<_> = progress
        .pending_words
        .keys()
        .filter(|id| progress.known_words.contains_key(*id))
        .cloned()
        .collect();
    for id in shadowed {
        tracing::warn!(learner = %progress.learner, item = %id, "dropping pending entry of a set-aside item");
        progress.pending_words.remove(&id);
    }

    reconcile_stats(progress, mastery_threshold);
    Ok(())
}

/// Only the revision of a stored document, for conflict checks.
#[derive(Deserialize)]
struct StoredRevision {
    #[serde(default)]
    revision: u64,
}

/// Stores each learner's progress as `<dir>/<learner>.json`.
///
/// Writes go to a temporary file that is renamed over the document, so a
/// crash never leaves a half-written document behind. Read-modify-write
/// cycles for one learner are serialised within the process; a document
/// changed by another process is detected through its `revision`.
pub struct FileStore {
    dir: PathBuf,
    mastery_threshold: u32,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            mastery_threshold: lexis_core::SchedulerConfig::default().mastery_threshold,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Use `threshold` when re-deriving `words_mastered` on load.
    pub fn with_mastery_threshold(mut self, threshold: u32) -> Self {
        self.mastery_threshold = threshold;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of `learner`'s document.
    pub fn path_for(&self, learner: &str) -> Result<PathBuf> {
        validate_learner(learner)?;
        Ok(self.dir.join(format!("{learner}.json")))
    }

    /// Whether `learner` has a stored document.
    pub fn exists(&self, learner: &str) -> Result<bool> {
        Ok(self.path_for(learner)?.is_file())
    }

    fn lock_for(&self, learner: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(learner.to_string()).or_default().clone()
    }

    fn read(&self, learner: &str) -> Result<LearnerProgress> {
        let path = self.path_for(learner)?;
        if !path.exists() {
            tracing::debug!(learner, "no stored progress, starting fresh");
            return Ok(LearnerProgress::new(learner));
        }

        let content = fs::read_to_string(&path)?;
        let mut progress: LearnerProgress =
            serde_json::from_str(&content).map_err(|e| match e.classify() {
                serde_json::error::Category::Data => StoreError::Corrupt {
                    learner: learner.to_string(),
                    reason: e.to_string(),
                },
                _ => StoreError::Json(e),
            })?;
        if progress.learner != learner {
            return Err(StoreError::Corrupt {
                learner: learner.to_string(),
                reason: format!("document belongs to '{}'", progress.learner),
            });
        }
        normalize(&mut progress, self.mastery_threshold)?;
        Ok(progress)
    }

    fn stored_revision(path: &Path) -> Result<u64> {
        if !path.exists() {
            return Ok(0);
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str::<StoredRevision>(&content)?.revision)
    }

    /// Write `progress` if the stored revision still matches. Caller holds the learner lock.
    fn write(&self, _guard: &MutexGuard<'_, ()>, progress: &mut LearnerProgress) -> Result<()> {
        let path = self.path_for(&progress.learner)?;
        let found = Self::stored_revision(&path)?;
        if found != progress.revision {
            return Err(StoreError::Conflict {
                learner: progress.learner.clone(),
                expected: progress.revision,
                found,
            });
        }

        fs::create_dir_all(&self.dir)?;
        progress.revision += 1;
        let result = serde_json::to_string_pretty(progress)
            .map_err(StoreError::from)
            .and_then(|json| {
                let tmp_path = path.with_extension("json.tmp");
                let mut file = fs::File::create(&tmp_path)?;
                file.write_all(json.as_bytes())?;
                file.sync_all()?;
                fs::rename(&tmp_path, &path)?;
                Ok(())
            });
        if result.is_err() {
            progress.revision -= 1;
        }
        result?;

        tracing::debug!(learner = %progress.learner, revision = progress.revision, "progress saved");
        Ok(())
    }
}

impl ProgressStore for FileStore {
    fn load(&self, learner: &str) -> anyhow::Result<LearnerProgress> {
        let lock = self.lock_for(learner);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read(learner)?)
    }

    fn save(&self, progress: &mut LearnerProgress) -> anyhow::Result<()> {
        let lock = self.lock_for(&progress.learner);
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.write(&guard, progress)?)
    }

    fn learners(&self) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.dir.exists() {
            return Ok(names);
        }
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if validate_learner(stem).is_ok() {
                        names.push(stem.to_string());
                    }
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Holds the learner's lock from load to save.
    fn update<T, F>(&self, learner: &str, f: F) -> anyhow::Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut LearnerProgress) -> anyhow::Result<T>,
    {
        let lock = self.lock_for(learner);
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut progress = self.read(learner)?;
        let out = f(&mut progress)?;
        self.write(&guard, &mut progress)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lexis_core::catalog::Topic;
    use lexis_core::model::{ItemId, ItemState, LexicalPayload, Recall};
    use lexis_core::statistics::Stats;
    use lexis_core::Scheduler;

    fn topic() -> Topic {
        let mut topic = Topic::new("food");
        topic.push("rice", LexicalPayload::new("rice", "cơm"));
        topic.push("tea", LexicalPayload::new("tea", "trà"));
        topic
    }

    fn id(key: &str) -> ItemId {
        ItemId::qualified("food", key)
    }

    fn store_err(err: anyhow::Error) -> StoreError {
        err.downcast::<StoreError>().unwrap()
    }

    #[test]
    fn learner_names_are_checked() {
        for ok in ["minh", "an.nguyen", "user_2", "Đức"] {
            assert!(validate_learner(ok).is_ok(), "{ok}");
        }
        let long = "x".repeat(65);
        for bad in ["", "../etc", "a/b", ".hidden", "with space", long.as_str()] {
            assert!(validate_learner(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn missing_document_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let progress = store.load("minh").unwrap();
        assert_eq!(progress, LearnerProgress::new("minh"));
        assert!(!store.exists("minh").unwrap());
        assert!(store.learners().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_roundtrips_and_bumps_revision() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("users"));
        let scheduler = Scheduler::default();
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();

        let mut progress = store.load("minh").unwrap();
        scheduler
            .add_to_learning(&mut progress, &topic(), &id("rice"), now)
            .unwrap();
        scheduler.promote(&mut progress, &id("rice"), now).unwrap();
        scheduler
            .apply_outcome(&mut progress, &id("rice"), Recall::Remembered, now)
            .unwrap();
        store.save(&mut progress).unwrap();
        assert_eq!(progress.revision, 1);

        let loaded = store.load("minh").unwrap();
        assert_eq!(loaded, progress);
        assert_eq!(loaded.words[&id("rice")].interval_hours(), 10.0);
        assert_eq!(store.learners().unwrap(), ["minh"]);
        assert!(!dir.path().join("users/minh.json.tmp").exists());
    }

    #[test]
    fn stale_save_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();

        let mut first = store.load("minh").unwrap();
        let mut second = store.load("minh").unwrap();
        Scheduler::default()
            .set_aside(&mut first, &topic(), &id("tea"), now)
            .unwrap();
        store.save(&mut first).unwrap();

        let err = store_err(store.save(&mut second).unwrap_err());
        assert!(matches!(
            err,
            StoreError::Conflict {
                expected: 0,
                found: 1,
                ..
            }
        ));
        assert_eq!(second.revision, 0);
        assert_eq!(store.load("minh").unwrap().known_words.len(), 1);
    }

    #[test]
    fn update_writes_only_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let scheduler = Scheduler::default();
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();

        let state = store
            .update("minh", |p| {
                scheduler.add_to_learning(p, &topic(), &id("tea"), now)?;
                Ok(p.state_of(&id("tea")))
            })
            .unwrap();
        assert_eq!(state, ItemState::Pending);

        let result: anyhow::Result<()> = store.update("minh", |p| {
            scheduler.set_aside(p, &topic(), &id("tea"), now)?;
            anyhow::bail!("changed my mind")
        });
        assert!(result.is_err());
        let progress = store.load("minh").unwrap();
        assert_eq!(progress.state_of(&id("tea")), ItemState::Pending);
        assert_eq!(progress.revision, 1);
    }

    #[test]
    fn legacy_document_is_read_and_repaired() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("minh.json"),
            r#"{
                "username": "minh",
                "words": {
                    "word_1": {
                        "word": "hello", "pos": "(n)", "meaning": "xin chào",
                        "example": "", "example_meaning": "",
                        "interval_hours": 10.0, "ease_factor": 2.6,
                        "next_review": "2025-03-01T19:00:00.000001",
                        "review_count": 1
                    }
                },
                "pending_words": { "word_2": { "word": "cat", "meaning": "con mèo" } },
                "knew_words": { "word_2": { "word": "cat", "meaning": "con mèo" } },
                "stats": { "total_words": 3, "words_mastered": 0, "total_reviews": 0 }
            }"#,
        )
        .unwrap();

        let store = FileStore::new(dir.path());
        let progress = store.load("minh").unwrap();
        assert_eq!(progress.words.len(), 1);
        assert!(progress.pending_words.is_empty());
        assert_eq!(progress.known_words.len(), 1);
        assert_eq!(progress.stats, Stats::recompute(&progress, 5));
        assert_eq!(progress.stats.total_reviews, 1);
    }

    #[test]
    fn invariant_breaking_document_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("minh.json"),
            r#"{ "learner": "minh", "words": { "t/a": {
                "word": "a", "interval_hours": -4, "ease_factor": 2.5,
                "next_review": "2025-03-01T09:00:00Z" } } }"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("an.json"), "{ truncated").unwrap();
        std::fs::write(dir.path().join("bo.json"), r#"{ "learner": "minh" }"#).unwrap();

        let store = FileStore::new(dir.path());
        assert!(matches!(
            store_err(store.load("minh").unwrap_err()),
            StoreError::Corrupt { .. }
        ));
        assert!(matches!(
            store_err(store.load("an").unwrap_err()),
            StoreError::Json(_)
        ));
        assert!(matches!(
            store_err(store.load("bo").unwrap_err()),
            StoreError::Corrupt { .. }
        ));
    }

    #[test]
    fn active_and_set_aside_overlap_is_rejected() {
        let mut progress = LearnerProgress::new("minh");
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let scheduler = Scheduler::default();
        scheduler
            .add_to_learning(&mut progress, &topic(), &id("rice"), now)
            .unwrap();
        scheduler.promote(&mut progress, &id("rice"), now).unwrap();
        progress.known_words.insert(
            id("rice"),
            lexis_core::model::SetAsideRecord {
                payload: LexicalPayload::new("rice", "cơm"),
                set_aside_at: now,
            },
        );
        assert!(matches!(
            normalize(&mut progress, 5),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn invalid_learner_is_rejected_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(
            store_err(store.load("../escape").unwrap_err()),
            StoreError::InvalidLearner(_)
        ));
    }
}
