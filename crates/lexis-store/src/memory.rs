//! In-memory progress store for tests and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use lexis_core::model::LearnerProgress;
use lexis_core::traits::ProgressStore;

use crate::error::StoreError;
use crate::file::{normalize, validate_learner};

/// A progress store that keeps documents in a map.
///
/// Follows the same revision rules as [`crate::FileStore`], so code written
/// against one behaves the same against the other.
pub struct MemoryStore {
    documents: Mutex<HashMap<String, LearnerProgress>>,
    mastery_threshold: u32,
    save_count: AtomicU32,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            mastery_threshold: lexis_core::SchedulerConfig::default().mastery_threshold,
            save_count: AtomicU32::new(0),
        }
    }

    /// Create a store pre-filled with `documents`, normalising each one as a load would.
    pub fn with_documents(documents: Vec<LearnerProgress>) -> Result<Self, StoreError> {
        let store = Self::new();
        {
            let mut map = store.documents.lock().unwrap_or_else(PoisonError::into_inner);
            for mut progress in documents {
                validate_learner(&progress.learner)?;
                normalize(&mut progress, store.mastery_threshold)?;
                map.insert(progress.learner.clone(), progress);
            }
        }
        Ok(store)
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> u32 {
        self.save_count.load(Ordering::Relaxed)
    }
}

impl ProgressStore for MemoryStore {
    fn load(&self, learner: &str) -> anyhow::Result<LearnerProgress> {
        validate_learner(learner)?;
        let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(documents
            .get(learner)
            .cloned()
            .unwrap_or_else(|| LearnerProgress::new(learner)))
    }

    fn save(&self, progress: &mut LearnerProgress) -> anyhow::Result<()> {
        validate_learner(&progress.learner)?;
        let mut documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        let found = documents
            .get(&progress.learner)
            .map_or(0, |stored| stored.revision);
        if found != progress.revision {
            return Err(StoreError::Conflict {
                learner: progress.learner.clone(),
                expected: progress.revision,
                found,
            }
            .into());
        }
        progress.revision += 1;
        documents.insert(progress.learner.clone(), progress.clone());
        self.save_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn learners(&self) -> anyhow::Result<Vec<String>> {
        let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = documents.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
