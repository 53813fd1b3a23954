//! Seams between the scheduler and its collaborators.
//!
//! [`Catalog`] is implemented by the topic types in [`crate::catalog`];
//! [`ProgressStore`] by the file and in-memory stores of `lexis-store`.

use crate::model::{ItemId, LearnerProgress, LexicalPayload};

/// Read-only source of vocabulary entries.
pub trait Catalog {
    /// The entry with identity `id`, if the catalog has one.
    fn lookup(&self, id: &ItemId) -> Option<&LexicalPayload>;
}

/// Persistence for per-learner progress documents.
///
/// `save` must fail rather than overwrite when the stored document changed
/// since it was loaded (its `revision` moved on). On success it bumps
/// `progress.revision` to the value now on disk.
pub trait ProgressStore: Send + Sync {
    /// Load a learner's document, or an empty one if the learner is new.
    fn load(&self, learner: &str) -> anyhow::Result<LearnerProgress>;

    /// Persist a document loaded from this store.
    fn save(&self, progress: &mut LearnerProgress) -> anyhow::Result<()>;

    /// Names of all learners with a stored document, sorted.
    fn learners(&self) -> anyhow::Result<Vec<String>>;

    /// Load, apply `f`, and save. Nothing is written if `f` fails.
    fn update<T, F>(&self, learner: &str, f: F) -> anyhow::Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut LearnerProgress) -> anyhow::Result<T>,
    {
        let mut progress = self.load(learner)?;
        let out = f(&mut progress)?;
        self.save(&mut progress)?;
        Ok(out)
    }
}
