//! Vocabulary catalog: topic files and their entries.
//!
//! A topic is a JSON object mapping entry keys to lexical payloads:
//!
//! ```json
//! { "word_1": { "word": "hello", "pos": "(n)", "meaning": "xin chào",
//!               "example": "Hello, how are you?",
//!               "example_meaning": "Xin chào, bạn khỏe không?" } }
//! ```
//!
//! The file stem is the topic name, and every entry's identity is
//! `"<topic>/<key>"`. Entry order in the file is kept for browsing.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

use crate::model::{ItemId, ItemState, LearnerProgress, LexicalPayload};
use crate::traits::Catalog;

/// One topic file.
#[derive(Debug, Clone, Default)]
pub struct Topic {
    name: String,
    entries: Vec<(String, LexicalPayload)>,
    index: HashMap<ItemId, usize>,
}

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Append an entry. The first entry wins if `key` repeats.
    pub fn push(&mut self, key: impl Into<String>, payload: LexicalPayload) {
        let key = key.into();
        let id = ItemId::qualified(&self.name, &key);
        self.index.entry(id).or_insert(self.entries.len());
        self.entries.push((key, payload));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in file order with their qualified identities.
    pub fn entries(&self) -> impl Iterator<Item = (ItemId, &LexicalPayload)> + '_ {
        self.entries
            .iter()
            .map(|(key, payload)| (ItemId::qualified(&self.name, key), payload))
    }

    /// Entries the learner has not added, set aside, or scheduled yet.
    pub fn unseen_entries<'a>(
        &'a self,
        progress: &'a LearnerProgress,
    ) -> impl Iterator<Item = (ItemId, &'a LexicalPayload)> + 'a {
        self.entries()
            .filter(move |(id, _)| progress.state_of(id) == ItemState::Unseen)
    }

    /// How many of this topic's entries are waiting in the learner's pending set.
    pub fn pending_count(&self, progress: &LearnerProgress) -> usize {
        self.entries()
            .filter(|(id, _)| progress.pending_words.contains_key(id))
            .count()
    }
}

impl Catalog for Topic {
    fn lookup(&self, id: &ItemId) -> Option<&LexicalPayload> {
        self.index.get(id).map(|&i| &self.entries[i].1)
    }
}

/// All topics of a topics directory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Library {
    topics: BTreeMap<String, Topic>,
}

impl Library {
    pub fn insert(&mut self, topic: Topic) {
        self.topics.insert(topic.name.clone(), topic);
    }

    pub fn topic(&self, name: &str) -> Option<&Topic> {
        self.topics.get(name)
    }

    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.topics.values()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

impl Catalog for Library {
    fn lookup(&self, id: &ItemId) -> Option<&LexicalPayload> {
        self.topics.get(id.topic()?)?.lookup(id)
    }
}

/// Topic body in file order; `serde_json::Map` would sort the keys.
struct OrderedEntries(Vec<(String, LexicalPayload)>);

impl<'de> Deserialize<'de> for OrderedEntries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = OrderedEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of entry keys to vocabulary entries")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, payload)) = map.next_entry::<String, LexicalPayload>()? {
                    entries.push((key, payload));
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Parse a single topic file; the topic is named after the file stem.
pub fn parse_topic(path: &Path) -> Result<Topic> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("topic file has no usable name: {}", path.display()))?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read topic file: {}", path.display()))?;

    parse_topic_str(&content, name)
        .with_context(|| format!("failed to parse topic: {}", path.display()))
}

/// Parse topic JSON (useful for testing).
pub fn parse_topic_str(content: &str, name: &str) -> Result<Topic> {
    anyhow::ensure!(!name.is_empty(), "topic name is empty");
    anyhow::ensure!(!name.contains('/'), "topic name may not contain '/': {name}");

    let OrderedEntries(entries) = serde_json::from_str(content)?;
    let mut topic = Topic::new(name);
    for (key, payload) in entries {
        topic.push(key, payload);
    }
    Ok(topic)
}

/// Topic names available in `dir`, sorted.
pub fn list_topics(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Load every `.json` topic in `dir`. Unparseable files are skipped with a warning.
pub fn load_topic_directory(dir: &Path) -> Result<Library> {
    let mut library = Library::default();
    for name in list_topics(dir)? {
        let path = dir.join(format!("{name}.json"));
        match parse_topic(&path) {
            Ok(topic) => library.insert(topic),
            Err(e) => {
                tracing::warn!("skipping {}: {:#}", path.display(), e);
            }
        }
    }
    Ok(library)
}

/// A warning from topic validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The entry key (if applicable).
    pub entry: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Check a topic for entries that would confuse a learner.
pub fn validate_topic(topic: &Topic) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let warn = |key: &str, message: String| ValidationWarning {
        entry: Some(key.to_string()),
        message,
    };

    if topic.is_empty() {
        warnings.push(ValidationWarning {
            entry: None,
            message: "topic has no entries".into(),
        });
    }

    let mut seen_keys = HashSet::new();
    let mut seen_words: HashMap<String, &str> = HashMap::new();
    for (key, payload) in &topic.entries {
        if !seen_keys.insert(key.as_str()) {
            warnings.push(warn(key, format!("duplicate entry key: {key}")));
        }
        if payload.word.trim().is_empty() {
            warnings.push(warn(key, "word is empty".into()));
            continue;
        }
        if payload.meaning.trim().is_empty() {
            warnings.push(warn(key, "meaning is empty".into()));
        }
        let folded = payload.word.trim().to_lowercase();
        if let Some(first) = seen_words.get(&folded) {
            warnings.push(warn(
                key,
                format!("word '{}' already appears as {first}", payload.word.trim()),
            ));
        } else {
            seen_words.insert(folded, key);
        }
    }

    warnings
}
