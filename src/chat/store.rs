//! JSON file-backed knowledge base.
//!
//! The whole file is read on every [`KnowledgeStore::load`] and rewritten on
//! every [`KnowledgeStore::save`]. There is no locking; the last writer wins.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::error::{ChatError, ChatResult};

/// One known question and its answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KnowledgeEntry {
    pub question: String,
    pub answer: String,
}

/// Ordered question/answer pairs. Duplicate questions are allowed; lookups
/// return the first one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KnowledgeBase {
    pub questions: Vec<KnowledgeEntry>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Stored questions in sequence order.
    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.questions.iter().map(|e| e.question.as_str())
    }

    /// Answer of the first entry whose question equals `question` verbatim.
    pub fn answer_for(&self, question: &str) -> Option<&str> {
        self.questions
            .iter()
            .find(|e| e.question == question)
            .map(|e| e.answer.as_str())
    }

    /// Append an entry. Persist with [`KnowledgeStore::save`].
    pub fn add(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.questions.push(KnowledgeEntry {
            question: question.into(),
            answer: answer.into(),
        });
    }
}

/// Location of a persisted [`KnowledgeBase`].
#[derive(Clone, Debug)]
pub struct KnowledgeStore {
    path: PathBuf,
}

impl KnowledgeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the knowledge base, creating an empty one on disk first if the
    /// file does not exist yet.
    pub fn load(&self) -> ChatResult<KnowledgeBase> {
        if !self.path.exists() {
            let empty = KnowledgeBase::new();
            self.save(&empty)?;
            info!(path = %self.path.display(), "created empty knowledge base");
            return Ok(empty);
        }

        let raw = fs::read_to_string(&self.path).map_err(|e| ChatError::io(&self.path, e))?;
        let kb: KnowledgeBase =
            serde_json::from_str(&raw).map_err(|source| ChatError::MalformedStore {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), entries = kb.len(), "loaded knowledge base");
        Ok(kb)
    }

    /// Overwrite the file with `kb`. Each save writes its own temp file in
    /// the same directory and renames it into place, so readers never see a
    /// half-written file even when saves overlap.
    pub fn save(&self, kb: &KnowledgeBase) -> ChatResult<()> {
        let json = serde_json::to_string_pretty(kb).map_err(|source| ChatError::MalformedStore {
            path: self.path.clone(),
            source,
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| ChatError::io(dir, e))?;
        temp.write_all(json.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| ChatError::io(temp.path(), e))?;
        temp.persist(&self.path)
            .map_err(|e| ChatError::io(&self.path, e.error))?;

        debug!(path = %self.path.display(), entries = kb.len(), "saved knowledge base");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> KnowledgeStore {
        KnowledgeStore::new(dir.path().join("knowledge_base.json"))
    }

    #[test]
    fn load_creates_empty_store_on_first_use() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        assert!(!store.path().exists());

        let kb = store.load().unwrap();
        assert!(kb.is_empty());
        assert!(store.path().exists());

        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk, serde_json::json!({ "questions": [] }));
    }

    #[test]
    fn load_reads_existing_entries_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        fs::write(
            store.path(),
            r#"{"questions": [
                {"question": "What is your name?", "answer": "I am a bot."},
                {"question": "How are you?", "answer": "I'm fine, thanks!"}
            ]}"#,
        )
        .unwrap();

        let kb = store.load().unwrap();
        let questions: Vec<&str> = kb.questions().collect();
        assert_eq!(questions, vec!["What is your name?", "How are you?"]);
        assert_eq!(kb.answer_for("How are you?"), Some("I'm fine, thanks!"));
    }

    #[test]
    fn load_rejects_unparsable_content() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        fs::write(store.path(), "not json at all").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, ChatError::MalformedStore { .. }), "{err:?}");
    }

    #[test]
    fn load_rejects_missing_questions_field() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        fs::write(store.path(), r#"{"faq": []}"#).unwrap();

        assert!(matches!(
            store.load().unwrap_err(),
            ChatError::MalformedStore { .. }
        ));
    }

    #[test]
    fn load_rejects_unknown_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        let raw = r#"{"questions":[{"question":"hi","answer":"hello","tags":["greet"]}]}"#;
        fs::write(store.path(), raw).unwrap();

        assert!(matches!(
            store.load().unwrap_err(),
            ChatError::MalformedStore { .. }
        ));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), raw);

        fs::write(store.path(), r#"{"questions": [], "version": 2}"#).unwrap();
        assert!(matches!(
            store.load().unwrap_err(),
            ChatError::MalformedStore { .. }
        ));
    }

    #[test]
    fn load_from_directory_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::new(tmp.path());

        assert!(matches!(store.load().unwrap_err(), ChatError::Io { .. }));
    }

    #[test]
    fn load_rejects_entry_without_answer() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        fs::write(store.path(), r#"{"questions": [{"question": "hi"}]}"#).unwrap();

        assert!(matches!(
            store.load().unwrap_err(),
            ChatError::MalformedStore { .. }
        ));
    }

    #[test]
    fn save_after_load_is_byte_identical() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        let mut kb = KnowledgeBase::new();
        kb.add("What is your name?", "I am a bot.");
        kb.add("Olá?", "Olá! 🎵");
        store.save(&kb).unwrap();
        let before = fs::read(store.path()).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, kb);
        store.save(&loaded).unwrap();

        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        store.save(&KnowledgeBase::new()).unwrap();

        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("knowledge_base.json")]);
    }

    #[test]
    fn overlapping_saves_never_tear_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(&tmp);
        store.save(&KnowledgeBase::new()).unwrap();

        let writers: Vec<_> = (0..8)
            .map(|w| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for round in 0..25 {
                        let mut kb = KnowledgeBase::new();
                        for n in 0..=(w * 10 + round) {
                            kb.add(format!("writer {w} question {n}"), "answer");
                        }
                        store.save(&kb).unwrap();
                        store.load().unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        store.load().unwrap();
        let entries = fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn save_with_bare_file_name_uses_current_dir() {
        let store = KnowledgeStore::new("knowledge_base.test-bare-name.json");
        let mut kb = KnowledgeBase::new();
        kb.add("q", "a");

        store.save(&kb).unwrap();
        let loaded = store.load();
        let _ = fs::remove_file(store.path());
        assert_eq!(loaded.unwrap(), kb);
    }

    #[test]
    fn save_to_missing_directory_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::new(tmp.path().join("missing").join("kb.json"));

        assert!(matches!(
            store.save(&KnowledgeBase::new()).unwrap_err(),
            ChatError::Io { .. }
        ));
    }

    #[test]
    fn duplicate_questions_resolve_to_first() {
        let mut kb = KnowledgeBase::new();
        kb.add("hi", "first");
        kb.add("hi", "second");
        assert_eq!(kb.answer_for("hi"), Some("first"));
        assert_eq!(kb.answer_for("Hi"), None);
    }
}
