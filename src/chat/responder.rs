//! Answers a single user utterance from the knowledge base.

use tracing::{debug, info};

use super::error::{ChatError, ChatResult};
use super::matcher::Matcher;
use super::store::{KnowledgeBase, KnowledgeStore};

/// Returned when no stored question is close enough.
pub const FALLBACK_RESPONSE: &str = "I don't know this question yet. Can you teach me?";

#[derive(Clone, Copy, Debug, Default)]
pub struct ChatResponder {
    matcher: Matcher,
}

impl ChatResponder {
    pub fn new(matcher: Matcher) -> Self {
        Self { matcher }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Reply to `message` from an already loaded knowledge base.
    pub fn respond(&self, message: &str, kb: &KnowledgeBase) -> ChatResult<String> {
        validate(message)?;

        let Some(question) = self.matcher.best_match(message, kb.questions()) else {
            info!(input = message, "no stored question close enough");
            return Ok(FALLBACK_RESPONSE.to_string());
        };

        match kb.answer_for(question) {
            Some(answer) => {
                debug!(input = message, matched = question, "answered from knowledge base");
                Ok(answer.to_string())
            }
            None => Ok(FALLBACK_RESPONSE.to_string()),
        }
    }

    /// Load `store` and reply to `message`. Store errors are returned as is.
    pub fn answer(&self, message: &str, store: &KnowledgeStore) -> ChatResult<String> {
        validate(message)?;
        let kb = store.load()?;
        self.respond(message, &kb)
    }
}

fn validate(message: &str) -> ChatResult<()> {
    if message.is_empty() {
        return Err(ChatError::InvalidInput("message cannot be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_kb() -> KnowledgeBase {
        let mut kb = KnowledgeBase::new();
        kb.add("How are you?", "I'm fine, thanks!");
        kb
    }

    #[test]
    fn exact_question_returns_its_answer() {
        let mut kb = sample_kb();
        kb.add("What is your name?", "I am a bot.");
        let responder = ChatResponder::default();

        assert_eq!(
            responder.respond("What is your name?", &kb).unwrap(),
            "I am a bot."
        );
        assert_eq!(
            responder.respond("How are you?", &kb).unwrap(),
            "I'm fine, thanks!"
        );
    }

    #[test]
    fn close_question_returns_its_answer() {
        let responder = ChatResponder::default();
        assert_eq!(
            responder.respond("how are you", &sample_kb()).unwrap(),
            "I'm fine, thanks!"
        );
    }

    #[test]
    fn unrelated_question_gets_fallback() {
        let responder = ChatResponder::default();
        assert_eq!(
            responder
                .respond("What's the weather?", &sample_kb())
                .unwrap(),
            FALLBACK_RESPONSE
        );
    }

    #[test]
    fn empty_knowledge_base_always_falls_back() {
        let responder = ChatResponder::default();
        let kb = KnowledgeBase::new();
        for message in ["hello", "How are you?", "x"] {
            assert_eq!(responder.respond(message, &kb).unwrap(), FALLBACK_RESPONSE);
        }
    }

    #[test]
    fn duplicate_questions_answer_with_first() {
        let mut kb = sample_kb();
        kb.add("How are you?", "Never better.");
        let responder = ChatResponder::default();
        assert_eq!(
            responder.respond("How are you?", &kb).unwrap(),
            "I'm fine, thanks!"
        );
    }

    #[test]
    fn empty_message_is_rejected() {
        let responder = ChatResponder::default();
        assert!(matches!(
            responder.respond("", &sample_kb()),
            Err(ChatError::InvalidInput(_))
        ));
    }

    #[test]
    fn whitespace_message_is_matched() {
        let mut kb = KnowledgeBase::new();
        kb.add(" ", "space answer");
        let responder = ChatResponder::default();

        assert_eq!(responder.respond(" ", &kb).unwrap(), "space answer");
        assert_eq!(
            responder.respond("   ", &sample_kb()).unwrap(),
            FALLBACK_RESPONSE
        );
    }

    #[test]
    fn answer_loads_store_and_creates_it() {
        let tmp = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::new(tmp.path().join("kb.json"));
        let responder = ChatResponder::default();

        assert_eq!(responder.answer("hi", &store).unwrap(), FALLBACK_RESPONSE);
        assert!(store.path().exists());

        let mut kb = store.load().unwrap();
        kb.add("hi", "hello!");
        store.save(&kb).unwrap();
        assert_eq!(responder.answer("hi", &store).unwrap(), "hello!");
    }

    #[test]
    fn answer_propagates_malformed_store() {
        let tmp = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::new(tmp.path().join("kb.json"));
        std::fs::write(store.path(), "[]").unwrap();

        assert!(matches!(
            ChatResponder::default().answer("hi", &store),
            Err(ChatError::MalformedStore { .. })
        ));
    }

    #[test]
    fn answer_rejects_empty_message_without_touching_store() {
        let tmp = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::new(tmp.path().join("kb.json"));

        assert!(ChatResponder::default().answer("", &store).is_err());
        assert!(!store.path().exists());
    }
}
