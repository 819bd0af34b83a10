//! Fuzzy question-matching chat responder.
//!
//! A flat JSON knowledge base of question/answer pairs is loaded per request,
//! the user's message is matched against the stored questions with a
//! Ratcliff/Obershelp similarity ratio, and the answer of the closest question
//! is returned. Anything below the threshold gets [`FALLBACK_RESPONSE`].

pub mod error;
pub mod matcher;
pub mod responder;
pub mod store;

pub use error::{ChatError, ChatResult};
pub use matcher::{ratio, Match, Matcher, DEFAULT_MAX_RESULTS, DEFAULT_THRESHOLD};
pub use responder::{ChatResponder, FALLBACK_RESPONSE};
pub use store::{KnowledgeBase, KnowledgeEntry, KnowledgeStore};
