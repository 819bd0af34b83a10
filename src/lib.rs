//! Spotify proxy and knowledge-base chat bot.
//!
//! The HTTP surface lives in [`handlers`]; the question matcher behind
//! `/api/chat` is in [`chat`].

pub mod chat;
pub mod config;
pub mod error;
pub mod handlers;
pub mod speech;
pub mod spotify;
