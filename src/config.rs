use std::env;
use std::path::PathBuf;

use crate::chat::DEFAULT_THRESHOLD;

/// Application configuration from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    /// JSON file holding the chat knowledge base.
    pub knowledge_base_path: PathBuf,
    /// Minimum similarity for a chat message to match a stored question.
    pub match_threshold: f64,
    /// Language code for synthesized speech.
    pub tts_language: String,
}

impl Config {
    /// Read the process environment, after loading `.env` if one exists.
    pub fn from_env() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = var("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8081);

        let spotify_client_id = var("SPOTIFY_CLIENT_ID")
            .or_else(|| var("CLIENT_ID"))
            .ok_or_else(|| anyhow::anyhow!("SPOTIFY_CLIENT_ID is required"))?;

        let spotify_client_secret = var("SPOTIFY_CLIENT_SECRET")
            .or_else(|| var("CLIENT_SECRET"))
            .ok_or_else(|| anyhow::anyhow!("SPOTIFY_CLIENT_SECRET is required"))?;

        let knowledge_base_path = var("KNOWLEDGE_BASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("knowledge_base.json"));

        let match_threshold = match var("CHAT_MATCH_THRESHOLD") {
            Some(raw) => {
                let t: f64 = raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("CHAT_MATCH_THRESHOLD must be a number, got {raw:?}"))?;
                if !(0.0..=1.0).contains(&t) {
                    anyhow::bail!("CHAT_MATCH_THRESHOLD must be within [0, 1], got {t}");
                }
                t
            }
            None => DEFAULT_THRESHOLD,
        };

        let tts_language = var("TTS_LANGUAGE").unwrap_or_else(|| "pt".into());

        Ok(Self {
            port,
            spotify_client_id,
            spotify_client_secret,
            knowledge_base_path,
            match_threshold,
            tts_language,
        })
    }
}
