//! Text-to-speech via the Google Translate TTS endpoint.
//!
//! Text is stripped of URLs, split into chunks the endpoint accepts, and each
//! chunk is fetched as MP3. The chunks are concatenated into one stream.
//! Local playback is available with the `playback` feature.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::Client;
use tracing::debug;

const TTS_URL: &str = "https://translate.google.com/translate_tts";

/// Longest text the endpoint accepts per request.
pub const MAX_CHUNK_CHARS: usize = 100;

fn url_pattern() -> Option<&'static Regex> {
    static URL: OnceLock<Option<Regex>> = OnceLock::new();
    URL.get_or_init(|| Regex::new(r"https?://\S+|www\.\S+").ok())
        .as_ref()
}

/// Remove http(s) and `www.` links so they are not read aloud.
pub fn strip_urls(text: &str) -> String {
    match url_pattern() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}

/// Split `text` at whitespace into chunks of at most `max_chars` characters.
/// Words longer than `max_chars` are cut.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            chunks.push(word.into_iter().collect());
            word = rest;
        }

        let sep = usize::from(!current.is_empty());
        if current_len + sep + word.len() > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Synthesizes speech in a fixed language.
#[derive(Clone)]
pub struct SpeechClient {
    client: Client,
    language: String,
}

impl SpeechClient {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// MP3 audio for `text`, with URLs removed first.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, String> {
        let clean = strip_urls(text);
        let chunks = split_chunks(&clean, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err("nothing to speak after removing links".into());
        }

        let total = chunks.len().to_string();
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx.to_string();
            let textlen = chunk.chars().count().to_string();
            let res = self
                .client
                .get(TTS_URL)
                .query(&[
                    ("ie", "UTF-8"),
                    ("q", chunk.as_str()),
                    ("tl", self.language.as_str()),
                    ("client", "tw-ob"),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .send()
                .await
                .map_err(|e| format!("tts request failed: {}", e))?;

            if !res.status().is_success() {
                let status = res.status();
                return Err(format!("tts request failed: {}", status));
            }
            let bytes = res
                .bytes()
                .await
                .map_err(|e| format!("tts read failed: {}", e))?;
            audio.extend_from_slice(&bytes);
        }

        debug!(chunks = chunks.len(), bytes = audio.len(), lang = %self.language, "synthesized speech");
        Ok(audio)
    }
}

/// Play MP3 audio on the default output device. Returns once playback has
/// finished.
#[cfg(feature = "playback")]
pub fn play_blocking(mp3: Vec<u8>) -> Result<(), String> {
    use rodio::{Decoder, OutputStream, Sink};
    use std::io::Cursor;

    let (_stream, handle) =
        OutputStream::try_default().map_err(|e| format!("no audio output: {}", e))?;
    let sink = Sink::try_new(&handle).map_err(|e| format!("audio sink failed: {}", e))?;
    let source = Decoder::new(Cursor::new(mp3)).map_err(|e| format!("mp3 decode failed: {}", e))?;
    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}
