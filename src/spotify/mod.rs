//! Spotify Web API client.
//!
//! Uses Client Credentials flow for server-to-server authentication. Playback
//! needs a user token, which callers pass through untouched.

use std::sync::Arc;

use base64::Engine;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Genre seeded when a mood is not in the table.
pub const DEFAULT_GENRE: &str = "pop";

/// Spotify API client with token caching.
#[derive(Clone)]
pub struct SpotifyClient {
    client: Client,
    client_id: String,
    client_secret: String,
    token: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: std::time::Instant,
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client: Client::new(),
            client_id,
            client_secret,
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Ensures we have a valid access token, refreshing if needed.
    async fn ensure_token(&self) -> Result<String, String> {
        {
            let guard = self.token.read().await;
            if let Some(ref t) = *guard {
                if t.expires_at > std::time::Instant::now() {
                    return Ok(t.access_token.clone());
                }
            }
        }

        let token = self.fetch_token().await?;
        {
            let mut guard = self.token.write().await;
            *guard = Some(token.clone());
        }
        Ok(token.access_token)
    }

    async fn fetch_token(&self) -> Result<CachedToken, String> {
        let params = [("grant_type", "client_credentials")];
        let auth = base64::engine::general_purpose::STANDARD.encode(
            format!("{}:{}", self.client_id, self.client_secret).as_bytes(),
        );

        let res = self
            .client
            .post(TOKEN_URL)
            .header("Authorization", format!("Basic {}", auth))
            .form(&params)
            .send()
            .await
            .map_err(|e| format!("token request failed: {}", e))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "spotify token request rejected");
            return Err(format!("token request failed: {} - {}", status, body));
        }

        let body: TokenResponse = res
            .json()
            .await
            .map_err(|e| format!("token parse failed: {}", e))?;
        let expires_at = std::time::Instant::now()
            + std::time::Duration::from_secs(body.expires_in.saturating_sub(60));
        debug!(expires_in = body.expires_in, "fetched spotify access token");

        Ok(CachedToken {
            access_token: body.access_token,
            expires_at,
        })
    }

    /// GET an API path with the app token and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, String> {
        let token = self.ensure_token().await?;

        let res = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| format!("{} request failed: {}", what, e))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("Spotify API error {}: {}", status, body));
        }

        res.json()
            .await
            .map_err(|e| format!("{} parse failed: {}", what, e))
    }

    /// Best artist match for `name`, if any.
    pub async fn search_artist(&self, name: &str) -> Result<Option<Artist>, String> {
        let url = format!(
            "{}/search?q={}&type=artist&limit=1",
            API_BASE,
            urlencoding::encode(name),
        );
        let body: ArtistSearchResponse = self.get_json(&url, "artist search").await?;
        Ok(body.artists.items.into_iter().next())
    }

    /// Search for tracks in the Spotify catalog.
    pub async fn search_tracks(
        &self,
        q: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<SearchTracksResponse, String> {
        let limit = limit.unwrap_or(20).clamp(1, 50);
        let offset = offset.unwrap_or(0).min(1000);

        let url = format!(
            "{}/search?q={}&type=track&limit={}&offset={}",
            API_BASE,
            urlencoding::encode(q),
            limit,
            offset,
        );

        let body: TrackSearchResponse = self.get_json(&url, "track search").await?;
        Ok(SearchTracksResponse {
            tracks: body.tracks.items,
            total: body.tracks.total,
            limit: body.tracks.limit,
            offset: body.tracks.offset,
        })
    }

    /// One recommended track seeded by the genre for `mood`.
    pub async fn recommend_by_mood(&self, mood: &str) -> Result<Recommendation, String> {
        let genre = genre_for_mood(mood);
        let url = format!(
            "{}/recommendations?seed_genres={}&limit=1",
            API_BASE,
            urlencoding::encode(genre),
        );

        let body: RecommendationsResponse = self.get_json(&url, "recommendations").await?;
        Ok(Recommendation {
            genre,
            track: body.tracks.into_iter().next(),
        })
    }

    /// Start playback of `track_uri` on the user's active device.
    pub async fn play_track(&self, user_token: &str, track_uri: &str) -> Result<(), String> {
        let res = self
            .client
            .put(format!("{}/me/player/play", API_BASE))
            .header("Authorization", format!("Bearer {}", user_token))
            .json(&serde_json::json!({ "uris": [track_uri] }))
            .send()
            .await
            .map_err(|e| format!("play request failed: {}", e))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("Spotify API error {}: {}", status, body));
        }
        debug!(track_uri, "playback started");
        Ok(())
    }
}

/// Seed genre for a mood. Portuguese and English names, case-insensitive.
pub fn genre_for_mood(mood: &str) -> &'static str {
    match mood.trim().to_lowercase().as_str() {
        "feliz" | "happy" => "pop",
        "triste" | "sad" => "acoustic",
        "animado" | "excited" => "dance",
        "calmo" | "calm" => "chill",
        "raiva" | "angry" => "metal",
        "romântico" | "romantico" | "romantic" => "romance",
        _ => DEFAULT_GENRE,
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct ArtistSearchResponse {
    artists: Page<Artist>,
}

#[derive(Deserialize)]
struct TrackSearchResponse {
    tracks: Page<Track>,
}

#[derive(Deserialize)]
struct Page<T> {
    items: Vec<T>,
    #[serde(default)]
    total: u32,
    #[serde(default)]
    limit: u32,
    #[serde(default)]
    offset: u32,
}

#[derive(Deserialize)]
struct RecommendationsResponse {
    #[serde(default)]
    tracks: Vec<Track>,
}

/// Response from track search.
pub struct SearchTracksResponse {
    pub tracks: Vec<Track>,
    pub total: u32,
    pub limit: u32,
    pub offset: u32,
}

/// Recommendation for a mood; `track` is `None` when Spotify had nothing.
pub struct Recommendation {
    pub genre: &'static str,
    pub track: Option<Track>,
}

/// A Spotify track (simplified).
#[derive(Clone, Debug, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub duration_ms: u32,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Album,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

/// Artist as embedded in a track.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: String,
}

/// Full artist object from artist search.
#[derive(Clone, Debug, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub followers: Followers,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Followers {
    #[serde(default)]
    pub total: u64,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Album {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Image {
    pub url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}
