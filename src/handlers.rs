//! HTTP handlers for the chat, Spotify and speech API.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::chat::{ChatResponder, KnowledgeStore, Matcher, DEFAULT_MAX_RESULTS};
use crate::config::Config;
use crate::error::AppError;
use crate::speech::SpeechClient;
use crate::spotify::{SpotifyClient, Track};

/// Shared handler state, built once from [`Config`].
#[derive(Clone)]
pub struct AppState {
    pub spotify: SpotifyClient,
    pub speech: SpeechClient,
    pub store: KnowledgeStore,
    pub responder: ChatResponder,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let matcher = Matcher::new(config.match_threshold, DEFAULT_MAX_RESULTS)?;
        Ok(Self {
            spotify: SpotifyClient::new(
                config.spotify_client_id.clone(),
                config.spotify_client_secret.clone(),
            ),
            speech: SpeechClient::new(config.tts_language.clone()),
            store: KnowledgeStore::new(config.knowledge_base_path.clone()),
            responder: ChatResponder::new(matcher),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct ArtistQuery {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ArtistResponse {
    pub name: String,
    pub external_url: Option<String>,
    pub genres: Vec<String>,
    pub followers: u64,
}

/// Query parameters for track search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query (required).
    pub q: String,
    /// Max results (1-50, default 20).
    #[serde(default)]
    pub limit: Option<u32>,
    /// Pagination offset (0-1000).
    #[serde(default)]
    pub offset: Option<u32>,
}

/// API response for track search.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub tracks: Vec<TrackResponse>,
    pub total: u32,
    pub limit: u32,
    pub offset: u32,
}

/// Single track in API response.
#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub duration_ms: u32,
    pub explicit: bool,
    pub artists: Vec<TrackArtistResponse>,
    pub album: AlbumResponse,
    pub spotify_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrackArtistResponse {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AlbumResponse {
    pub id: Option<String>,
    pub name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MoodQuery {
    pub mood: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub message: String,
    pub genre: String,
    pub track_url: Option<String>,
    pub uri: String,
}

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    pub uri: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
    /// Also play the audio on the server's speakers.
    #[serde(default)]
    pub play: bool,
}

fn track_to_response(t: &Track) -> TrackResponse {
    TrackResponse {
        id: t.id.clone(),
        name: t.name.clone(),
        uri: t.uri.clone(),
        duration_ms: t.duration_ms,
        explicit: t.explicit,
        artists: t.artists.iter().map(|a| TrackArtistResponse {
            id: a.id.clone(),
            name: a.name.clone(),
        }).collect(),
        album: AlbumResponse {
            id: t.album.id.clone(),
            name: t.album.name.clone(),
            image_url: t.album.images.first().and_then(|i| i.url.clone()),
        },
        spotify_url: t.external_urls.spotify.clone(),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// GET /health - Health check.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /api/chat - Answer a message from the knowledge base.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let message = req
        .message
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::BadRequest("message not provided".into()))?;

    let AppState { responder, store, .. } = state;
    let response = tokio::task::spawn_blocking(move || responder.answer(&message, &store))
        .await
        .map_err(|e| AppError::Internal(format!("chat task failed: {}", e)))??;

    Ok(Json(ChatResponse { response }))
}

/// POST /api/search-artist - Look up one artist by name.
pub async fn search_artist(
    State(state): State<AppState>,
    Query(params): Query<ArtistQuery>,
) -> Result<Json<ArtistResponse>, AppError> {
    let name = params
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("artist name not provided".into()))?;

    let artist = state
        .spotify
        .search_artist(&name)
        .await
        .map_err(AppError::Spotify)?
        .ok_or_else(|| AppError::NotFound("artist not found".into()))?;

    Ok(Json(ArtistResponse {
        name: artist.name,
        external_url: artist.external_urls.spotify,
        genres: artist.genres,
        followers: artist.followers.total,
    }))
}

/// GET /api/search-track - Search Spotify for tracks.
pub async fn search_track(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    if params.q.trim().is_empty() {
        return Err(AppError::BadRequest("query 'q' is required and cannot be empty".into()));
    }

    let result = state
        .spotify
        .search_tracks(&params.q, params.limit, params.offset)
        .await
        .map_err(AppError::Spotify)?;

    let response = SearchResponse {
        tracks: result.tracks.iter().map(track_to_response).collect(),
        total: result.total,
        limit: result.limit,
        offset: result.offset,
    };

    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/recommend - One track for a mood.
pub async fn recommend(
    State(state): State<AppState>,
    Query(params): Query<MoodQuery>,
) -> Result<Json<RecommendResponse>, AppError> {
    let rec = state
        .spotify
        .recommend_by_mood(&params.mood)
        .await
        .map_err(AppError::Spotify)?;

    let track = rec
        .track
        .ok_or_else(|| AppError::NotFound("no recommended track found".into()))?;
    let track_url = track.external_urls.spotify;
    let message = match &track_url {
        Some(url) => format!("Recommended track for you: {}", url),
        None => format!("Recommended track for you: {}", track.name),
    };

    Ok(Json(RecommendResponse {
        message,
        genre: rec.genre.to_string(),
        track_url,
        uri: track.uri,
    }))
}

/// PUT /api/play - Start playback with the caller's Spotify user token.
pub async fn play(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PlayRequest>,
) -> Result<StatusCode, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::BadRequest("bearer user token required".into()))?;
    if req.uri.trim().is_empty() {
        return Err(AppError::BadRequest("track uri cannot be empty".into()));
    }

    state
        .spotify
        .play_track(token, &req.uri)
        .await
        .map_err(AppError::Spotify)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/speak - Synthesize text to MP3.
pub async fn speak(
    State(state): State<AppState>,
    Json(req): Json<SpeakRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("text cannot be empty".into()));
    }
    if req.play && !cfg!(feature = "playback") {
        return Err(AppError::BadRequest("server was built without playback support".into()));
    }

    let audio = state.speech.synthesize(&req.text).await.map_err(AppError::Speech)?;
    if req.play {
        play_locally(audio.clone()).await?;
    }

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio))
}

#[cfg(feature = "playback")]
async fn play_locally(audio: Vec<u8>) -> Result<(), AppError> {
    tokio::task::spawn_blocking(move || crate::speech::play_blocking(audio))
        .await
        .map_err(|e| AppError::Internal(format!("playback task failed: {}", e)))?
        .map_err(AppError::Speech)
}

#[cfg(not(feature = "playback"))]
async fn play_locally(_audio: Vec<u8>) -> Result<(), AppError> {
    Err(AppError::BadRequest("server was built without playback support".into()))
}

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/search-artist", post(search_artist))
        .route("/api/search-track", get(search_track))
        .route("/api/recommend", get(recommend))
        .route("/api/play", put(play))
        .route("/api/speak", post(speak))
}
