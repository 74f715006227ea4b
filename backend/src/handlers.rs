use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use song_catalog_shared::{
    lyrics::paginate_verses, LyricsResponse, NewSong, PaginatedResponse, Song, SongFilter,
    SongRequest,
};
use tracing::Span;

use crate::{error::ApiError, state::AppState};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIST_SIZE: u32 = 10;
const DEFAULT_LYRICS_SIZE: u32 = 4;

#[derive(Debug, Deserialize)]
pub struct ListSongsQuery {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LyricsQuery {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[tracing::instrument(name = "create_song", skip_all, fields(song_id = tracing::field::Empty))]
pub async fn create_song(
    State(state): State<AppState>,
    payload: Result<Json<SongRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Song>), ApiError> {
    let request = validate_request(payload)?;
    let song = enrich(&state, request).await?;

    let created = state
        .with_store(move |store| store.create(song))
        .await
        .map_err(|err| ApiError::storage("Failed to create song", err))?;
    Span::current().record("song_id", created.id);
    tracing::info!(group = %created.group, song = %created.title, "song created");

    Ok((StatusCode::CREATED, Json(created)))
}

#[tracing::instrument(name = "list_songs", skip_all)]
pub async fn list_songs(
    State(state): State<AppState>,
    Query(query): Query<ListSongsQuery>,
) -> Result<Json<PaginatedResponse<Song>>, ApiError> {
    let page = parse_page_param(query.page.as_deref(), DEFAULT_PAGE);
    let size = parse_page_param(query.size.as_deref(), DEFAULT_LIST_SIZE);
    let filter = SongFilter::new(query.group, query.song);
    tracing::debug!(page, size, ?filter, "listing songs");

    let (data, total) = state
        .with_store(move |store| store.list(page, size, &filter))
        .await
        .map_err(|err| ApiError::storage("Failed to list songs", err))?;

    Ok(Json(PaginatedResponse {
        total,
        page,
        size,
        data,
    }))
}

#[tracing::instrument(name = "get_song", skip_all, fields(song_id = tracing::field::Empty))]
pub async fn get_song(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Song>, ApiError> {
    let id = parse_song_id(&raw_id)?;
    Span::current().record("song_id", id);
    load_song(&state, id).await.map(Json)
}

#[tracing::instrument(name = "get_lyrics", skip_all, fields(song_id = tracing::field::Empty))]
pub async fn get_lyrics(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Query(query): Query<LyricsQuery>,
) -> Result<Json<LyricsResponse>, ApiError> {
    let id = parse_song_id(&raw_id)?;
    Span::current().record("song_id", id);
    let song = load_song(&state, id).await?;

    let page = parse_page_param(query.page.as_deref(), DEFAULT_PAGE);
    let size = parse_page_param(query.size.as_deref(), DEFAULT_LYRICS_SIZE);
    Ok(Json(paginate_verses(&song.text, page, size)))
}

#[tracing::instrument(name = "update_song", skip_all, fields(song_id = tracing::field::Empty))]
pub async fn update_song(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<SongRequest>, JsonRejection>,
) -> Result<Json<Song>, ApiError> {
    let id = parse_song_id(&raw_id)?;
    Span::current().record("song_id", id);
    let existing = load_song(&state, id).await?;
    let request = validate_request(payload)?;

    // Always re-enrich, even when group/song are unchanged.
    let fresh = enrich(&state, request).await?;
    let mut song = Song {
        id: existing.id,
        group: fresh.group,
        title: fresh.title,
        release_date: fresh.release_date,
        text: fresh.text,
        link: fresh.link,
        created_at: existing.created_at,
        updated_at: existing.updated_at,
    };

    let updated = state
        .with_store(move |store| {
            store.update(&mut song)?;
            Ok(song)
        })
        .await
        .map_err(|err| ApiError::storage("Failed to update song", err))?;
    tracing::info!(group = %updated.group, song = %updated.title, "song updated");

    Ok(Json(updated))
}

#[tracing::instrument(name = "delete_song", skip_all, fields(song_id = tracing::field::Empty))]
pub async fn delete_song(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_song_id(&raw_id)?;
    Span::current().record("song_id", id);

    state
        .with_store(move |store| store.delete(id))
        .await
        .map_err(|err| ApiError::storage("Failed to delete song", err))?;
    tracing::info!("song deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn load_song(state: &AppState, id: i64) -> Result<Song, ApiError> {
    state
        .with_store(move |store| store.get_by_id(id))
        .await
        .map_err(|err| ApiError::storage("Failed to load song", err))?
        .ok_or_else(|| ApiError::not_found("Song not found"))
}

/// Looks up the pair upstream and turns the answer into an insertable row.
async fn enrich(state: &AppState, request: SongRequest) -> Result<NewSong, ApiError> {
    let detail = state
        .metadata()
        .fetch(&request.group, &request.song)
        .await
        .map_err(ApiError::upstream)?;
    let raw_date = detail.release_date.clone();
    NewSong::enriched(request.group, request.song, detail)
        .map_err(|err| ApiError::format(&raw_date, err))
}

fn validate_request(
    payload: Result<Json<SongRequest>, JsonRejection>,
) -> Result<SongRequest, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    let group = request.group.trim();
    let song = request.song.trim();
    if group.is_empty() || song.is_empty() {
        return Err(ApiError::validation("group and song are required"));
    }
    Ok(SongRequest {
        group: group.to_string(),
        song: song.to_string(),
    })
}

fn parse_song_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<u64>()
        .ok()
        .and_then(|id| i64::try_from(id).ok())
        .ok_or_else(|| ApiError::validation("Invalid ID format"))
}

/// Unparseable, zero or negative values fall back to `default`.
fn parse_page_param(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_fall_back_to_defaults() {
        assert_eq!(parse_page_param(None, 10), 10);
        assert_eq!(parse_page_param(Some("abc"), 10), 10);
        assert_eq!(parse_page_param(Some("0"), 10), 10);
        assert_eq!(parse_page_param(Some("-3"), 4), 4);
        assert_eq!(parse_page_param(Some(" 7 "), 4), 7);
    }

    #[test]
    fn song_ids_must_be_non_negative_integers() {
        assert_eq!(parse_song_id("42").expect("valid id"), 42);
        assert!(parse_song_id("-1").is_err());
        assert!(parse_song_id("abc").is_err());
        assert!(parse_song_id("1.5").is_err());
        assert!(parse_song_id("18446744073709551615").is_err());
    }

    #[test]
    fn requests_are_trimmed_and_require_both_fields() {
        let request = validate_request(Ok(Json(SongRequest {
            group: "  Muse ".to_string(),
            song: "Hysteria".to_string(),
        })))
        .expect("valid request");
        assert_eq!(request.group, "Muse");

        let err = validate_request(Ok(Json(SongRequest {
            group: "Muse".to_string(),
            song: "   ".to_string(),
        })))
        .expect_err("blank song");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
