use axum::{
    Router,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request, State},
    http::request::Parts,
    response::Response,
    routing::get,
};
use mongodb::bson::Document;
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult},
    models::song::{NewSong, SongUpdate, document_from_json},
    state::AppState,
};

/// Integer song id taken from the `{id}` path segment.
pub struct SongId(pub i64);

impl<S> FromRequestParts<S> for SongId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::InvalidId(e.body_text()))?;
        // Unsigned digits only, like the `<int:id>` route converter
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ApiError::InvalidId(raw));
        }
        raw.parse::<i64>()
            .map(SongId)
            .map_err(|_| ApiError::InvalidId(raw))
    }
}

/// JSON request body converted to a BSON document.
pub struct SongBody(pub Document);

impl<S> FromRequest<S> for SongBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::InvalidBody(e.body_text()))?;
        let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
            debug!("Rejected song body: {}", e);
            ApiError::InvalidBody("Invalid JSON body".to_string())
        })?;
        document_from_json(value).map(SongBody)
    }
}

pub async fn count_route(State(state): State<AppState>) -> ApiResult<Response> {
    state.songs.count().await
}

pub async fn list_songs_route(State(state): State<AppState>) -> ApiResult<Response> {
    state.songs.list().await
}

pub async fn get_song_route(
    State(state): State<AppState>,
    SongId(id): SongId,
) -> ApiResult<Response> {
    state.songs.get(id).await
}

pub async fn create_song_route(
    State(state): State<AppState>,
    SongBody(body): SongBody,
) -> ApiResult<Response> {
    state.songs.create(NewSong::try_from(body)?).await
}

pub async fn update_song_route(
    State(state): State<AppState>,
    SongId(id): SongId,
    SongBody(body): SongBody,
) -> ApiResult<Response> {
    state.songs.update(id, SongUpdate::new(id, body)?).await
}

pub async fn delete_song_route(
    State(state): State<AppState>,
    SongId(id): SongId,
) -> ApiResult<Response> {
    state.songs.delete(id).await
}

pub fn song_routes() -> Router<AppState> {
    Router::new()
        .route("/count", get(count_route))
        .route("/song", get(list_songs_route).post(create_song_route))
        .route(
            "/song/{id}",
            get(get_song_route)
                .put(update_song_route)
                .delete(delete_song_route),
        )
}
