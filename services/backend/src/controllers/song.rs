use std::sync::Arc;

use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mongodb::bson::Bson;
use tracing::{debug, info};

use crate::{
    db::{SongStore, UpdateOutcome},
    error::{ApiError, ApiResult, StoreError},
    models::song::{
        CountResponse, InsertedResponse, MessageResponse, NewSong, SongUpdate, SongsResponse,
        to_extjson,
    },
};

/// Song operations over an injected store.
#[derive(Clone)]
pub struct SongController {
    store: Arc<dyn SongStore>,
    conflict_status: StatusCode,
}

impl SongController {
    pub fn new(store: Arc<dyn SongStore>, conflict_status: StatusCode) -> Self {
        SongController {
            store,
            conflict_status,
        }
    }

    pub async fn count(&self) -> ApiResult<Response> {
        let count = self.store.count().await?;
        Ok((StatusCode::OK, Json(CountResponse { count })).into_response())
    }

    pub async fn list(&self) -> ApiResult<Response> {
        let songs = self.store.list().await?;
        debug!("Listing {} songs", songs.len());
        let songs = songs.into_iter().map(to_extjson).collect();
        Ok((StatusCode::OK, Json(SongsResponse { songs })).into_response())
    }

    pub async fn get(&self, id: i64) -> ApiResult<Response> {
        match self.store.find(id).await? {
            Some(song) => Ok((StatusCode::OK, Json(to_extjson(song))).into_response()),
            None => Err(ApiError::NotFound(format!("Song with id {} not found", id))),
        }
    }

    pub async fn create(&self, song: NewSong) -> ApiResult<Response> {
        let inserted = match self.store.insert(song.id, song.document).await {
            Ok(inserted) => inserted,
            Err(StoreError::DuplicateId(id)) => {
                return Err(ApiError::AlreadyExists {
                    id,
                    status: self.conflict_status,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let inserted_id = match inserted {
            Bson::ObjectId(oid) => oid.to_hex(),
            Bson::String(s) => s,
            other => other.to_string(),
        };
        info!("Created song {} as {}", song.id, inserted_id);

        Ok((StatusCode::CREATED, Json(InsertedResponse { inserted_id })).into_response())
    }

    pub async fn update(&self, id: i64, update: SongUpdate) -> ApiResult<Response> {
        let outcome = match self.store.update(id, update.fields).await {
            Ok(outcome) => outcome,
            Err(StoreError::InvalidUpdate(reason)) => return Err(ApiError::InvalidBody(reason)),
            Err(e) => return Err(e.into()),
        };
        match outcome {
            UpdateOutcome::NotFound => Err(ApiError::NotFound("Song not found".to_string())),
            UpdateOutcome::Unchanged => Ok((
                StatusCode::OK,
                Json(MessageResponse {
                    message: "Song found, but nothing updated".to_string(),
                }),
            )
                .into_response()),
            UpdateOutcome::Updated => {
                info!("Updated song {}", id);
                // The song may have been deleted since the write
                match self.store.find(id).await? {
                    Some(song) => Ok((StatusCode::OK, Json(to_extjson(song))).into_response()),
                    None => Err(ApiError::NotFound("Song not found".to_string())),
                }
            }
        }
    }

    pub async fn delete(&self, id: i64) -> ApiResult<Response> {
        if self.store.delete(id).await? {
            info!("Deleted song {}", id);
            Ok(StatusCode::NO_CONTENT.into_response())
        } else {
            Err(ApiError::NotFound("song not found".to_string()))
        }
    }
}
