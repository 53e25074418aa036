use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Client, Collection, IndexModel,
    bson::{Bson, Document, doc},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{IndexOptions, ReplaceOptions},
};
use tracing::{debug, info, warn};

use super::{SongStore, StoreResult, UpdateOutcome};
use crate::error::StoreError;
use crate::models::song::numeric_id;
use crate::secrets::SecretManager;

const SONGS_COLLECTION: &str = "songs";
const IMMUTABLE_FIELD: i32 = 66;
const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed song store. Cloning shares the underlying client pool.
#[derive(Clone)]
pub struct Database {
    songs: Collection<Document>,
    unique_ids: Arc<AtomicBool>,
}

impl Database {
    /// Connect and verify the server answers (and accepts our credentials).
    pub async fn new(secrets: &SecretManager) -> Result<Self, StoreError> {
        debug!("MONGODB_URL={}", secrets.redacted_mongodb_url());

        let client = Client::with_uri_str(secrets.mongodb_url()).await?;
        let database = client.database(&secrets.database);
        database.run_command(doc! { "ping": 1 }, None).await?;

        Ok(Self {
            songs: database.collection::<Document>(SONGS_COLLECTION),
            unique_ids: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Create the unique index on `id`. Returns whether it is in place; when it is not,
    /// inserts fall back to checking for an existing song first.
    pub async fn ensure_unique_index(&self) -> bool {
        let model = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match self.songs.create_index(model, None).await {
            Ok(_) => {
                info!("Unique index on song id is in place");
                self.unique_ids.store(true, Ordering::SeqCst);
                true
            }
            Err(e) => {
                warn!("Could not create unique index on song id: {}", e);
                self.unique_ids.store(false, Ordering::SeqCst);
                false
            }
        }
    }
}

fn write_error_code(err: &MongoError) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => Some(write_error.code),
        _ => None,
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    write_error_code(err) == Some(DUPLICATE_KEY)
}

#[async_trait]
impl SongStore for Database {
    async fn count(&self) -> StoreResult<u64> {
        Ok(self.songs.count_documents(doc! {}, None).await?)
    }

    async fn list(&self) -> StoreResult<Vec<Document>> {
        let cursor = self.songs.find(doc! {}, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find(&self, id: i64) -> StoreResult<Option<Document>> {
        Ok(self.songs.find_one(doc! { "id": id }, None).await?)
    }

    async fn insert(&self, id: i64, song: Document) -> StoreResult<Bson> {
        if !self.unique_ids.load(Ordering::SeqCst) && self.find(id).await?.is_some() {
            return Err(StoreError::DuplicateId(id));
        }

        match self.songs.insert_one(song, None).await {
            Ok(result) => Ok(result.inserted_id),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::DuplicateId(id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, id: i64, fields: Document) -> StoreResult<UpdateOutcome> {
        let new_id = fields.get("id").and_then(numeric_id).unwrap_or(id);
        let result = match self
            .songs
            .update_one(doc! { "id": id }, doc! { "$set": fields }, None)
            .await
        {
            Ok(result) => result,
            Err(e) if is_duplicate_key(&e) => return Err(StoreError::DuplicateId(new_id)),
            Err(e) if write_error_code(&e) == Some(IMMUTABLE_FIELD) => {
                return Err(StoreError::InvalidUpdate(e.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(if result.matched_count == 0 {
            UpdateOutcome::NotFound
        } else if result.modified_count == 0 {
            UpdateOutcome::Unchanged
        } else {
            UpdateOutcome::Updated
        })
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = self.songs.delete_one(doc! { "id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn reset(&self, songs: Vec<Document>) -> StoreResult<()> {
        self.songs.drop(None).await?;
        // Dropping the collection drops its indexes too
        self.unique_ids.store(false, Ordering::SeqCst);
        if !songs.is_empty() {
            self.songs.insert_many(songs, None).await?;
        }
        Ok(())
    }

    async fn upsert_all(&self, songs: Vec<(i64, Document)>) -> StoreResult<u64> {
        let options = ReplaceOptions::builder().upsert(true).build();
        let mut written = 0;
        for (id, song) in songs {
            let result = self
                .songs
                .replace_one(doc! { "id": id }, song, options.clone())
                .await?;
            if result.matched_count > 0 || result.upserted_id.is_some() {
                written += 1;
            }
        }
        Ok(written)
    }
}
