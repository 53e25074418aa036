use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

use crate::error::StoreError;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::Database;

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of an existence-filtered update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    NotFound,
    Unchanged,
    Updated,
}

/// Persistence for song documents keyed by their integer `id`.
#[async_trait]
pub trait SongStore: Send + Sync {
    async fn count(&self) -> StoreResult<u64>;

    /// All stored songs, in no particular order.
    async fn list(&self) -> StoreResult<Vec<Document>>;

    async fn find(&self, id: i64) -> StoreResult<Option<Document>>;

    /// Insert a new song and return the store-assigned `_id`.
    /// Fails with `StoreError::DuplicateId` when a song with `id` already exists.
    async fn insert(&self, id: i64, song: Document) -> StoreResult<Bson>;

    /// `$set` the given fields on the song with `id`.
    async fn update(&self, id: i64, fields: Document) -> StoreResult<UpdateOutcome>;

    /// Returns false when nothing matched.
    async fn delete(&self, id: i64) -> StoreResult<bool>;

    /// Discard every stored song and insert `songs`.
    async fn reset(&self, songs: Vec<Document>) -> StoreResult<()>;

    /// Replace-or-insert each song by `id`. Returns how many were written.
    async fn upsert_all(&self, songs: Vec<(i64, Document)>) -> StoreResult<u64>;
}
