use async_trait::async_trait;
use mongodb::bson::{Bson, Document, doc, oid::ObjectId};
use tokio::sync::RwLock;

use super::{SongStore, StoreResult, UpdateOutcome};
use crate::error::StoreError;
use crate::models::song::song_id;

/// In-process song store with the same semantics as the MongoDB one.
#[derive(Default)]
pub struct MemoryStore {
    songs: RwLock<Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Put a fresh `_id` first unless the song already carries one.
fn with_object_id(song: Document) -> (Bson, Document) {
    if let Some(existing) = song.get("_id") {
        return (existing.clone(), song);
    }
    let oid = Bson::ObjectId(ObjectId::new());
    let mut stored = doc! { "_id": oid.clone() };
    for (key, value) in song {
        stored.insert(key, value);
    }
    (oid, stored)
}

/// `$set` one possibly dotted path, creating intermediate documents as needed.
/// Returns whether the stored value changed.
fn set_path(document: &mut Document, path: &str, value: Bson) -> StoreResult<bool> {
    match path.split_once('.') {
        None => {
            if document.get(path) == Some(&value) {
                return Ok(false);
            }
            document.insert(path, value);
            Ok(true)
        }
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head, Document::new());
            }
            match document.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                _ => Err(StoreError::InvalidUpdate(format!(
                    "Cannot create field '{}' in element {{{}}}",
                    rest, head
                ))),
            }
        }
    }
}

#[async_trait]
impl SongStore for MemoryStore {
    async fn count(&self) -> StoreResult<u64> {
        Ok(self.songs.read().await.len() as u64)
    }

    async fn list(&self) -> StoreResult<Vec<Document>> {
        Ok(self.songs.read().await.clone())
    }

    async fn find(&self, id: i64) -> StoreResult<Option<Document>> {
        let songs = self.songs.read().await;
        Ok(songs.iter().find(|song| song_id(song) == Some(id)).cloned())
    }

    async fn insert(&self, id: i64, song: Document) -> StoreResult<Bson> {
        let mut songs = self.songs.write().await;
        if songs.iter().any(|existing| song_id(existing) == Some(id)) {
            return Err(StoreError::DuplicateId(id));
        }
        let (oid, stored) = with_object_id(song);
        songs.push(stored);
        Ok(oid)
    }

    async fn update(&self, id: i64, fields: Document) -> StoreResult<UpdateOutcome> {
        let mut songs = self.songs.write().await;
        let Some(index) = songs.iter().position(|song| song_id(song) == Some(id)) else {
            return Ok(UpdateOutcome::NotFound);
        };

        // Apply to a copy so a rejected update leaves the song untouched
        let mut updated = songs[index].clone();
        let mut modified = false;
        for (key, value) in fields {
            modified |= set_path(&mut updated, &key, value)?;
        }
        if !modified {
            return Ok(UpdateOutcome::Unchanged);
        }

        if updated.get("_id") != songs[index].get("_id") {
            return Err(StoreError::InvalidUpdate(
                "Performing an update on the path '_id' would modify the immutable field '_id'"
                    .to_string(),
            ));
        }
        if let Some(new_id) = song_id(&updated) {
            let taken = songs
                .iter()
                .enumerate()
                .any(|(other, song)| other != index && song_id(song) == Some(new_id));
            if taken {
                return Err(StoreError::DuplicateId(new_id));
            }
        }

        songs[index] = updated;
        Ok(UpdateOutcome::Updated)
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let mut songs = self.songs.write().await;
        match songs.iter().position(|song| song_id(song) == Some(id)) {
            Some(index) => {
                songs.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reset(&self, songs: Vec<Document>) -> StoreResult<()> {
        let mut stored = self.songs.write().await;
        *stored = songs.into_iter().map(|song| with_object_id(song).1).collect();
        Ok(())
    }

    async fn upsert_all(&self, songs: Vec<(i64, Document)>) -> StoreResult<u64> {
        let mut stored = self.songs.write().await;
        let mut written = 0;
        for (id, song) in songs {
            match stored.iter_mut().find(|existing| song_id(existing) == Some(id)) {
                Some(existing) => {
                    // A replacement keeps the stored `_id`
                    let oid = existing.get("_id").cloned();
                    let mut replaced = song;
                    replaced.remove("_id");
                    *existing = match oid {
                        Some(oid) => {
                            let mut with_id = doc! { "_id": oid };
                            for (key, value) in replaced {
                                with_id.insert(key, value);
                            }
                            with_id
                        }
                        None => replaced,
                    };
                }
                None => stored.push(with_object_id(song).1),
            }
            written += 1;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: i64, title: &str) -> Document {
        doc! { "id": id, "title": title, "lyrics": "la la la" }
    }

    #[tokio::test]
    async fn insert_assigns_object_id_and_rejects_duplicates() {
        let store = MemoryStore::new();
        let oid = store.insert(1, song(1, "First")).await.unwrap();
        assert!(matches!(oid, Bson::ObjectId(_)));

        let stored = store.find(1).await.unwrap().unwrap();
        assert_eq!(stored.get("_id"), Some(&oid));
        assert_eq!(stored.keys().next().map(String::as_str), Some("_id"));

        let err = store.insert(1, song(1, "Second")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(1)));
        assert_eq!(
            store.find(1).await.unwrap().unwrap().get_str("title").unwrap(),
            "First"
        );
    }

    #[tokio::test]
    async fn ids_match_across_numeric_types() {
        let store = MemoryStore::new();
        store
            .reset(vec![doc! { "id": 4_i32, "title": "T", "lyrics": "L" }])
            .await
            .unwrap();
        assert!(store.find(4).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_reports_outcome() {
        let store = MemoryStore::new();
        store.insert(2, song(2, "Old")).await.unwrap();

        let outcome = store
            .update(9, doc! { "title": "New", "lyrics": "x" })
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::NotFound);

        let outcome = store
            .update(2, doc! { "title": "Old", "lyrics": "la la la" })
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Unchanged);

        let outcome = store
            .update(2, doc! { "title": "New", "lyrics": "la la la", "year": 2001 })
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Updated);

        let stored = store.find(2).await.unwrap().unwrap();
        assert_eq!(stored.get_str("title").unwrap(), "New");
        assert_eq!(stored.get_i32("year").unwrap(), 2001);
    }

    #[tokio::test]
    async fn update_rejects_object_id_changes() {
        let store = MemoryStore::new();
        let oid = store.insert(2, song(2, "Old")).await.unwrap();

        let err = store
            .update(2, doc! { "_id": ObjectId::new(), "title": "New", "lyrics": "x" })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidUpdate(_)));

        let stored = store.find(2).await.unwrap().unwrap();
        assert_eq!(stored.get("_id"), Some(&oid));
        assert_eq!(stored.get_str("title").unwrap(), "Old");

        let outcome = store
            .update(2, doc! { "_id": oid, "title": "Old", "lyrics": "la la la" })
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Unchanged);
    }

    #[tokio::test]
    async fn update_keeps_ids_unique() {
        let store = MemoryStore::new();
        store.reset(vec![song(1, "a"), song(2, "b")]).await.unwrap();

        let err = store
            .update(2, doc! { "id": 1, "title": "b", "lyrics": "la la la" })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(1)));
        assert_eq!(store.find(2).await.unwrap().unwrap().get_str("title").unwrap(), "b");

        let outcome = store
            .update(2, doc! { "id": 3, "title": "b", "lyrics": "la la la" })
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Updated);
        assert!(store.find(2).await.unwrap().is_none());
        assert!(store.find(3).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_sets_dotted_paths() {
        let store = MemoryStore::new();
        store.insert(5, song(5, "e")).await.unwrap();

        let outcome = store
            .update(5, doc! { "meta.album": "Live", "meta.year": 1970 })
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Updated);

        let stored = store.find(5).await.unwrap().unwrap();
        let meta = stored.get_document("meta").unwrap();
        assert_eq!(meta.get_str("album").unwrap(), "Live");
        assert!(!stored.contains_key("meta.album"));

        let err = store
            .update(5, doc! { "title.sub": "x" })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidUpdate(_)));
    }

    #[tokio::test]
    async fn delete_and_count() {
        let store = MemoryStore::new();
        store.reset(vec![song(1, "a"), song(2, "b")]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        assert!(store.delete(1).await.unwrap());
        assert!(!store.delete(1).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_replaces_and_keeps_object_id() {
        let store = MemoryStore::new();
        let oid = store.insert(1, song(1, "a")).await.unwrap();

        let written = store
            .upsert_all(vec![(1, song(1, "replaced")), (2, song(2, "new"))])
            .await
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(store.count().await.unwrap(), 2);

        let replaced = store.find(1).await.unwrap().unwrap();
        assert_eq!(replaced.get("_id"), Some(&oid));
        assert_eq!(replaced.get_str("title").unwrap(), "replaced");
    }
}
