use std::fmt;
use std::path::Path;
use std::str::FromStr;

use mongodb::bson::{Bson, Document};
use tracing::{info, warn};

use crate::db::SongStore;
use crate::error::StoreError;
use crate::models::song::song_id;

/// How startup applies the seed dataset to the songs collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedMode {
    /// Drop every stored song and load the dataset.
    Reset,
    /// Replace-or-insert each dataset song by `id`, leaving other songs alone.
    Upsert,
    Skip,
}

impl FromStr for SeedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reset" => Ok(SeedMode::Reset),
            "upsert" => Ok(SeedMode::Upsert),
            "skip" | "off" => Ok(SeedMode::Skip),
            other => Err(format!("unknown seed mode: {}", other)),
        }
    }
}

impl fmt::Display for SeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SeedMode::Reset => "reset",
            SeedMode::Upsert => "upsert",
            SeedMode::Skip => "skip",
        };
        f.write_str(name)
    }
}

/// Parse a seed dataset: a JSON array of song objects, extended JSON allowed.
pub fn parse_seed(raw: &[u8]) -> Result<Vec<Document>, StoreError> {
    let values: Vec<serde_json::Value> = serde_json::from_slice(raw)
        .map_err(|e| StoreError::Seed(format!("seed dataset is not a JSON array: {}", e)))?;

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match Bson::try_from(value) {
            Ok(Bson::Document(song)) => Ok(song),
            Ok(_) => Err(StoreError::Seed(format!("record {} is not an object", index))),
            Err(e) => Err(StoreError::Seed(format!("record {}: {}", index, e))),
        })
        .collect()
}

pub async fn load_seed(path: &Path) -> Result<Vec<Document>, StoreError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| StoreError::Seed(format!("cannot read {}: {}", path.display(), e)))?;
    parse_seed(&raw)
}

/// Apply `songs` to the store. Returns how many songs were written.
pub async fn apply_seed(
    store: &dyn SongStore,
    mode: SeedMode,
    songs: Vec<Document>,
) -> Result<u64, StoreError> {
    match mode {
        SeedMode::Skip => {
            info!("Seeding skipped");
            Ok(0)
        }
        SeedMode::Reset => {
            let total = songs.len() as u64;
            store.reset(songs).await?;
            info!("Songs collection reset with {} seed records", total);
            Ok(total)
        }
        SeedMode::Upsert => {
            let mut keyed = Vec::with_capacity(songs.len());
            for mut song in songs {
                match song_id(&song) {
                    Some(id) => {
                        song.remove("_id");
                        keyed.push((id, song));
                    }
                    None => warn!("Skipping seed record without an integer id: {}", song),
                }
            }
            let written = store.upsert_all(keyed).await?;
            info!("Upserted {} seed records", written);
            Ok(written)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use mongodb::bson::doc;
    use std::io::Write;

    const DATASET: &str = r#"[
        {"id": 1, "title": "One", "lyrics": "first"},
        {"id": 2, "title": "Two", "lyrics": "second", "released": {"$date": "1999-01-01T00:00:00Z"}}
    ]"#;

    #[test]
    fn seed_mode_parses() {
        assert_eq!("RESET".parse::<SeedMode>().unwrap(), SeedMode::Reset);
        assert_eq!("upsert".parse::<SeedMode>().unwrap(), SeedMode::Upsert);
        assert_eq!("off".parse::<SeedMode>().unwrap(), SeedMode::Skip);
        assert!("wipe".parse::<SeedMode>().is_err());
        assert_eq!(SeedMode::Upsert.to_string(), "upsert");
    }

    #[test]
    fn parses_extended_json_records() {
        let songs = parse_seed(DATASET.as_bytes()).unwrap();
        assert_eq!(songs.len(), 2);
        assert!(songs[1].get_datetime("released").is_ok());
    }

    #[test]
    fn rejects_non_array_and_non_object_records() {
        assert!(parse_seed(br#"{"id": 1}"#).is_err());
        assert!(parse_seed(br#"[{"id": 1}, 5]"#).is_err());
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DATASET.as_bytes()).unwrap();

        let songs = load_seed(file.path()).await.unwrap();
        assert_eq!(songs.len(), 2);

        let missing = load_seed(Path::new("/definitely/not/here.json")).await;
        assert!(matches!(missing, Err(StoreError::Seed(_))));
    }

    #[tokio::test]
    async fn reset_discards_previous_songs() {
        let store = MemoryStore::new();
        store
            .insert(77, doc! { "id": 77, "title": "Gone", "lyrics": "bye" })
            .await
            .unwrap();

        let written = apply_seed(&store, SeedMode::Reset, parse_seed(DATASET.as_bytes()).unwrap())
            .await
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(store.count().await.unwrap(), 2);
        assert!(store.find(77).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_is_idempotent_and_keeps_other_songs() {
        let store = MemoryStore::new();
        store
            .insert(77, doc! { "id": 77, "title": "Kept", "lyrics": "hi" })
            .await
            .unwrap();

        let mut songs = parse_seed(DATASET.as_bytes()).unwrap();
        songs.push(doc! { "title": "No id", "lyrics": "?" });

        apply_seed(&store, SeedMode::Upsert, songs.clone()).await.unwrap();
        apply_seed(&store, SeedMode::Upsert, songs).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 3);
        assert!(store.find(77).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn skip_leaves_store_untouched() {
        let store = MemoryStore::new();
        let written = apply_seed(&store, SeedMode::Skip, parse_seed(DATASET.as_bytes()).unwrap())
            .await
            .unwrap();
        assert_eq!(written, 0);
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
