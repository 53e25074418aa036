use mongodb::bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const ID_FIELD: &str = "id";
pub const TITLE_FIELD: &str = "title";
pub const LYRICS_FIELD: &str = "lyrics";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Serialize, Clone, Debug)]
pub struct SongsResponse {
    pub songs: Vec<serde_json::Value>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct InsertedResponse {
    pub inserted_id: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

/// A validated create payload. `document` holds every submitted field.
#[derive(Clone, Debug)]
pub struct NewSong {
    pub id: i64,
    pub document: Document,
}

impl TryFrom<Document> for NewSong {
    type Error = ApiError;

    fn try_from(document: Document) -> Result<Self, Self::Error> {
        require_fields(&document, &[ID_FIELD, TITLE_FIELD, LYRICS_FIELD])?;
        let id = song_id(&document)
            .ok_or_else(|| ApiError::InvalidBody("Field 'id' must be an integer".to_string()))?;
        Ok(NewSong { id, document })
    }
}

/// A validated update payload; applied as a partial `$set`.
#[derive(Clone, Debug)]
pub struct SongUpdate {
    pub fields: Document,
}

impl SongUpdate {
    /// Validate `fields` for the song addressed by `id`. The body may repeat the song's
    /// `id` but never change it.
    pub fn new(id: i64, mut fields: Document) -> Result<Self, ApiError> {
        require_fields(&fields, &[TITLE_FIELD, LYRICS_FIELD])?;
        if let Some(value) = fields.get(ID_FIELD) {
            if numeric_id(value) != Some(id) {
                return Err(ApiError::InvalidBody(format!(
                    "Field 'id' must match song id {}",
                    id
                )));
            }
            fields.remove(ID_FIELD);
        }
        Ok(SongUpdate { fields })
    }
}

fn require_fields(document: &Document, fields: &[&str]) -> Result<(), ApiError> {
    if fields.iter().all(|field| document.contains_key(field)) {
        Ok(())
    } else {
        Err(ApiError::MissingFields)
    }
}

/// Largest integer a double holds exactly (2^53).
const MAX_EXACT_DOUBLE: f64 = 9_007_199_254_740_992.0;

/// Integral value of a numeric BSON field. Doubles count only when they have no fraction
/// and lie within the range a double represents exactly.
pub fn numeric_id(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) if v.fract() == 0.0 && v.abs() <= MAX_EXACT_DOUBLE => Some(*v as i64),
        _ => None,
    }
}

pub fn song_id(document: &Document) -> Option<i64> {
    document.get(ID_FIELD).and_then(numeric_id)
}

/// Parse a JSON request body (extended JSON allowed) into a document.
pub fn document_from_json(value: serde_json::Value) -> Result<Document, ApiError> {
    match Bson::try_from(value) {
        Ok(Bson::Document(document)) => Ok(document),
        Ok(_) => Err(ApiError::MissingFields),
        Err(_) => Err(ApiError::InvalidBody("Invalid JSON body".to_string())),
    }
}

/// Render a stored song in relaxed extended JSON.
pub fn to_extjson(document: Document) -> serde_json::Value {
    Bson::Document(document).into_relaxed_extjson()
}
