/// Shared application state
use std::sync::Arc;

use axum::http::StatusCode;

use crate::controllers::SongController;
use crate::db::SongStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub songs: SongController,
}

impl AppState {
    pub fn new(store: Arc<dyn SongStore>, conflict_status: StatusCode) -> Self {
        Self {
            songs: SongController::new(store, conflict_status),
        }
    }
}
