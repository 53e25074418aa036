//! HTTP service exposing CRUD operations over a MongoDB collection of song lyrics.
use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod controllers;
pub mod db;
pub mod error;
pub mod models;
pub mod routers;
pub mod secrets;
pub mod seed;
pub mod state;

use routers::{health_check_route, song_routes};
use state::AppState;

/// Build the full router with CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check_route))
        .merge(song_routes())
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
