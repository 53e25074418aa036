use axum::{Json, http::StatusCode, response::IntoResponse};

use crate::models::song::HealthResponse;

pub struct RootController;

impl RootController {
    pub async fn health_check() -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "OK".to_string(),
            }),
        )
    }
}
