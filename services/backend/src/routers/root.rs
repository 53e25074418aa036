use axum::extract::State;
use crate::controllers::RootController;
use crate::state::AppState;

pub async fn health_check_route(
    State(_state): State<AppState>,
) -> impl axum::response::IntoResponse {
    RootController::health_check().await
}
