mod cards;
mod health;
mod levels;
mod stats;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::db::StoreError;
use crate::middleware::auth::require_auth;
use crate::response::{json_error, AppError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/cards/next", get(cards::next_card))
        .route("/cards/:card_id/review", post(cards::review_card))
        .route("/stats", get(stats::user_stats))
        .route("/stats/today", get(stats::today_stats))
        .route("/levels", get(levels::list_levels))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/api/v1", api)
        .nest("/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

/// Storage failures from read paths
pub(crate) fn storage_error(err: StoreError) -> AppError {
    match err {
        StoreError::Unavailable(msg) => {
            tracing::warn!(error = %msg, "storage unavailable");
            AppError::unavailable("El servicio no está disponible, inténtalo de nuevo")
        }
        other => AppError::internal(other.to_string()),
    }
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Recurso no encontrado").into_response()
}
