use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;

use crate::auth::AuthUser;
use crate::response::AppError;
use crate::state::AppState;

use super::storage_error;

pub(super) async fn user_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, AppError> {
    let stats = state
        .progress()
        .stats(&user.id, Utc::now())
        .await
        .map_err(storage_error)?;
    Ok(Json(stats).into_response())
}

pub(super) async fn today_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, AppError> {
    let stats = state
        .progress()
        .today_stats(&user.id, Utc::now())
        .await
        .map_err(storage_error)?;
    Ok(Json(stats).into_response())
}
