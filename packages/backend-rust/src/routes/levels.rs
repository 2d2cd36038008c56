use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

use crate::auth::AuthUser;
use crate::response::AppError;
use crate::state::AppState;

use super::storage_error;

pub(super) async fn list_levels(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, AppError> {
    let levels = state
        .progress()
        .levels(&user.id)
        .await
        .map_err(storage_error)?;
    Ok(Json(levels).into_response())
}
