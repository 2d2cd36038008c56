use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::response::AppError;
use crate::services::scheduler::SchedulerError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct ReviewRequest {
    rating: u8,
}

pub(super) async fn next_card(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, AppError> {
    let next = state
        .sessions()
        .next_card(&user.id, Utc::now())
        .await
        .map_err(scheduler_error)?;
    Ok(Json(next).into_response())
}

pub(super) async fn review_card(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(card_id): Path<String>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected review body");
        AppError::validation("El cuerpo debe ser {\"rating\": 1-4}")
    })?;

    let result = state
        .sessions()
        .review_card(&user.id, &card_id, request.rating, Utc::now())
        .await
        .map_err(scheduler_error)?;
    Ok(Json(result).into_response())
}

fn scheduler_error(err: SchedulerError) -> AppError {
    match err {
        SchedulerError::InvalidRating(value) => AppError::bad_request(
            "INVALID_RATING",
            format!("La calificación debe estar entre 1 y 4 (recibido {value})"),
        ),
        SchedulerError::StaleReview(_) => AppError::conflict(
            "STALE_REVIEW",
            "Esta tarjeta ya no está activa, pide la siguiente",
        ),
        SchedulerError::NotFound(card_id) => {
            AppError::not_found(format!("Tarjeta no encontrada: {card_id}"))
        }
        SchedulerError::ConflictWriteFailed => AppError::conflict(
            "CONFLICT",
            "La tarjeta se actualizó al mismo tiempo, inténtalo de nuevo",
        ),
        SchedulerError::StorageUnavailable(msg) => {
            tracing::warn!(error = %msg, "storage unavailable");
            AppError::unavailable("El servicio no está disponible, inténtalo de nuevo")
        }
        other @ (SchedulerError::InvalidState(_) | SchedulerError::Storage(_)) => {
            AppError::internal(other.to_string())
        }
    }
}
