use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::{self, AuthError};
use crate::response::AppError;
use crate::state::AppState;

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = auth::extract_token(req.headers()) else {
        return AppError::unauthorized("No se proporcionó un token de autenticación")
            .into_response();
    };

    match auth::authenticate(&token, state.config().jwt_secret.as_deref()) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!(error = %err, "rejected bearer token");
            let message = match err {
                AuthError::Expired => "La sesión expiró, inicia sesión de nuevo",
                _ => "Autenticación fallida, inicia sesión de nuevo",
            };
            AppError::unauthorized(message).into_response()
        }
    }
}
