//! Axum request handlers for all service endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    ErrorResponse, HealthResponse, RevealResponse, ShareRequest, ShareResponse, StatusResponse,
};
use common::ServiceError;
use tracing::error;

use super::state::AppState;
use crate::secrets::{SecretService, SecretsError};

/// The one message for every secret that cannot be revealed.
const GONE: &str = "secret not found, expired, or already viewed";

/// `POST /secrets` — encrypt and store a secret, returning its token.
pub async fn share(State(state): State<AppState>, Json(req): Json<ShareRequest>) -> Response {
    if req.secret.is_empty() {
        return error_response(ServiceError::BadRequest("secret must not be empty".into()));
    }
    if req.secret.len() > state.max_secret_bytes {
        return error_response(ServiceError::BadRequest(format!(
            "secret exceeds {} bytes",
            state.max_secret_bytes
        )));
    }

    let ttl = req.ttl;
    let secret = req.secret;
    match blocking(state.secrets, move |secrets| secrets.share(&secret, ttl)).await {
        Ok(token) => {
            let body = ShareResponse {
                token,
                ttl,
                expires_in_secs: ttl.seconds(),
            };
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to store secret");
            error_response(ServiceError::Internal(e.to_string()))
        }
    }
}

/// `GET /secrets/{token}` — report whether a secret is waiting, without consuming it.
///
/// Safe for link-preview bots that fetch every URL they see.
pub async fn status(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    match blocking(state.secrets, move |secrets| secrets.is_available(&token)).await {
        Ok(true) => (StatusCode::OK, Json(StatusResponse { available: true })).into_response(),
        Ok(false) => error_response(ServiceError::NotFound(GONE.into())),
        Err(e) => {
            error!(error = %e, "failed to check secret");
            error_response(ServiceError::Internal(e.to_string()))
        }
    }
}

/// `POST /secrets/{token}/reveal` — consume and decrypt a secret.
///
/// Unknown, expired, consumed, malformed and forged tokens all produce the same
/// 404; the distinction is only logged.
pub async fn reveal(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    match blocking(state.secrets, move |secrets| secrets.reveal(&token)).await {
        Ok(Some(secret)) => (StatusCode::OK, Json(RevealResponse { secret })).into_response(),
        Ok(None) | Err(SecretsError::Cipher(_)) => {
            error_response(ServiceError::NotFound(GONE.into()))
        }
        Err(e) => {
            error!(error = %e, "failed to reveal secret");
            error_response(ServiceError::Internal(e.to_string()))
        }
    }
}

/// `GET /health` — liveness check.
pub async fn health(State(state): State<AppState>) -> Response {
    let body = HealthResponse {
        status: "ok".into(),
        backend: state.secrets.backend().into(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

/// Run a store-touching call off the async executor.
///
/// SQLite calls block; the join error only occurs if the closure panicked.
async fn blocking<T, F>(secrets: SecretService, f: F) -> Result<T, SecretsError>
where
    T: Send + 'static,
    F: FnOnce(SecretService) -> Result<T, SecretsError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(secrets))
        .await
        .map_err(|e| {
            SecretsError::Store(crate::store::StoreError::Backend(format!(
                "store task failed: {e}"
            )))
        })?
}

fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(&err))).into_response()
}
