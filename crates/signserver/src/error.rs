use axum::http::StatusCode;
use axum_core::response::{IntoResponse as AxumCoreIntoResponse, Response};
use tracing::error;

use crate::config::FatalError;
use crate::worker::WorkerIdentifier;

#[derive(Debug, thiserror::Error)]
pub enum SignServerError {
    #[error("No such worker: {0}")]
    UnknownWorker(WorkerIdentifier),
    #[error("Worker already exists: {0}")]
    DuplicateWorker(WorkerIdentifier),
    /// Fail-closed refusal: the worker has fatal configuration errors.
    #[error("Worker is misconfigured: {}", .errors.join("; "))]
    Misconfigured { worker: String, errors: Vec<FatalError> },
    #[error("Crypto token is offline for worker {0}")]
    CryptoTokenOffline(String),
    /// Failure inside the signer or document format, passed through as is.
    #[error("Signing backend failure: {0:#}")]
    SigningBackend(anyhow::Error),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Trait implementation to convert this error into an axum http response
impl AxumCoreIntoResponse for SignServerError {
    fn into_response(self) -> Response {
        match self {
            unknown @ SignServerError::UnknownWorker(_) => {
                (StatusCode::NOT_FOUND, unknown.to_string()).into_response()
            }
            duplicate @ SignServerError::DuplicateWorker(_) => {
                (StatusCode::CONFLICT, duplicate.to_string()).into_response()
            }
            refused @ (SignServerError::Misconfigured { .. }
            | SignServerError::CryptoTokenOffline(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, refused.to_string()).into_response()
            }
            invalid @ SignServerError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, invalid.to_string()).into_response()
            }
            SignServerError::SigningBackend(source) => {
                error!(error = %format!("{source:#}"), "Signing backend failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something wrong happened.",
                )
                    .into_response()
            }
        }
    }
}
