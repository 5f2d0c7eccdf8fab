use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use gatehouse_core::DomainError;
use gatehouse_kernel::{ActionError, DispatchError, GuardError, HandleError, StoreError};

pub fn status_for(err: &HandleError) -> StatusCode {
    match err {
        HandleError::Dispatch(DispatchError::NotFound { .. } | DispatchError::UnknownArea(_)) => StatusCode::NOT_FOUND,
        HandleError::Guard(e) => match e {
            GuardError::MissingToken => StatusCode::BAD_REQUEST,
            GuardError::TokenMismatch => StatusCode::FORBIDDEN,
            GuardError::NoSession => StatusCode::UNAUTHORIZED,
            GuardError::InsufficientRole { .. } => StatusCode::FORBIDDEN,
            GuardError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        },
        HandleError::Hook(_) => StatusCode::INTERNAL_SERVER_ERROR,
        HandleError::Action(e) => match e {
            ActionError::Domain(DomainError::Validation(_) | DomainError::InvalidId(_)) => StatusCode::BAD_REQUEST,
            ActionError::Domain(DomainError::NotFound(_)) => StatusCode::NOT_FOUND,
            ActionError::Domain(DomainError::Conflict(_)) => StatusCode::CONFLICT,
            ActionError::Domain(DomainError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            ActionError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ActionError::Store(_) | ActionError::Credentials(_) | ActionError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
    }
}

/// Map a kernel failure onto the JSON error shape.
///
/// Server-side failures are logged in full but answered with a generic message.
pub fn handle_error_to_response(err: &HandleError) -> axum::response::Response {
    let status = status_for(err);
    if status.is_server_error() {
        tracing::error!(code = err.code(), error = %err, "action failed");
        return json_error(status, err.code(), "internal error");
    }
    json_error(status, err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
