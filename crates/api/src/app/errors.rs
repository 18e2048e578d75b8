use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use chronicle_core::DomainError;
use chronicle_infra::{CommandError, QueryError};

pub fn command_error_to_response(err: CommandError) -> axum::response::Response {
    match err {
        CommandError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("user {id} not found"))
        }
        CommandError::Persistence(e) => {
            tracing::error!(error = %e, "command failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", e.to_string())
        }
        CommandError::Encode(e) => {
            tracing::error!(error = %e, "command failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "encode_error", e.to_string())
        }
    }
}

pub fn query_error_to_response(err: QueryError) -> axum::response::Response {
    match err {
        QueryError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("user {id} not found"))
        }
        QueryError::Persistence(e) => {
            tracing::error!(error = %e, "query failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", e.to_string())
        }
        QueryError::Decode(e) => {
            tracing::error!(error = %e, "stored event could not be decoded");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "decode_error", e.to_string())
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
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

/// Malformed body or query string.
pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "bad_request", message)
}
