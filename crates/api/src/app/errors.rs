use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use schoolbill_core::{Attributes, Error, ErrorKind};

/// Map a use case error to its HTTP response.
///
/// Technical failures were already logged with their cause where they
/// happened; the body only carries a generic message.
pub fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::Business | ErrorKind::AlreadyExists => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Technical => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        return json_error(status, err.code(), "Internal server error", Attributes::new());
    }

    json_error(status, err.code(), err.message(), err.attributes())
}

pub fn json_error(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
    attributes: Attributes,
) -> Response {
    (
        status,
        Json(json!({
            "code": code,
            "message": message.into(),
            "attributes": attributes,
        })),
    )
        .into_response()
}

/// `status` with the JSON body on success, the mapped error otherwise.
pub fn respond<T: Serialize>(status: StatusCode, result: Result<T, Error>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}
