use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::schemas::ErrorResponse;

/// Replaces the body of 500 responses with a generic envelope so that
/// database and hashing details never leave the process in production.
pub async fn hide_internal_details(response: Response) -> Response {
    if response.status() != StatusCode::INTERNAL_SERVER_ERROR {
        return response;
    }

    let body = ErrorResponse {
        success: false,
        message: "Internal server error".to_string(),
        code: "INTERNAL_ERROR".to_string(),
        errors: None,
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
