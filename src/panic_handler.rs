use std::any::Any;

use axum::{
    body::Body,
    http::{header, Response, StatusCode},
};
use tracing::error;

use crate::schemas::ErrorResponse;

/// Turns a caught handler panic into the `INTERNAL_ERROR` envelope.
pub fn handle_panic(production: bool, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic message".to_string()
    };
    error!("Handler panicked: {}", details);

    let message = if production {
        "Internal server error".to_string()
    } else {
        format!("Internal server error: {}", details)
    };

    let body = ErrorResponse {
        success: false,
        message,
        code: "INTERNAL_ERROR".to_string(),
        errors: None,
    };
    let body = serde_json::to_vec(&body).unwrap_or_else(|_| {
        br#"{"success":false,"message":"Internal server error","code":"INTERNAL_ERROR"}"#.to_vec()
    });

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}
