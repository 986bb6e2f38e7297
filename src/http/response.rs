//! Response construction.
//!
//! # Responsibilities
//! - Build the handful of response shapes the handler emits
//! - Keep content types in one place
//!
//! # Design Decisions
//! - Not-found and serialization failures carry an empty body
//! - An unrepresentable asset content type degrades to `application/octet-stream`

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

pub const CONTENT_TYPE_JSON_UTF8: &str = "application/json; charset=utf-8";
pub const CONTENT_TYPE_HTML_UTF8: &str = "text/html; charset=utf-8";
pub const CONTENT_TYPE_TEXT_UTF8: &str = "text/plain; charset=utf-8";

pub fn json(body: Bytes) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE_JSON_UTF8)],
        body,
    )
        .into_response()
}

pub fn html(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE_HTML_UTF8)],
        body,
    )
        .into_response()
}

pub fn asset(content_type: &str, body: Bytes) -> Response {
    let content_type = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
}

/// 500 with a plain-text explanation.
pub fn internal_error(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, CONTENT_TYPE_TEXT_UTF8)],
        message,
    )
        .into_response()
}

pub fn not_found() -> Response {
    empty(StatusCode::NOT_FOUND)
}

pub fn empty(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
