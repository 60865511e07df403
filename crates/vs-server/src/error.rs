//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`vs_core::Error`] so that route handlers
//! can return `Result<T, AppError>` directly.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use vs_core::range::unsatisfied_content_range;

/// Wrapper so we can implement `IntoResponse` for an external type.
pub struct AppError {
    inner: vs_core::Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: vs_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }
}

impl From<vs_core::Error> for AppError {
    fn from(e: vs_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                request_id = self.request_id.as_deref().unwrap_or("-"),
                "Server error in video handler"
            );
        } else {
            tracing::debug!(status = %status, error = %self.inner, "Rejected request");
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.inner.code(),
            "request_id": self.request_id,
        });

        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            if let Some(total) = self.inner.unsatisfied_total() {
                if let Ok(value) = HeaderValue::from_str(&unsatisfied_content_range(total)) {
                    response.headers_mut().insert(header::CONTENT_RANGE, value);
                }
            }
        }
        response
    }
}
