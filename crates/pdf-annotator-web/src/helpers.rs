//! Helper types and traits for cleaner route handlers.
//!
//! Provides extension traits for converting `Result` types into
//! HTTP-appropriate error responses, reducing boilerplate in routes.

use axum::http::StatusCode;
use tracing::error;

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, (StatusCode, String)>;

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }
}

/// Extension trait for annotator results.
pub trait CoreResultExt<T> {
    /// Bad input maps to 400, everything else to 500.
    fn or_status(self) -> RouteResult<T>;
}

impl<T> CoreResultExt<T> for pdf_annotator_core::Result<T> {
    fn or_status(self) -> RouteResult<T> {
        self.map_err(|e| {
            let status = if e.is_input_error() {
                StatusCode::BAD_REQUEST
            } else {
                error!("Annotation failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string())
        })
    }
}
