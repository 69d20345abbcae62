use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Dispatcher-level failure. Business failures never reach this type: tool
/// handlers always resolve to content envelopes, so only transport wiring
/// problems end up here.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("SSE session {0} closed while relaying a response")]
    SessionClosed(String),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        tracing::error!("dispatcher error: {self}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error processing request: {self}"),
        )
            .into_response()
    }
}
