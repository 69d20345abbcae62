//! Streaming transport: an SSE channel per session plus a message post
//! endpoint.
//!
//! `GET /sse` opens the stream, stores the request's credential headers as
//! the session's props, and announces the message endpoint for the session.
//! `POST /sse/message?sessionId=` feeds JSON-RPC messages in; responses are
//! relayed back over the stream as `message` events.

use std::convert::Infallible;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use personalize_core::credentials::CredentialParts;

use crate::error::DispatchError;
use crate::headers::{credential_parts, redacted_headers};
use crate::state::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sse", get(sse_open))
        .route("/sse/message", post(sse_message))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionQuery {
    session_id: String,
}

async fn sse_open(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::now_v7().to_string();
    let credentials = credential_parts(&headers);

    tracing::info!(
        session_id = %session_id,
        headers = ?redacted_headers(&headers),
        "SSE client connected"
    );

    let receiver = state.open_session(&session_id, credentials);

    // First event tells the client where to post its messages; afterwards
    // the stream carries relayed JSON-RPC responses.
    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/sse/message?sessionId={session_id}"));

    let responses = ReceiverStream::new(receiver)
        .map(|message| Event::default().event("message").data(message.to_string()));

    let stream = tokio_stream::once(endpoint)
        .chain(responses)
        .map(Ok::<Event, Infallible>);

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

async fn sse_message(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match relay_message(&state, &query.session_id, &headers, &body).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Run one posted message through the runtime and push its responses onto
/// the session's stream.
async fn relay_message(
    state: &AppState,
    session_id: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, DispatchError> {
    let Some(session) = state.session(session_id) else {
        tracing::debug!(session_id, "message for unknown SSE session");
        return Ok((StatusCode::NOT_FOUND, "Not found").into_response());
    };

    let credentials = effective_credentials(&session.credentials, credential_parts(headers));

    let incoming: Value = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(_) => {
            let parse_error = json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": {
                    "code": -32700,
                    "message": "Parse error"
                }
            });
            if !session.relay(parse_error).await {
                state.close_session(session_id);
            }
            return Ok(StatusCode::ACCEPTED.into_response());
        }
    };

    let responses = personalize_mcp_runtime::handle_http_jsonrpc(credentials, incoming).await;
    for response in responses {
        if !session.relay(response).await {
            state.close_session(session_id);
            return Err(DispatchError::SessionClosed(session_id.to_string()));
        }
    }

    Ok(StatusCode::ACCEPTED.into_response())
}

/// A message request carrying its own credential headers overrides the ones
/// captured when the session was opened; otherwise the session's stored
/// props apply.
fn effective_credentials(
    session_parts: &CredentialParts,
    request_parts: CredentialParts,
) -> CredentialParts {
    if request_parts.is_empty() {
        session_parts.clone()
    } else {
        request_parts
    }
}
