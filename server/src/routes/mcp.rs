//! Single-shot transport: one JSON-RPC payload per HTTP request.
//!
//! Headers are extracted fresh on every request and handed to the runtime
//! as that request's credential context; nothing is kept afterwards.

use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::any;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::headers::{credential_parts, redacted_headers};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/mcp", any(mcp_entry))
}

async fn mcp_entry(method: Method, headers: HeaderMap, body: Bytes) -> Response {
    if method != Method::POST {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let request_id = Uuid::now_v7();
    tracing::debug!(
        request_id = %request_id,
        headers = ?redacted_headers(&headers),
        "handling MCP request"
    );

    let credentials = credential_parts(&headers);

    let incoming: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => {
            return (
                StatusCode::OK,
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": {
                        "code": -32700,
                        "message": "Parse error"
                    }
                })),
            )
                .into_response();
        }
    };

    let responses = personalize_mcp_runtime::handle_http_jsonrpc(credentials, incoming).await;

    if responses.is_empty() {
        return StatusCode::ACCEPTED.into_response();
    }

    if responses.len() == 1 {
        return (
            StatusCode::OK,
            Json(responses.into_iter().next().unwrap_or(Value::Null)),
        )
            .into_response();
    }

    (StatusCode::OK, Json(Value::Array(responses))).into_response()
}

#[cfg(test)]
mod tests {
    use super::mcp_entry;
    use axum::body::{Bytes, to_bytes};
    use axum::http::{HeaderMap, Method, StatusCode};
    use serde_json::{Value, json};

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn non_post_methods_are_rejected() {
        let response = mcp_entry(Method::GET, HeaderMap::new(), Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn malformed_body_yields_a_jsonrpc_parse_error() {
        let response = mcp_entry(
            Method::POST,
            HeaderMap::new(),
            Bytes::from_static(b"{not json"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn single_request_gets_a_single_response_object() {
        let body = serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": { "name": "echo", "arguments": { "message": "hi" } }
        }))
        .unwrap();
        let response = mcp_entry(Method::POST, HeaderMap::new(), Bytes::from(body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["result"]["content"][0]["text"], "Echo: hi");
    }

    #[tokio::test]
    async fn notifications_are_accepted_without_a_body() {
        let body = serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        }))
        .unwrap();
        let response = mcp_entry(Method::POST, HeaderMap::new(), Bytes::from(body)).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn headerless_tool_calls_still_reach_the_runtime() {
        // Missing credentials must surface as a tool error envelope, not a
        // transport failure.
        let body = serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "id": 9,
            "method": "tools/call",
            "params": { "name": "list_personalization_experiences", "arguments": {} }
        }))
        .unwrap();
        let response = mcp_entry(Method::POST, HeaderMap::new(), Bytes::from(body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["result"]["isError"], true);
        assert_eq!(
            payload["result"]["structuredContent"]["error"],
            "missing_credentials"
        );
    }
}
