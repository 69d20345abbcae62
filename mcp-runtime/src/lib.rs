//! Model Context Protocol runtime and tool surface for the Personalize
//! adapter.
//!
//! Handles JSON-RPC 2.0 messages over stdio (Content-Length framing) and on
//! behalf of the HTTP transports, exposes the declarative tool table, and
//! dispatches each tool call through a freshly built tenant client into the
//! personalization facade. The client is reconstructed from the
//! request-scoped credential headers on every invocation and passed
//! explicitly into the facade, so handlers stay pure and testable.

pub mod facade;

use serde_json::{Map, Value, json};
use tokio::io::{self, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

use personalize_core::credentials::CredentialParts;
use personalize_core::flows::{ExperienceSpec, FlowDefinition};
use personalize_core::outcome::ToolOutcome;
use personalize_sdk::Client;

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const MCP_SERVER_NAME: &str = "sitecore-personalize-mcp";

/// Per-request (HTTP) or per-session (stdio) runtime configuration: the
/// extracted credential values the tenant client is built from.
#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    pub credentials: CredentialParts,
}

pub struct McpServer {
    config: RuntimeConfig,
}

/// Entry point for the HTTP transports: run one incoming JSON-RPC payload
/// (single message or batch) against a server configured with the request's
/// credential headers. Notifications produce no response values.
pub async fn handle_http_jsonrpc(credentials: CredentialParts, incoming: Value) -> Vec<Value> {
    let server = McpServer::new(RuntimeConfig { credentials });
    server.handle_incoming_message(incoming).await
}

impl McpServer {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    /// Serve MCP over stdio until EOF, one framed JSON-RPC message at a
    /// time.
    pub async fn serve_stdio(&self) -> Result<(), String> {
        let stdin = io::stdin();
        let mut reader = BufReader::new(stdin);
        let mut stdout = io::stdout();

        loop {
            let incoming = read_framed_json(&mut reader)
                .await
                .map_err(|e| format!("Failed to read MCP message: {e}"))?;
            let Some(incoming) = incoming else {
                break;
            };

            let responses = self.handle_incoming_message(incoming).await;
            for response in responses {
                write_framed_json(&mut stdout, &response)
                    .await
                    .map_err(|e| format!("Failed to write MCP response: {e}"))?;
            }
        }

        Ok(())
    }

    pub async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // Most likely a client response; this server issues no outbound
            // requests.
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        if let Some(id) = obj.get("id").cloned() {
            let result = self.handle_request(method, params).await;
            Some(match result {
                Ok(payload) => success_response(id, payload),
                Err(err) => error_response(id, err),
            })
        } else {
            self.handle_notification(method).await;
            None
        }
    }

    async fn handle_notification(&self, method: &str) {
        if matches!(
            method,
            "notifications/initialized" | "notifications/cancelled"
        ) {
            return;
        }
        // Unknown notifications are intentionally ignored.
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "prompts/list" => Ok(json!({ "prompts": [] })),
            "resources/list" => Ok(json!({ "resources": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                },
                "prompts": {
                    "listChanged": false
                },
                "resources": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": "Tools for managing Sitecore Personalize experiences. Tenant credentials travel with each request: send the x-sitecore-client-id, x-sitecore-client-secret and x-sitecore-region headers on the HTTP transports, or pass flags/environment on stdio."
        })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        tracing::debug!(tool = name, "tool invoked");
        Ok(match self.execute_tool(name, &args).await {
            Ok(response) => response,
            Err(err) => error_content_response(&err),
        })
    }

    /// Build the per-request tenant client from the extracted credential
    /// values. Fails closed, before any network call, when a value is
    /// missing.
    fn build_client(&self) -> Result<Client, ToolError> {
        let credentials = self.config.credentials.resolve().map_err(|err| {
            ToolError::new("missing_credentials", err.to_string()).with_docs_hint(
                "Send the x-sitecore-client-id, x-sitecore-client-secret and x-sitecore-region headers with the request.",
            )
        })?;
        Client::new(credentials)
            .map_err(|err| ToolError::new("missing_credentials", err.to_string()))
    }

    async fn execute_tool(
        &self,
        name: &str,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        match name {
            "echo" => self.tool_echo(args),
            "list_personalization_experiences" => self.tool_list_experiences().await,
            "get_personalization_experience" => self.tool_get_experience(args).await,
            "create_personalize_experience" => self.tool_create_experience(args).await,
            _ => Err(ToolError::new(
                "unknown_tool",
                format!("Unknown tool: {name}"),
            )),
        }
    }

    fn tool_echo(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let message = required_string(args, "message")?;
        let text = format!("Echo: {message}");
        Ok(json!({
            "content": [{ "type": "text", "text": text }],
            "structuredContent": { "message": message, "echo": text }
        }))
    }

    async fn tool_list_experiences(&self) -> Result<Value, ToolError> {
        let client = self.build_client()?;
        let outcome = facade::list_experiences(&client).await;
        Ok(outcome_content_response(&outcome))
    }

    async fn tool_get_experience(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let reference = required_string(args, "ref")?;
        let client = self.build_client()?;
        let outcome = facade::get_experience_by_ref(&reference, &client).await;
        Ok(outcome_content_response(&outcome))
    }

    async fn tool_create_experience(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let spec: ExperienceSpec =
            serde_json::from_value(Value::Object(args.clone())).map_err(|err| {
                ToolError::new(
                    "validation_failed",
                    format!("Invalid create arguments: {err}"),
                )
                .with_field("arguments")
            })?;

        // Shape validation precedes client construction so enum errors
        // surface without touching credentials or the network.
        let definition = match facade::plan_experience(&spec) {
            Ok(definition) => definition,
            Err(outcome) => return Ok(create_content_response(&outcome, None)),
        };

        let client = self.build_client()?;
        let outcome = facade::create_experience(&definition, &client).await;
        Ok(create_content_response(&outcome, Some(&definition)))
    }
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }
}

/// A tool-layer failure that must surface as an error content envelope,
/// never as a protocol error tearing down the session.
#[derive(Debug, Clone)]
pub struct ToolError {
    code: String,
    message: String,
    field: Option<String>,
    docs_hint: Option<String>,
}

impl ToolError {
    fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
            docs_hint: None,
        }
    }

    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    fn with_docs_hint(mut self, docs_hint: impl Into<String>) -> Self {
        self.docs_hint = Some(docs_hint.into());
        self
    }

    fn to_value(&self) -> Value {
        let mut payload = json!({
            "error": self.code,
            "message": self.message
        });
        if let Some(field) = &self.field {
            payload["field"] = Value::String(field.clone());
        }
        if let Some(docs_hint) = &self.docs_hint {
            payload["docs_hint"] = Value::String(docs_hint.clone());
        }
        payload
    }
}

#[derive(Debug)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "echo",
            description: "Echo back the input message for connectivity testing.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message": { "type": "string" }
                },
                "required": ["message"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "list_personalization_experiences",
            description: "List the personalization experiences and experiments on the tenant (first page).",
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "get_personalization_experience",
            description: "Fetch a single experience or experiment by reference (id or friendly id).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ref": { "type": "string", "description": "Flow reference: id or friendly id" }
                },
                "required": ["ref"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "create_personalize_experience",
            description: "Create a draft personalization experience, optionally with a default variant built from the supplied assets.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "type": { "type": "string", "enum": ["Web", "API", "Triggered"] },
                    "channels": {
                        "type": "array",
                        "minItems": 1,
                        "items": {
                            "type": "string",
                            "enum": ["Call Center", "Email", "Mobile App", "Mobile Web", "Web", "SMS"]
                        }
                    },
                    "assets": {
                        "type": "object",
                        "properties": {
                            "html": { "type": "string" },
                            "css": { "type": "string" },
                            "javascript": { "type": "string" },
                            "freemarker": { "type": "string" }
                        },
                        "additionalProperties": false
                    }
                },
                "required": ["name", "type", "channels"],
                "additionalProperties": false
            }),
        },
    ]
}

fn tools_list_payload() -> Value {
    let tools: Vec<Value> = tool_definitions()
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "inputSchema": tool.input_schema,
            })
        })
        .collect();
    json!({ "tools": tools })
}

/// Wrap a facade outcome in the transport content envelope: one text block
/// holding the outcome JSON, mirrored as structured content.
fn outcome_content_response(outcome: &ToolOutcome) -> Value {
    let envelope = outcome.to_value();
    let mut response = json!({
        "content": [{ "type": "text", "text": to_pretty_json(&envelope) }],
        "structuredContent": envelope,
    });
    if !outcome.is_success() {
        response["isError"] = json!(true);
    }
    response
}

/// The creation tool additionally mirrors the definition that was (or would
/// have been) submitted, so callers can inspect exactly what was built.
fn create_content_response(outcome: &ToolOutcome, definition: Option<&FlowDefinition>) -> Value {
    let mut structured = Map::new();
    structured.insert("success".to_string(), json!(outcome.is_success()));
    structured.insert("message".to_string(), json!(outcome.message));
    if let Some(data) = &outcome.data {
        structured.insert("data".to_string(), data.clone());
    }
    structured.insert(
        "experienceData".to_string(),
        definition
            .and_then(|d| serde_json::to_value(d).ok())
            .unwrap_or(Value::Null),
    );

    let text = match (outcome.is_success(), definition) {
        (true, Some(definition)) => format!(
            "Created personalization experience \"{}\" (friendly id {}).",
            definition.name, definition.friendly_id
        ),
        _ => outcome.message.clone(),
    };

    let mut response = json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": Value::Object(structured),
    });
    if !outcome.is_success() {
        response["isError"] = json!(true);
    }
    response
}

fn error_content_response(err: &ToolError) -> Value {
    let payload = err.to_value();
    json!({
        "isError": true,
        "content": [{ "type": "text", "text": to_pretty_json(&payload) }],
        "structuredContent": payload
    })
}

fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    let value = args
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if value.is_empty() {
        return Err(ToolError::new(
            "validation_failed",
            format!("Missing required string field '{key}'"),
        )
        .with_field(key));
    }
    Ok(value.to_string())
}

fn success_response(id: Value, payload: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": payload
    })
}

fn error_response(id: Value, err: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": err.code,
            "message": err.message
        }
    })
}

async fn read_framed_json(
    reader: &mut BufReader<tokio::io::Stdin>,
) -> Result<Option<Value>, std::io::Error> {
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if content_length.is_none() {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }

        if line == "\r\n" {
            break;
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.to_ascii_lowercase().starts_with("content-length:") {
            let raw_len = line
                .split_once(':')
                .map(|(_, right)| right.trim())
                .unwrap_or_default();
            let parsed = raw_len.parse::<usize>().map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Invalid Content-Length header",
                )
            })?;
            content_length = Some(parsed);
        }
    }

    let content_length = content_length.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Missing Content-Length header",
        )
    })?;

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;
    serde_json::from_slice(&body).map(Some).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Invalid JSON body: {e}"),
        )
    })
}

async fn write_framed_json(
    writer: &mut tokio::io::Stdout,
    value: &Value,
) -> Result<(), std::io::Error> {
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    let header = format!(
        "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
        body.len()
    );
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
