//! MCP server loop: read JSON-RPC frames from stdin, write responses to
//! stdout.
//!
//! Requests are handled sequentially in arrival order; each merge operation
//! runs its whole check-resolve-mutate-report sequence before the next
//! request is read, so invocations never overlap within one server process.

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use mergeflow_core::config::AppConfig;
use mergeflow_core::workflow::MergeEngine;

use crate::protocol::{
    Request, Response, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND,
    PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::tools::{dispatch_tool, tool_definitions, ToolError};

/// The MCP server.
pub struct McpServer {
    engine: MergeEngine,
    config: AppConfig,
}

impl McpServer {
    pub fn new(engine: MergeEngine, config: AppConfig) -> Self {
        Self { engine, config }
    }

    /// Serve requests from stdin until EOF.
    pub async fn run(&self) -> anyhow::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let mut lines = stdin.lines();

        info!("serving MCP requests on stdio");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                stdout.write_all(response.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handle one raw frame. Returns the serialized response, or `None` for
    /// notifications.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let request: Request = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                warn!(error = %e, "unparseable frame");
                let resp = Response::error(Value::Null, PARSE_ERROR, format!("parse error: {}", e));
                return serde_json::to_string(&resp).ok();
            }
        };

        let response = self.handle_request(request).await?;
        serde_json::to_string(&response).ok()
    }

    async fn handle_request(&self, req: Request) -> Option<Response> {
        debug!(method = %req.method, "handling request");

        if req.is_notification() {
            // notifications/initialized and friends need no reply.
            return None;
        }
        let id = req.id.clone().unwrap_or(Value::Null);

        if req.jsonrpc != JSONRPC_VERSION {
            return Some(Response::error(
                id,
                INVALID_REQUEST,
                format!("unsupported jsonrpc version: {:?}", req.jsonrpc),
            ));
        }

        let response = match req.method.as_str() {
            "initialize" => Response::success(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": "mergeflow",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            ),
            "ping" => Response::success(id, json!({})),
            "tools/list" => Response::success(id, json!({ "tools": tool_definitions() })),
            "tools/call" => self.handle_tool_call(id, &req.params).await,
            other => {
                warn!(method = other, "unknown method");
                Response::error(id, METHOD_NOT_FOUND, format!("method not found: {}", other))
            }
        };
        Some(response)
    }

    async fn handle_tool_call(&self, id: Value, params: &Value) -> Response {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return Response::error(id, INVALID_PARAMS, "tools/call requires a tool name");
        };
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match dispatch_tool(&self.engine, &self.config, name, arguments).await {
            // Merge failures are descriptive text, not protocol errors: the
            // tool contract is "always returns a string, never throws".
            Ok(text) => Response::success(
                id,
                json!({
                    "content": [{ "type": "text", "text": text }],
                    "isError": false,
                }),
            ),
            Err(e @ ToolError::UnknownTool(_)) => {
                Response::error(id, INVALID_PARAMS, e.to_string())
            }
            Err(e @ ToolError::InvalidParams(_)) => {
                Response::error(id, INVALID_PARAMS, e.to_string())
            }
        }
    }
}
