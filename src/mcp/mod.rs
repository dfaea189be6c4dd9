//! MCP (Model Context Protocol) server implementation.
//!
//! This module provides:
//! - `todokv mcp serve` - Start stdio MCP server
//! - `todokv mcp manifest` - Output tool definitions
//!
//! The server speaks newline-delimited JSON-RPC 2.0. Every repository
//! operation is exposed as one `mcp_todo_*` tool.

pub mod jsonrpc;
pub mod tools;

use std::io::{BufRead, Write};

use serde_json::{Value, json};

use crate::storage::StoreConfig;
use crate::{Error, Result};
use jsonrpc::{
    INVALID_PARAMS, INVALID_REQUEST, JsonRpcRequest, METHOD_NOT_FOUND, PARSE_ERROR,
    json_rpc_error, json_rpc_response,
};

pub const MCP_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "todokv";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Request handler. Holds the store settings, never an open handle.
pub struct McpServer {
    store: StoreConfig,
}

impl McpServer {
    pub fn new(store: StoreConfig) -> Self {
        Self { store }
    }

    /// Handle one raw frame. `None` means nothing is written back.
    pub fn handle_line(&self, raw: &str) -> Option<Value> {
        let data: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                return Some(json_rpc_error(
                    None,
                    PARSE_ERROR,
                    &format!("Parse error: {e}"),
                ));
            }
        };

        let id = match data.as_object() {
            Some(obj) if obj.contains_key("method") => obj.get("id").cloned(),
            Some(obj) => {
                return Some(json_rpc_error(
                    obj.get("id").cloned(),
                    INVALID_REQUEST,
                    "Invalid Request",
                ));
            }
            None => return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request")),
        };

        match serde_json::from_value::<JsonRpcRequest>(data) {
            Ok(request) => self.handle(request),
            Err(e) => Some(json_rpc_error(
                id,
                INVALID_REQUEST,
                &format!("Invalid Request: {e}"),
            )),
        }
    }

    pub fn handle(&self, request: JsonRpcRequest) -> Option<Value> {
        let method = request.method.as_str();
        tracing::debug!(method, "mcp request");

        if request.is_notification() && method.starts_with("notifications/") {
            return None;
        }

        match method {
            "initialize" => Some(json_rpc_response(
                request.id,
                json!({
                    "protocolVersion": MCP_VERSION,
                    "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
                    "capabilities": { "tools": {} }
                }),
            )),
            "ping" => Some(json_rpc_response(request.id, json!({}))),
            "resources/list" => Some(json_rpc_response(request.id, json!({ "resources": [] }))),
            "tools/list" => Some(json_rpc_response(
                request.id,
                json!({ "tools": tools::tool_definitions() }),
            )),
            "tools/call" => {
                let Some(params) = request.params.as_ref().and_then(|p| p.as_object()) else {
                    return Some(json_rpc_error(
                        request.id,
                        INVALID_PARAMS,
                        "params must be an object",
                    ));
                };
                let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
                    return Some(json_rpc_error(
                        request.id,
                        INVALID_PARAMS,
                        "params.name must be a string",
                    ));
                };
                let args = params.get("arguments").cloned().unwrap_or(Value::Null);
                let response = tools::call_tool(&self.store, name, args);
                Some(json_rpc_response(request.id, response.to_value()))
            }
            _ if request.is_notification() => None,
            _ => Some(json_rpc_error(
                request.id,
                METHOD_NOT_FOUND,
                &format!("Method not found: {method}"),
            )),
        }
    }

    /// Answer frames from `reader` until EOF.
    pub fn serve_io<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> Result<()> {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line) {
                serde_json::to_writer(&mut writer, &response)?;
                writer.write_all(b"\n")?;
                writer.flush()?;
            }
        }
        Ok(())
    }
}

/// Start the MCP stdio server.
pub fn serve(store: StoreConfig) -> Result<()> {
    ctrlc::set_handler(|| {
        tracing::warn!("SIGINT received");
        std::process::exit(0);
    })
    .map_err(|e| Error::Other(format!("Failed to install SIGINT handler: {}", e)))?;

    tracing::info!(backend = %store.backend(), path = %store.path().display(), "mcp server listening on stdio");
    let server = McpServer::new(store);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    server.serve_io(stdin.lock(), stdout.lock())
}

/// The MCP tool manifest.
pub fn manifest() -> Value {
    json!({ "tools": tools::tool_definitions() })
}
