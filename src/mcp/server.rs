//! MCP server
//!
//! Line-delimited JSON-RPC over any async reader/writer pair; `serve_stdio`
//! binds it to the process's stdin and stdout.

use async_trait::async_trait;
use itertools::Itertools;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::mcp::protocol::{
    CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
    JSONRPC_VERSION, JsonRpcError, JsonRpcErrorResponse, JsonRpcMessage, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId, SUPPORTED_PROTOCOL_VERSIONS,
    ServerCapabilities, Tool, ToolsCapability,
};
use crate::{FaqError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

/// Executes one tool call.
///
/// Failures the model should see (bad arguments, empty results) belong in a
/// [`CallToolResult::error`]; an `Err` becomes a JSON-RPC error response.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult>;
}

pub struct McpServer {
    server_info: Implementation,
    capabilities: ServerCapabilities,
    instructions: Option<String>,
    tools: RwLock<HashMap<String, Tool>>,
    tool_handlers: RwLock<HashMap<String, Arc<dyn ToolHandler>>>,
    connection_state: RwLock<ConnectionState>,
}

impl McpServer {
    #[inline]
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            server_info: Implementation {
                name: name.to_string(),
                version: version.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            instructions: None,
            tools: RwLock::new(HashMap::new()),
            tool_handlers: RwLock::new(HashMap::new()),
            connection_state: RwLock::new(ConnectionState::Uninitialized),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.instructions = Some(instructions.to_string());
        self
    }

    #[inline]
    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    /// Register `handler` under `tool.name`, replacing any earlier tool of
    /// that name.
    #[inline]
    pub async fn register_tool<H>(&self, tool: Tool, handler: H)
    where
        H: ToolHandler + 'static,
    {
        let tool_name = tool.name.clone();
        self.tools.write().await.insert(tool_name.clone(), tool);
        self.tool_handlers
            .write()
            .await
            .insert(tool_name.clone(), Arc::new(handler));
        debug!("Registered tool: {}", tool_name);
    }

    #[inline]
    pub async fn connection_state(&self) -> ConnectionState {
        *self.connection_state.read().await
    }

    #[inline]
    pub async fn serve_stdio(&self) -> Result<()> {
        info!("Starting MCP server with stdio transport");
        self.serve(BufReader::new(io::stdin()), io::stdout()).await
    }

    /// Answer newline-delimited messages from `reader` until EOF.
    #[inline]
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(reply) = self.handle_line(&line).await {
                        send_message(&mut writer, &reply).await?;
                    }
                }
                Ok(None) => {
                    info!("EOF reached, closing connection");
                    break;
                }
                Err(e) => {
                    error!("Error reading from transport: {}", e);
                    break;
                }
            }
        }

        *self.connection_state.write().await = ConnectionState::Closed;
        info!("MCP server stopped");
        Ok(())
    }

    /// Process one raw line; returns the reply to send, if any.
    #[inline]
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcMessage> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let raw: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to parse JSON: {}", e);
                return Some(error_message(JsonRpcError::parse_error(), None));
            }
        };
        let id = raw
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

        let message: JsonRpcMessage = match serde_json::from_value(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!("Not a JSON-RPC message: {}", e);
                return Some(error_message(JsonRpcError::invalid_request(), id));
            }
        };
        if message.jsonrpc() != JSONRPC_VERSION {
            return Some(error_message(JsonRpcError::invalid_request(), id));
        }

        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(&notification).await;
                None
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::ErrorResponse(_) => {
                warn!("Received unexpected response message from client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        debug!("Request {}: {:?}", request.method, request.id);
        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "tools/list" => self.handle_list_tools().await,
            "tools/call" => self.handle_call_tool(request.params).await,
            "ping" => Ok(json!({})),
            other => {
                return error_message(JsonRpcError::method_not_found(other), Some(request.id));
            }
        };

        match result {
            Ok(result) => JsonRpcMessage::Response(JsonRpcResponse::new(result, request.id)),
            Err(FaqError::Mcp(message)) => {
                warn!("Rejected {} request: {}", request.method, message);
                error_message(JsonRpcError::invalid_params(message), Some(request.id))
            }
            Err(e) => {
                error!("Error handling request {}: {}", request.method, e);
                error_message(JsonRpcError::internal_error(e.to_string()), Some(request.id))
            }
        }
    }

    async fn handle_notification(&self, notification: &JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" | "initialized" => {
                *self.connection_state.write().await = ConnectionState::Ready;
                info!("Server ready to handle requests");
            }
            "notifications/cancelled" => debug!("Received cancellation notification"),
            other => warn!("Unknown notification method: {}", other),
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> Result<Value> {
        let params: InitializeParams = params
            .ok_or_else(|| FaqError::Mcp("Initialize request missing parameters".to_string()))
            .and_then(|params| {
                serde_json::from_value(params)
                    .map_err(|e| FaqError::Mcp(format!("Invalid initialize parameters: {}", e)))
            })?;

        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&params.protocol_version.as_str()) {
            return Err(FaqError::Mcp(format!(
                "Unsupported protocol version: {}. Supported: {}",
                params.protocol_version,
                SUPPORTED_PROTOCOL_VERSIONS.join(", ")
            )));
        }

        *self.connection_state.write().await = ConnectionState::Initializing;
        info!(
            "Client initialized: {} {} (protocol {})",
            params.client_info.name, params.client_info.version, params.protocol_version
        );

        let result = InitializeResult {
            protocol_version: params.protocol_version,
            capabilities: self.capabilities.clone(),
            server_info: self.server_info.clone(),
            instructions: self.instructions.clone(),
        };
        Ok(serde_json::to_value(result)?)
    }

    async fn handle_list_tools(&self) -> Result<Value> {
        let tools = self
            .tools
            .read()
            .await
            .values()
            .cloned()
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect();
        Ok(serde_json::to_value(ListToolsResult { tools })?)
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let params: CallToolParams = params
            .ok_or_else(|| FaqError::Mcp("Tool call request missing parameters".to_string()))
            .and_then(|params| {
                serde_json::from_value(params)
                    .map_err(|e| FaqError::Mcp(format!("Invalid tool call parameters: {}", e)))
            })?;

        // Clone the handler out so the lock is not held across the call
        let handler = self
            .tool_handlers
            .read()
            .await
            .get(&params.name)
            .map(Arc::clone)
            .ok_or_else(|| FaqError::Mcp(format!("Tool not found: {}", params.name)))?;

        debug!("Calling tool {}", params.name);
        let result = handler.handle(params).await?;
        Ok(serde_json::to_value(result)?)
    }
}

fn error_message(error: JsonRpcError, id: Option<RequestId>) -> JsonRpcMessage {
    JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(error, id))
}

async fn send_message<W>(writer: &mut W, message: &JsonRpcMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(message)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
