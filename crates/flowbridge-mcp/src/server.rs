//! MCP server over newline-delimited JSON-RPC

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use crate::{
    adapter::ToolAdapter,
    jsonrpc::{
        error_response, success_response, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
        JsonRpcResponse, RequestId, JSONRPC_VERSION,
    },
    mcp::{
        CancelledNotification, Implementation, InitializeRequest, InitializeResponse,
        ProgressNotification, ServerCapabilities, ToolsCallRequest, ToolsCallResponse,
        ToolsCapability, ToolsListRequest, ToolsListResponse, LATEST_PROTOCOL_VERSION,
        METHOD_INITIALIZE, METHOD_PING, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
        NOTIFICATION_CANCELLED, NOTIFICATION_INITIALIZED, NOTIFICATION_PROGRESS,
        SUPPORTED_PROTOCOL_VERSIONS,
    },
    McpError, McpResult,
};

type Outbox = mpsc::UnboundedSender<String>;

/// MCP Server
#[derive(Clone)]
pub struct McpServer {
    adapter: Arc<ToolAdapter>,
    in_flight: Arc<Mutex<HashMap<RequestId, AbortHandle>>>,
}

impl McpServer {
    pub fn new(adapter: ToolAdapter) -> Self {
        Self { adapter: Arc::new(adapter), in_flight: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn adapter(&self) -> &ToolAdapter {
        &self.adapter
    }

    /// Process one inbound line. Responses and notifications go to `outbox`.
    async fn dispatch(&self, line: &str, outbox: &Outbox) {
        if line.starts_with('[') {
            error!("Rejecting batch request");
            send(
                outbox,
                &error_response(
                    None,
                    JsonRpcError::invalid_request()
                        .with_data(json!({"message": "Batch requests are not supported"})),
                ),
            );
            return;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to parse JSON-RPC message: {}", e);
                send(outbox, &error_response(None, JsonRpcError::parse_error()));
                return;
            }
        };

        let request: JsonRpcRequest = match serde_json::from_value(value.clone()) {
            Ok(request) => request,
            Err(e) => {
                error!("Invalid JSON-RPC request: {}", e);
                let id = value.get("id").cloned().and_then(|id| serde_json::from_value(id).ok());
                send(outbox, &error_response(id, JsonRpcError::invalid_request()));
                return;
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            send(
                outbox,
                &error_response(
                    request.id,
                    JsonRpcError::invalid_request()
                        .with_data(json!({"message": "Invalid JSON-RPC version"})),
                ),
            );
            return;
        }

        let Some(id) = request.id.clone() else {
            self.handle_notification(&request).await;
            return;
        };

        debug!("Processing method: {} (id {})", request.method, id);
        if request.method == METHOD_TOOLS_CALL {
            self.spawn_tool_call(id, request.params, outbox.clone()).await;
        } else {
            send(outbox, &self.handle_request(&request).await);
        }
    }

    /// Answer every request except `tools/call`, which runs as its own task.
    pub async fn handle_request(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let result = match request.method.as_str() {
            METHOD_INITIALIZE => self.handle_initialize(request),
            METHOD_PING => Ok(json!({})),
            METHOD_TOOLS_LIST => self.handle_tools_list(request),
            _ => {
                return error_response(
                    request.id.clone(),
                    JsonRpcError::method_not_found().with_data(json!({"method": request.method})),
                )
            }
        };

        match result {
            Ok(value) => success_response(request.id.clone(), value),
            Err(e) => {
                error!("Request '{}' failed: {}", request.method, e);
                error_response(request.id.clone(), e.to_jsonrpc_error())
            }
        }
    }

    async fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            NOTIFICATION_INITIALIZED => debug!("Client initialized"),
            NOTIFICATION_CANCELLED => {
                let params = request.params.clone().unwrap_or(Value::Null);
                match serde_json::from_value::<CancelledNotification>(params) {
                    Ok(cancel) => self.cancel(&cancel.request_id, cancel.reason.as_deref()).await,
                    Err(e) => warn!("Ignoring malformed cancellation: {}", e),
                }
            }
            other => debug!("Ignoring notification '{}'", other),
        }
    }

    async fn cancel(&self, id: &RequestId, reason: Option<&str>) {
        match self.in_flight.lock().await.remove(id) {
            Some(handle) => {
                handle.abort();
                info!("Cancelled tool call {} ({})", id, reason.unwrap_or("no reason given"));
            }
            None => debug!("Cancellation for unknown or finished request {}", id),
        }
    }

    fn handle_initialize(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        let params = request.params.as_ref().ok_or_else(|| {
            McpError::InvalidArguments("Missing params for initialize".to_string())
        })?;
        let init_request: InitializeRequest = serde_json::from_value(params.clone())?;

        let protocol_version =
            if SUPPORTED_PROTOCOL_VERSIONS.contains(&init_request.protocol_version.as_str()) {
                init_request.protocol_version
            } else {
                LATEST_PROTOCOL_VERSION.to_string()
            };
        if let Some(client) = &init_request.client_info {
            info!("Client {} {} connected ({})", client.name, client.version, protocol_version);
        }

        let response = InitializeResponse {
            protocol_version,
            capabilities: ServerCapabilities { tools: Some(ToolsCapability { list_changed: false }) },
            server_info: Implementation {
                name: "flowbridge".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Each tool runs a remote workflow. Upload local files with sys_upload_file first."
                    .to_string(),
            ),
        };
        Ok(serde_json::to_value(response)?)
    }

    fn handle_tools_list(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        let _params: ToolsListRequest = match &request.params {
            Some(params) => serde_json::from_value(params.clone())?,
            None => ToolsListRequest::default(),
        };
        let response = ToolsListResponse { tools: self.adapter.list_tools(), next_cursor: None };
        Ok(serde_json::to_value(response)?)
    }

    async fn spawn_tool_call(&self, id: RequestId, params: Option<Value>, outbox: Outbox) {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight.contains_key(&id) {
            // `id` belongs to the running call; the rejection must not reuse it.
            warn!("Rejecting tools/call with id {} already in flight", id);
            send(
                &outbox,
                &error_response(
                    None,
                    JsonRpcError::invalid_request().with_data(
                        json!({"message": "Request id already in flight", "id": id}),
                    ),
                ),
            );
            return;
        }

        let server = self.clone();
        let task_id = id.clone();
        let task = tokio::spawn(async move {
            let response = match server.execute_tool_call(params, &outbox).await {
                Ok(value) => success_response(Some(task_id.clone()), value),
                Err(e) => {
                    error!("tools/call {} rejected: {}", task_id, e);
                    error_response(Some(task_id.clone()), e.to_jsonrpc_error())
                }
            };
            server.in_flight.lock().await.remove(&task_id);
            send(&outbox, &response);
        });
        in_flight.insert(id, task.abort_handle());
    }

    async fn execute_tool_call(&self, params: Option<Value>, outbox: &Outbox) -> McpResult<Value> {
        let params = params.ok_or_else(|| {
            McpError::InvalidArguments("Missing params for tools/call".to_string())
        })?;
        let call: ToolsCallRequest = serde_json::from_value(params)?;
        let progress_token = call.meta.and_then(|meta| meta.progress_token);

        debug!("Calling tool: {}", call.name);
        let mut outputs = self.adapter.call_tool(&call.name, call.arguments).await?;

        let mut content = Vec::new();
        let mut is_error = false;
        while let Some(output) = outputs.next().await {
            if let Some(token) = &progress_token {
                let progress = ProgressNotification {
                    progress_token: token.clone(),
                    progress: content.len() as u64 + 1,
                    message: Some(output.block.as_text().to_string()),
                };
                send(
                    outbox,
                    &JsonRpcNotification::new(NOTIFICATION_PROGRESS, serde_json::to_value(progress)?),
                );
            }
            is_error = output.is_error;
            content.push(output.block);
        }

        Ok(serde_json::to_value(ToolsCallResponse { content, is_error: Some(is_error) })?)
    }
}

fn send<T: Serialize>(outbox: &Outbox, message: &T) {
    match serde_json::to_string(message) {
        Ok(line) => {
            if outbox.send(line).is_err() {
                debug!("Output closed, dropping message");
            }
        }
        Err(e) => error!("Failed to serialize outgoing message: {}", e),
    }
}

/// Serve MCP over an arbitrary line-oriented byte stream pair.
///
/// Returns once `reader` reaches end of input and every in-flight tool call
/// has written its response.
pub async fn serve<R, W>(server: McpServer, reader: R, writer: W) -> McpResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outbox, mut queue) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(line) = queue.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<(), std::io::Error>(())
    });

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        server.dispatch(line, &outbox).await;
    }

    debug!("Input closed, waiting for in-flight calls");
    drop(outbox);
    writer_task.await.map_err(|e| McpError::Internal(e.to_string()))??;
    Ok(())
}

/// Serve MCP on the process stdin/stdout.
pub async fn serve_stdio(adapter: ToolAdapter) -> McpResult<()> {
    info!("Starting MCP server on stdio ({} tools)", adapter.catalog().len());
    serve(McpServer::new(adapter), tokio::io::stdin(), tokio::io::stdout()).await?;
    info!("MCP server stopped");
    Ok(())
}
