use crate::domain::ports::ToolProvider;
use crate::mcp::protocol::{
    negotiate_protocol_version, parse_message, request_key, IncomingMessage, JsonRpcRequest,
    JsonRpcResponse, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
    PARSE_ERROR, SERVER_NAME,
};
use crate::utils::error::{Result, ServerError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinSet};

type InFlight = Arc<Mutex<HashMap<String, AbortHandle>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    AwaitingInitialize,
    Initializing,
    Ready,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    protocol_version: Option<String>,
    client_info: Option<ClientInfo>,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    name: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelledParams {
    request_id: Value,
    reason: Option<String>,
}

/// MCP 伺服器：逐行讀取 JSON-RPC 訊息，工具呼叫以獨立 task 並行執行
pub struct McpServer<T: ToolProvider + 'static> {
    tools: Arc<T>,
    version: String,
}

impl<T: ToolProvider + 'static> McpServer<T> {
    pub fn new(tools: T) -> Self {
        Self {
            tools: Arc::new(tools),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub async fn run<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_messages(writer, rx));

        let in_flight: InFlight = Arc::new(Mutex::new(HashMap::new()));
        let mut tasks = JoinSet::new();
        let mut state = SessionState::AwaitingInitialize;
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        tracing::info!("🚀 {} v{} listening on stdio", SERVER_NAME, self.version);

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            // 非 UTF-8 的行視為解析錯誤，連線繼續
            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    tracing::warn!("Received a line that is not valid UTF-8: {}", e);
                    send(
                        &tx,
                        JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {}", e)),
                    );
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            match parse_message(line) {
                Err(e) => {
                    tracing::warn!("Failed to parse incoming message: {}", e);
                    send(
                        &tx,
                        JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {}", e)),
                    );
                }
                Ok(IncomingMessage::Request(request)) => {
                    self.handle_request(request, &mut state, &tx, &in_flight, &mut tasks)
                        .await;
                }
                Ok(IncomingMessage::Notification(notification)) => {
                    handle_notification(notification, &mut state, &in_flight).await;
                }
                Ok(IncomingMessage::Response(value)) => {
                    tracing::debug!("Ignoring client response: {}", value);
                }
                Ok(IncomingMessage::Invalid { id, message }) => {
                    tracing::warn!("Invalid request: {}", message);
                    send(&tx, JsonRpcResponse::error(id, INVALID_REQUEST, message));
                }
            }

            while let Some(finished) = tasks.try_join_next() {
                log_task_result(finished);
            }
        }

        tracing::info!("Input closed, waiting for {} in-flight tool call(s)", tasks.len());
        while let Some(finished) = tasks.join_next().await {
            log_task_result(finished);
        }

        drop(tx);
        writer_task
            .await
            .map_err(|e| ServerError::IoError(std::io::Error::other(e)))??;

        tracing::info!("👋 Session closed");
        Ok(())
    }

    async fn handle_request(
        &self,
        request: JsonRpcRequest,
        state: &mut SessionState,
        tx: &UnboundedSender<JsonRpcResponse>,
        in_flight: &InFlight,
        tasks: &mut JoinSet<()>,
    ) {
        let id = request.id.clone().unwrap_or(Value::Null);
        tracing::debug!("Received request {}: {}", id, request.method);

        let uninitialized = *state == SessionState::AwaitingInitialize;
        if uninitialized && request.method != "initialize" && request.method != "ping" {
            send(
                tx,
                JsonRpcResponse::error(
                    id,
                    INVALID_REQUEST,
                    "Received request before initialization was complete",
                ),
            );
            return;
        }

        let params = request.params.unwrap_or(Value::Null);

        let response = match request.method.as_str() {
            "initialize" => {
                *state = SessionState::Initializing;
                self.initialize(id, params)
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": self.tools.list_tools() })),
            "tools/call" => {
                match serde_json::from_value::<CallToolParams>(params) {
                    Ok(call) => self.spawn_tool_call(id, call, tx, in_flight, tasks).await,
                    Err(e) => send(
                        tx,
                        JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
                    ),
                }
                return;
            }
            method => {
                tracing::warn!("Method not found: {}", method);
                JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", method))
            }
        };

        send(tx, response);
    }

    fn initialize(&self, id: Value, params: Value) -> JsonRpcResponse {
        let params: Option<InitializeParams> = serde_json::from_value(params).ok();
        let requested = params.as_ref().and_then(|p| p.protocol_version.as_deref());
        let protocol_version = negotiate_protocol_version(requested);

        if let Some(client) = params.as_ref().and_then(|p| p.client_info.as_ref()) {
            tracing::info!(
                "🤝 Initializing session for client {} {} (protocol {})",
                client.name.as_deref().unwrap_or("unknown"),
                client.version.as_deref().unwrap_or(""),
                protocol_version
            );
        }

        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": protocol_version,
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": self.version,
                }
            }),
        )
    }

    async fn spawn_tool_call(
        &self,
        id: Value,
        call: CallToolParams,
        tx: &UnboundedSender<JsonRpcResponse>,
        in_flight: &InFlight,
        tasks: &mut JoinSet<()>,
    ) {
        let key = request_key(&id);
        let tools = Arc::clone(&self.tools);
        let tx = tx.clone();
        let registry = Arc::clone(in_flight);
        let task_key = key.clone();

        tracing::info!("🔧 Calling tool {} (request {})", call.name, id);

        // 先持有鎖再 spawn，確保 task 結束時的移除發生在插入之後
        let mut guard = in_flight.lock().await;
        if guard.contains_key(&key) {
            tracing::warn!("Rejecting tools/call with duplicate in-flight id {}", id);
            send(
                &tx,
                JsonRpcResponse::error(
                    id,
                    INVALID_REQUEST,
                    "A request with this id is already in progress",
                ),
            );
            return;
        }

        let handle = tasks.spawn(async move {
            let arguments = match call.arguments {
                Some(Value::Null) | None => json!({}),
                Some(arguments) => arguments,
            };

            let output = tools.call_tool(&call.name, &arguments).await;
            let response = match serde_json::to_value(&output) {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Internal error: {}", e)),
            };

            registry.lock().await.remove(&task_key);
            send(&tx, response);
        });
        guard.insert(key, handle);
    }
}

async fn handle_notification(
    notification: JsonRpcRequest,
    state: &mut SessionState,
    in_flight: &InFlight,
) {
    match notification.method.as_str() {
        "notifications/initialized" => {
            *state = SessionState::Ready;
            tracing::info!("✅ Session initialized");
        }
        "notifications/cancelled" => {
            let params = notification
                .params
                .and_then(|p| serde_json::from_value::<CancelledParams>(p).ok());

            let Some(params) = params else {
                tracing::warn!("Ignoring malformed cancellation notification");
                return;
            };

            let key = request_key(&params.request_id);
            match in_flight.lock().await.remove(&key) {
                Some(handle) => {
                    handle.abort();
                    tracing::info!(
                        "🛑 Cancelled request {} ({})",
                        params.request_id,
                        params.reason.as_deref().unwrap_or("no reason given")
                    );
                }
                None => tracing::debug!("Cancellation for unknown request {}", params.request_id),
            }
        }
        other => tracing::debug!("Ignoring notification: {}", other),
    }
}

fn send(tx: &UnboundedSender<JsonRpcResponse>, response: JsonRpcResponse) {
    if tx.send(response).is_err() {
        tracing::warn!("Output channel closed, dropping response");
    }
}

fn log_task_result(result: std::result::Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => tracing::debug!("Tool call task cancelled"),
        Err(e) => tracing::error!("❌ Tool call task failed: {}", e),
    }
}

/// 單一寫入者，確保每則訊息獨佔一行
async fn write_messages<W>(mut writer: W, mut rx: UnboundedReceiver<JsonRpcResponse>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let mut line = serde_json::to_vec(&message)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
    }

    writer.shutdown().await?;
    Ok(())
}
