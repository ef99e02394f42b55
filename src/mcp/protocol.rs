//! JSON-RPC 2.0 訊息型別與 MCP 常數
//!
//! stdio 傳輸層每則訊息佔一行 UTF-8 JSON：
//!
//! ```text
//! {"jsonrpc":"2.0","id":1,"method":"tools/list"}\n
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

pub const SERVER_NAME: &str = "youtube-mcp-server";

/// 客戶端要求的版本若有支援就沿用，否則回覆最新版本
pub fn negotiate_protocol_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|v| SUPPORTED_PROTOCOL_VERSIONS.iter().find(|s| **s == v))
        .copied()
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

/// JSON-RPC 2.0 請求；沒有 `id` 的是通知
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// 單行輸入的分類結果
#[derive(Debug)]
pub enum IncomingMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcRequest),
    /// 客戶端送來的回應，本伺服器不會主動發出請求
    Response(Value),
    Invalid { id: Value, message: String },
}

/// 分類一行輸入；`Err` 表示根本不是 JSON
pub fn parse_message(line: &str) -> Result<IncomingMessage, serde_json::Error> {
    let value: Value = serde_json::from_str(line)?;

    if !value.is_object() {
        return Ok(IncomingMessage::Invalid {
            id: Value::Null,
            message: "Expected a JSON-RPC message object".to_string(),
        });
    }

    if value.get("method").is_none() {
        return Ok(IncomingMessage::Response(value));
    }

    if value.get("id").is_some_and(Value::is_null) {
        return Ok(IncomingMessage::Invalid {
            id: Value::Null,
            message: "Request id must not be null".to_string(),
        });
    }

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(request) if request.jsonrpc != JSONRPC_VERSION => Ok(IncomingMessage::Invalid {
            id,
            message: format!("Unsupported jsonrpc version: {}", request.jsonrpc),
        }),
        Ok(request) if request.is_notification() => Ok(IncomingMessage::Notification(request)),
        Ok(request) => Ok(IncomingMessage::Request(request)),
        Err(e) => Ok(IncomingMessage::Invalid {
            id,
            message: format!("Invalid request: {}", e),
        }),
    }
}

/// 以 id 追蹤進行中請求時使用的鍵
pub fn request_key(id: &Value) -> String {
    id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_negotiate_protocol_version() {
        assert_eq!(negotiate_protocol_version(Some("2024-11-05")), "2024-11-05");
        assert_eq!(negotiate_protocol_version(Some("2025-03-26")), "2025-03-26");
        assert_eq!(negotiate_protocol_version(Some("1999-01-01")), LATEST_PROTOCOL_VERSION);
        assert_eq!(negotiate_protocol_version(None), LATEST_PROTOCOL_VERSION);
    }

    #[test]
    fn test_response_serialization() {
        let ok = serde_json::to_value(JsonRpcResponse::success(json!(1), json!({}))).unwrap();
        assert_eq!(ok, json!({"jsonrpc": "2.0", "result": {}, "id": 1}));

        let err = serde_json::to_value(JsonRpcResponse::error(Value::Null, PARSE_ERROR, "Parse error"))
            .unwrap();
        assert_eq!(
            err,
            json!({"jsonrpc": "2.0", "error": {"code": -32700, "message": "Parse error"}, "id": null})
        );
    }

    #[test]
    fn test_parse_message_classification() {
        assert!(matches!(
            parse_message(r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#).unwrap(),
            IncomingMessage::Request(_)
        ));
        assert!(matches!(
            parse_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap(),
            IncomingMessage::Notification(_)
        ));
        assert!(matches!(
            parse_message(r#"{"jsonrpc":"2.0","id":3,"result":{}}"#).unwrap(),
            IncomingMessage::Response(_)
        ));
        assert!(parse_message("{not json").is_err());
    }

    #[test]
    fn test_parse_message_invalid_shapes() {
        match parse_message(r#"{"jsonrpc":"1.0","id":7,"method":"ping"}"#).unwrap() {
            IncomingMessage::Invalid { id, message } => {
                assert_eq!(id, json!(7));
                assert!(message.contains("1.0"));
            }
            other => panic!("unexpected message: {:?}", other),
        }

        match parse_message(r#"{"jsonrpc":"2.0","id":8,"method":5}"#).unwrap() {
            IncomingMessage::Invalid { id, .. } => assert_eq!(id, json!(8)),
            other => panic!("unexpected message: {:?}", other),
        }

        assert!(matches!(
            parse_message("[1, 2]").unwrap(),
            IncomingMessage::Invalid { .. }
        ));

        match parse_message(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#).unwrap() {
            IncomingMessage::Invalid { id, message } => {
                assert_eq!(id, Value::Null);
                assert!(message.contains("null"));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_request_key_distinguishes_types() {
        assert_ne!(request_key(&json!(1)), request_key(&json!("1")));
    }
}
