// ubus JSON-RPC envelope types
//
// Requests are `{ jsonrpc, id, method, params: [session, object, ...] }`.
// Responses carry either `result` or `error`. For the `call` method the
// result is a two-element array `[status, payload]` where the payload is
// omitted when the remote procedure returns nothing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Session id used for the login call itself.
pub const ANONYMOUS_SESSION: &str = "00000000000000000000000000000000";

/// Error message rpcd returns when a session is unknown or expired.
pub const ACCESS_DENIED: &str = "Access denied";

/// JSON-RPC method understood by the ubus gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RpcMethod {
    /// Session-scoped invocation: `[session, object, method, args]`.
    Call,
    /// Plain lookup: `[session, object]`.
    Get,
    /// Object/signature listing: `[session, pattern]`.
    List,
}

/// Outgoing request envelope.
#[derive(Debug, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: RpcMethod,
    pub params: Vec<Value>,
}

impl RpcRequest {
    /// Frame a request. `call` style appends the operation name (when
    /// given) and an argument object, defaulting to `{}`.
    pub fn new(
        id: u64,
        method: RpcMethod,
        session: &str,
        subsystem: &str,
        operation: Option<&str>,
        args: Option<Value>,
    ) -> Self {
        let mut params = vec![Value::from(session), Value::from(subsystem)];
        if method == RpcMethod::Call {
            if let Some(operation) = operation {
                params.push(Value::from(operation));
            }
            params.push(args.unwrap_or_else(|| Value::Object(serde_json::Map::new())));
        }

        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

/// Incoming response envelope. Both fields are optional on the wire.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// JSON-RPC `error` member.
#[derive(Debug, Deserialize)]
pub struct RpcErrorObject {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// ubus status codes carried in the first element of a `call` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum UbusStatus {
    Ok,
    InvalidCommand,
    InvalidArgument,
    MethodNotFound,
    NotFound,
    NoData,
    PermissionDenied,
    Timeout,
    NotSupported,
    UnknownError,
    ConnectionFailed,
}

impl UbusStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => Self::Ok,
            1 => Self::InvalidCommand,
            2 => Self::InvalidArgument,
            3 => Self::MethodNotFound,
            4 => Self::NotFound,
            5 => Self::NoData,
            6 => Self::PermissionDenied,
            7 => Self::Timeout,
            8 => Self::NotSupported,
            9 => Self::UnknownError,
            10 => Self::ConnectionFailed,
            _ => return None,
        })
    }
}
