//! JSON-RPC 2.0 envelope.
//!
//! Incoming frames are parsed into a loosely typed [`serde_json::Value`] first
//! and then classified by hand. Going through `Value` lets a malformed
//! request still be answered with its own `id` when the id itself is valid.

use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

pub const JSONRPC_VERSION: &str = "2.0";

/// Request identifier. Echoed verbatim in the matching response.
///
/// Numeric ids are kept as [`Number`] so unsigned, large and fractional ids
/// round-trip unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(Number),
    String(String),
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Number(id.into())
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_string())
    }
}

/// Standard JSON-RPC error codes used by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl ErrorCode {
    pub const fn code(self) -> i32 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
        }
    }
}

/// The `error` member of a failed response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePayload {
    Result(Value),
    Error(ErrorObject),
}

/// An outgoing response frame.
///
/// `id` serializes as `null` when the request id could not be recovered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            payload: ResponsePayload::Result(result),
        }
    }

    pub fn error(id: Option<RequestId>, error: impl Into<ErrorObject>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            payload: ResponsePayload::Error(error.into()),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.payload {
            ResponsePayload::Result(value) => Some(value),
            ResponsePayload::Error(_) => None,
        }
    }

    pub fn error_object(&self) -> Option<&ErrorObject> {
        match &self.payload {
            ResponsePayload::Result(_) => None,
            ResponsePayload::Error(err) => Some(err),
        }
    }
}

/// A call that expects a response.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub method: String,
    pub params: Option<Value>,
}

/// A one-way message; never answered.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub method: String,
    pub params: Option<Value>,
}

/// A frame that could not be accepted, with whatever id could be salvaged.
#[derive(Clone, Debug, PartialEq)]
pub struct Rejected {
    pub id: Option<RequestId>,
    pub error: Error,
}

impl Rejected {
    fn new(id: Option<RequestId>, error: Error) -> Self {
        Self { id, error }
    }

    pub fn into_response(self) -> Response {
        Response::error(self.id, self.error)
    }
}

/// A classified incoming frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Incoming {
    Request(Request),
    Notification(Notification),
    /// A response from the client to a server-initiated request. The server
    /// never sends any, so these are dropped.
    Response(Option<RequestId>),
}

impl Incoming {
    /// Parses and classifies one frame.
    pub fn parse(frame: &str) -> Result<Self, Rejected> {
        let value: Value = serde_json::from_str(frame).map_err(|e| {
            Rejected::new(
                None,
                Error::Parse {
                    reason: e.to_string(),
                },
            )
        })?;

        match value {
            Value::Object(map) => Self::from_object(map),
            Value::Array(_) => Err(Rejected::new(
                None,
                Error::InvalidRequest {
                    reason: "batch requests are not supported".to_string(),
                },
            )),
            _ => Err(Rejected::new(
                None,
                Error::InvalidRequest {
                    reason: "expected a JSON object".to_string(),
                },
            )),
        }
    }

    fn from_object(mut map: Map<String, Value>) -> Result<Self, Rejected> {
        let raw_id = map.remove("id");
        let id = raw_id
            .as_ref()
            .and_then(|v| serde_json::from_value::<RequestId>(v.clone()).ok());

        let invalid = |id: Option<RequestId>, reason: &str| {
            Rejected::new(
                id,
                Error::InvalidRequest {
                    reason: reason.to_string(),
                },
            )
        };

        if map.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(invalid(id, "jsonrpc must be \"2.0\""));
        }

        let method = match map.remove("method") {
            Some(Value::String(method)) => method,
            Some(_) => return Err(invalid(id, "method must be a string")),
            None if map.contains_key("result") || map.contains_key("error") => {
                return Ok(Incoming::Response(id));
            }
            None => return Err(invalid(id, "missing method")),
        };

        let params = match map.remove("params") {
            None | Some(Value::Null) => None,
            Some(params @ (Value::Object(_) | Value::Array(_))) => Some(params),
            Some(_) => return Err(invalid(id, "params must be an object or an array")),
        };

        match (raw_id, id) {
            (None, _) => Ok(Incoming::Notification(Notification { method, params })),
            (Some(_), Some(id)) => Ok(Incoming::Request(Request { id, method, params })),
            (Some(_), None) => Err(invalid(None, "id must be a string or a number")),
        }
    }
}
