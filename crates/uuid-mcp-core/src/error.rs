//! Error types for the UUID tool server.
//!
//! This module defines the central `Error` enum, which captures every
//! caller-visible failure of a single request/response cycle. It implements
//! `From<Error>` for [`ErrorObject`] so handlers can propagate errors with `?`
//! and have them rendered as JSON-RPC error objects with the right code.
//!
//! ## Error Cases
//! - `Parse`: the frame was not valid JSON.
//! - `InvalidRequest`: the frame was JSON but not a JSON-RPC 2.0 message.
//! - `MethodNotFound`: the request named a method the server does not serve.
//! - `UnknownTool`: `tools/call` named a tool other than `generate_uuid`.
//! - `InvalidParams`: the request parameters could not be decoded.
//! - `Entropy`: the random source failed while generating a UUID. The detail
//!   is kept for logging only and never reaches the client.
//! - `Internal`: any other server-side failure, e.g. a result that could not
//!   be serialized. Also reported without detail.

use crate::protocol::{ErrorCode, ErrorObject};

pub type Result<T> = core::result::Result<T, Error>;

/// Message returned to clients when UUID generation fails.
pub const GENERATION_FAILED: &str = "Failed to generate UUID.";

/// Message returned to clients for other internal failures.
pub const INTERNAL_ERROR: &str = "Internal error";

/// Unified error type for the UUID tool server.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The frame could not be parsed as JSON.
    #[error("Parse error: {reason}")]
    Parse { reason: String },

    /// The frame was valid JSON but not a valid JSON-RPC request.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// No handler is registered for the requested method.
    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    /// `tools/call` referenced a tool that is not registered.
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    /// The request parameters were missing or malformed.
    #[error("Invalid params: {reason}")]
    InvalidParams { reason: String },

    /// The random source failed to produce bytes.
    #[error("Entropy source failed: {context}")]
    Entropy { context: String },

    /// An unexpected server-side failure.
    #[error("Internal error: {context}")]
    Internal { context: String },
}

impl Error {
    /// The JSON-RPC error code this error is reported with.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Parse { .. } => ErrorCode::ParseError,
            Error::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            Error::MethodNotFound { .. } | Error::UnknownTool { .. } => ErrorCode::MethodNotFound,
            Error::InvalidParams { .. } => ErrorCode::InvalidParams,
            Error::Entropy { .. } | Error::Internal { .. } => ErrorCode::InternalError,
        }
    }
}

impl From<Error> for ErrorObject {
    fn from(err: Error) -> Self {
        let code = err.code();
        let message = match err {
            Error::Entropy { .. } => GENERATION_FAILED.to_string(),
            Error::Internal { .. } => INTERNAL_ERROR.to_string(),
            other => other.to_string(),
        };
        ErrorObject::new(code, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_is_method_not_found_with_name() {
        let obj = ErrorObject::from(Error::UnknownTool {
            name: "nonexistent_tool".to_string(),
        });
        assert_eq!(obj.code, ErrorCode::MethodNotFound.code());
        assert_eq!(obj.code, -32601);
        assert!(obj.message.contains("nonexistent_tool"));
    }

    #[test]
    fn entropy_failure_does_not_leak_detail() {
        let obj = ErrorObject::from(Error::Entropy {
            context: "getrandom: EAGAIN".to_string(),
        });
        assert_eq!(obj.code, -32603);
        assert_eq!(obj.message, GENERATION_FAILED);
        assert!(obj.data.is_none());
    }

    #[test]
    fn internal_failure_does_not_leak_detail() {
        let obj = ErrorObject::from(Error::Internal {
            context: "serializer exploded".to_string(),
        });
        assert_eq!(obj.code, -32603);
        assert_eq!(obj.message, INTERNAL_ERROR);
    }

    #[test]
    fn codes_follow_json_rpc() {
        let cases = [
            (Error::Parse { reason: "x".into() }, -32700),
            (Error::InvalidRequest { reason: "x".into() }, -32600),
            (Error::MethodNotFound { method: "x".into() }, -32601),
            (Error::InvalidParams { reason: "x".into() }, -32602),
        ];
        for (err, code) in cases {
            assert_eq!(ErrorObject::from(err).code, code);
        }
    }
}
