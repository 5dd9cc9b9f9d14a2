//! Wire types for the stdio protocol.
//!
//! - [`jsonrpc`] - the JSON-RPC 2.0 envelope: incoming message
//!   classification, responses and error objects.
//! - [`mcp`] - Model Context Protocol payloads carried inside the envelope.

pub mod jsonrpc;
pub mod mcp;

pub use jsonrpc::{
    ErrorCode, ErrorObject, Incoming, JSONRPC_VERSION, Notification, Rejected, Request, RequestId,
    Response, ResponsePayload,
};
pub use mcp::{
    CallToolParams, CallToolResult, Content, EmptyResult, Implementation, InitializeParams,
    InitializeResult, LATEST_PROTOCOL_VERSION, ListResourceTemplatesResult, ListResourcesResult,
    ListToolsResult, SUPPORTED_PROTOCOL_VERSIONS, ServerCapabilities, Tool, ToolInputSchema,
    negotiate_protocol_version,
};
