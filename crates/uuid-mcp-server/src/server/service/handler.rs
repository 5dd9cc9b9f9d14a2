//! MCP request dispatch.
//!
//! This module defines [`McpService`], which turns one decoded frame into at
//! most one response. It owns the UUID generator and nothing else; every
//! request is independent of the ones before it.
//!
//! ## Responsibilities
//!
//! - Classify frames into requests, notifications and stray responses.
//! - Route requests by method name and decode their parameters.
//! - Run `generate_uuid` and shape the tool result.
//! - Convert failures into JSON-RPC errors without leaking internals.

use crate::server::telemetry::{
    increment_request_errors, increment_requests, increment_tool_calls,
    increment_uuids_generated, record_request_duration,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::time::Instant;
use uuid_mcp_core::{
    Error, RandSource, Result, UuidGenerator,
    protocol::{
        CallToolParams, CallToolResult, EmptyResult, Implementation, Incoming, InitializeParams,
        InitializeResult, ListResourceTemplatesResult, ListResourcesResult, Notification, Request,
        Response, ServerCapabilities, negotiate_protocol_version,
    },
    tools::{self, ToolKind},
};

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "uuid-mcp-server";

/// Stateless MCP request handler.
pub struct McpService<R> {
    generator: UuidGenerator<R>,
    server_info: Implementation,
}

impl<R: RandSource> McpService<R> {
    pub fn new(rng: R) -> Self {
        Self {
            generator: UuidGenerator::new(rng),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Handles one raw frame. Returns the response to write, if any.
    ///
    /// Blank frames, notifications and client responses produce nothing.
    pub fn handle_frame(&self, frame: &str) -> Option<Response> {
        if frame.trim().is_empty() {
            return None;
        }

        match Incoming::parse(frame) {
            Ok(Incoming::Request(request)) => Some(self.handle_request(request)),
            Ok(Incoming::Notification(notification)) => {
                self.handle_notification(notification);
                None
            }
            Ok(Incoming::Response(id)) => {
                tracing::debug!(?id, "Ignoring response from client");
                None
            }
            Err(rejected) => {
                tracing::warn!("Rejected frame: {}", rejected.error);
                let response = rejected.into_response();
                if let Some(err) = response.error_object() {
                    increment_request_errors(err.code);
                }
                Some(response)
            }
        }
    }

    #[tracing::instrument(skip_all, fields(method = %request.method, id = ?request.id))]
    pub fn handle_request(&self, request: Request) -> Response {
        let start = Instant::now();
        increment_requests(&request.method);

        let response = match self.dispatch(&request.method, request.params) {
            Ok(result) => Response::success(request.id, result),
            Err(err) => {
                match &err {
                    Error::Entropy { .. } | Error::Internal { .. } => tracing::error!("{err}"),
                    _ => tracing::debug!("{err}"),
                }
                increment_request_errors(err.code().code());
                Response::error(Some(request.id), err)
            }
        };

        record_request_duration(start.elapsed().as_secs_f64() * 1000.0);
        response
    }

    fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value> {
        match method {
            "initialize" => to_value(self.initialize(params)?),
            "ping" => to_value(EmptyResult {}),
            "tools/list" => to_value(tools::list_tools()),
            "tools/call" => to_value(self.call_tool(params)?),
            "resources/list" => to_value(ListResourcesResult::default()),
            "resources/templates/list" => to_value(ListResourceTemplatesResult::default()),
            other => Err(Error::MethodNotFound {
                method: other.to_string(),
            }),
        }
    }

    fn initialize(&self, params: Option<Value>) -> Result<InitializeResult> {
        let params: InitializeParams = match params {
            Some(params) => from_params(params)?,
            None => InitializeParams::default(),
        };

        if let Some(client) = &params.client_info {
            tracing::info!(
                "Initializing session for {} {} (protocol {})",
                client.name,
                client.version,
                params.protocol_version.as_deref().unwrap_or("unspecified"),
            );
        }

        Ok(InitializeResult {
            protocol_version: negotiate_protocol_version(params.protocol_version.as_deref())
                .to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: self.server_info.clone(),
        })
    }

    /// Runs a tool. Arguments are accepted and ignored since no tool
    /// declares any.
    fn call_tool(&self, params: Option<Value>) -> Result<CallToolResult> {
        let params: CallToolParams = from_params(params.ok_or_else(|| Error::InvalidParams {
            reason: "missing params".to_string(),
        })?)?;

        let tool = ToolKind::lookup(&params.name)?;
        increment_tool_calls(tool.name());

        match tool {
            ToolKind::GenerateUuid => {
                let id = self.generator.generate().inspect_err(|err| {
                    tracing::error!("Error generating UUID: {err}");
                })?;
                increment_uuids_generated();
                Ok(CallToolResult::text(id.to_string()))
            }
        }
    }

    fn handle_notification(&self, notification: Notification) {
        match notification.method.as_str() {
            "notifications/initialized" => tracing::debug!("Client finished initialization"),
            "notifications/cancelled" => {
                // Requests complete before the next frame is read, so there
                // is never anything left to cancel.
                tracing::debug!(params = ?notification.params, "Ignoring cancellation");
            }
            other => tracing::debug!("Ignoring notification {other}"),
        }
    }
}

/// Decodes named parameters. Positional (array) params are rejected since
/// every method here takes an object.
fn from_params<T: DeserializeOwned>(params: Value) -> Result<T> {
    if !params.is_object() {
        return Err(Error::InvalidParams {
            reason: "params must be an object".to_string(),
        });
    }
    serde_json::from_value(params).map_err(|e| Error::InvalidParams {
        reason: e.to_string(),
    })
}

fn to_value<T: Serialize>(result: T) -> Result<Value> {
    serde_json::to_value(result).map_err(|e| Error::Internal {
        context: e.to_string(),
    })
}
