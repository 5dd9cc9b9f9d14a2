//! MCP service implementation.
//!
//! This module contains the request dispatch logic that sits between the
//! frame transport and the UUID generator.
//!
//! ## Structure
//!
//! - [`handler`] - service entry point (`McpService`).

pub mod handler;
