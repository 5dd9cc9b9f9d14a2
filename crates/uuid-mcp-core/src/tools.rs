//! Static tool registry.
//!
//! The server exposes exactly one tool. Its descriptor is fixed; discovery
//! has no side effects and cannot fail.

use crate::protocol::{ListToolsResult, Tool, ToolInputSchema};
use crate::{Error, Result};

/// Name of the UUID generation tool.
pub const GENERATE_UUID: &str = "generate_uuid";

const GENERATE_UUID_DESCRIPTION: &str = "Generate a version 4 UUID.";

/// Tools the server knows how to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolKind {
    GenerateUuid,
}

impl ToolKind {
    /// Resolves a tool name from a `tools/call` request.
    pub fn lookup(name: &str) -> Result<Self> {
        match name {
            GENERATE_UUID => Ok(ToolKind::GenerateUuid),
            other => Err(Error::UnknownTool {
                name: other.to_string(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::GenerateUuid => GENERATE_UUID,
        }
    }

    pub fn descriptor(self) -> Tool {
        match self {
            ToolKind::GenerateUuid => Tool {
                name: GENERATE_UUID.to_string(),
                description: GENERATE_UUID_DESCRIPTION.to_string(),
                input_schema: ToolInputSchema::empty_object(),
            },
        }
    }
}

/// Every registered tool, in listing order.
pub const ALL_TOOLS: &[ToolKind] = &[ToolKind::GenerateUuid];

/// Answer to `tools/list`.
pub fn list_tools() -> ListToolsResult {
    ListToolsResult {
        tools: ALL_TOOLS.iter().map(|tool| tool.descriptor()).collect(),
    }
}
