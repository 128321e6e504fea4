//! Tool definitions and dispatch for the MCP surface.
//!
//! Two tools are advertised: `merge_to_main` and `merge_to_test`. Both
//! always produce a descriptive text result: merge failures are prose in
//! the result, never protocol errors. Protocol errors are reserved for an
//! unknown tool name or malformed arguments.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use mergeflow_core::config::AppConfig;
use mergeflow_core::models::MergeRequest;
use mergeflow_core::workflow::MergeEngine;

/// Errors surfaced to the caller as JSON-RPC errors.
#[derive(Debug)]
pub enum ToolError {
    UnknownTool(String),
    InvalidParams(String),
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTool(name) => write!(f, "unknown tool: {}", name),
            Self::InvalidParams(detail) => write!(f, "invalid tool arguments: {}", detail),
        }
    }
}

// ---------------------------------------------------------------------------
// Tool parameter shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct MergeToMainParams {
    #[serde(default)]
    source_branch: Option<String>,
    #[serde(default)]
    commit_message: Option<String>,
    #[serde(default)]
    squash: bool,
}

#[derive(Debug, Default, Deserialize)]
struct MergeToTestParams {
    #[serde(default)]
    source_branch: Option<String>,
    #[serde(default)]
    test_branch: Option<String>,
    #[serde(default)]
    commit_message: Option<String>,
    #[serde(default)]
    squash: bool,
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// Tool descriptors for `tools/list`.
pub fn tool_definitions() -> Value {
    json!([
        {
            "name": "merge_to_main",
            "description": "Merge the current (or a named) branch into the repository's primary branch (main/master). Checks out the primary branch, pulls it from the remote, and merges the source branch, optionally squashed.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "source_branch": {
                        "type": "string",
                        "description": "Source branch; the currently checked-out branch when omitted."
                    },
                    "commit_message": {
                        "type": "string",
                        "description": "Merge commit message."
                    },
                    "squash": {
                        "type": "boolean",
                        "description": "Condense the source branch's history into a single change.",
                        "default": false
                    }
                }
            }
        },
        {
            "name": "merge_to_test",
            "description": "Merge the current (or a named) branch into a test branch, creating the test branch from the primary branch if it does not exist yet.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "source_branch": {
                        "type": "string",
                        "description": "Source branch; the currently checked-out branch when omitted."
                    },
                    "test_branch": {
                        "type": "string",
                        "description": "Target test branch.",
                        "default": "test"
                    },
                    "commit_message": {
                        "type": "string",
                        "description": "Merge commit message."
                    },
                    "squash": {
                        "type": "boolean",
                        "description": "Condense the source branch's history into a single change.",
                        "default": false
                    }
                }
            }
        }
    ])
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run the named tool and return its descriptive result text.
pub async fn dispatch_tool(
    engine: &MergeEngine,
    config: &AppConfig,
    name: &str,
    arguments: Value,
) -> Result<String, ToolError> {
    info!(tool = name, "tool call");
    match name {
        "merge_to_main" => {
            let params: MergeToMainParams = parse_params(arguments)?;
            let req = MergeRequest {
                source_branch: params.source_branch,
                commit_message: params.commit_message,
                squash: params.squash,
                push: false,
            };
            Ok(engine.merge_to_primary(&req).await.render())
        }
        "merge_to_test" => {
            let params: MergeToTestParams = parse_params(arguments)?;
            let test_branch = params
                .test_branch
                .unwrap_or_else(|| config.merge.default_test_branch.clone());
            let req = MergeRequest {
                source_branch: params.source_branch,
                commit_message: params.commit_message,
                squash: params.squash,
                push: false,
            };
            Ok(engine.merge_to_test(&req, &test_branch).await.render())
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

fn parse_params<T: Default + for<'de> Deserialize<'de>>(arguments: Value) -> Result<T, ToolError> {
    if arguments.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidParams(e.to_string()))
}
