//! Errors raised while driving an external tool.
//!
//! Only the failures that get recorded into a memory file are typed; everything
//! else travels as `anyhow::Error` with context, as usual for a CLI.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{tool} not found: {path}")]
    NotFound { tool: String, path: PathBuf },

    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed ({status}): {stderr}")]
    Failed { tool: String, status: String, stderr: String },

    #[error("{tool} timed out after {secs} seconds")]
    TimedOut { tool: String, secs: u64 },

    #[error("Malformed {tool} output: {detail}")]
    MalformedOutput { tool: String, detail: String },
}

impl ToolError {
    /// Category label stored in `last_failure.category`
    pub fn category(&self) -> &'static str {
        match self {
            ToolError::NotFound { .. } => "tool-not-found",
            ToolError::Spawn { .. } | ToolError::Failed { .. } | ToolError::TimedOut { .. } => {
                "invocation-failure"
            }
            ToolError::MalformedOutput { .. } => "malformed-output",
        }
    }
}

/// Category of an arbitrary error: a [`ToolError`] anywhere in the chain wins,
/// anything else is reported as `other`
pub fn category_of(error: &anyhow::Error) -> &'static str {
    error.chain().find_map(|e| e.downcast_ref::<ToolError>()).map_or("other", ToolError::category)
}
