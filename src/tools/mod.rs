//! Tool registry and the uniform tool contract.
//!
//! Every executor the agent can call implements [`Tool`]. The registry keeps
//! tools in registration order, validates arguments against each tool's
//! declared [`ToolSchema`] and wraps tool failures in a typed [`ToolError`].

mod schema;

pub mod project;
pub mod web;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use project::{ProjectCatalog, ProjectLookup, ProjectRecord};
pub use schema::{ParamKind, ParamSpec, ToolSchema};
pub use web::TavilySearch;

/// Trait for tools the agent can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name of the tool as the model sees it.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Declared argument schema.
    fn parameters_schema(&self) -> ToolSchema;

    /// Execute the tool with arguments already validated against the schema.
    async fn execute(&self, args: Value) -> anyhow::Result<String>;
}

/// Failures produced by the registry or folded into a tool result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("tool '{name}' is already registered")]
    DuplicateTool { name: String },

    #[error("unknown tool '{name}'")]
    UnknownTool { name: String },

    #[error("invalid arguments for '{tool}': {reason}")]
    ArgumentValidation { tool: String, reason: String },

    #[error("tool '{tool}' failed: {cause}")]
    ToolExecution { tool: String, cause: String },

    #[error("tool '{tool}' (call {call_id}) timed out after {}s", .after.as_secs_f64())]
    ToolTimeout {
        tool: String,
        call_id: String,
        after: Duration,
    },
}

/// Classification of the [`ToolError`]s a call can produce, used by the
/// fatal-error policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    UnknownTool,
    ArgumentValidation,
    ToolExecution,
    ToolTimeout,
}

impl ToolError {
    /// Kind of a call failure. Registration errors never reach a run and
    /// have none.
    pub fn kind(&self) -> Option<ToolErrorKind> {
        match self {
            Self::DuplicateTool { .. } => None,
            Self::UnknownTool { .. } => Some(ToolErrorKind::UnknownTool),
            Self::ArgumentValidation { .. } => Some(ToolErrorKind::ArgumentValidation),
            Self::ToolExecution { .. } => Some(ToolErrorKind::ToolExecution),
            Self::ToolTimeout { .. } => Some(ToolErrorKind::ToolTimeout),
        }
    }
}

/// Tool information handed to the prompt assembler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub schema: ToolSchema,
}

/// Function definition in the chat-completions `tools` format.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl From<&ToolDescription> for ToolDefinition {
    fn from(desc: &ToolDescription) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: desc.name.clone(),
                description: desc.description.clone(),
                parameters: desc.schema.to_json_schema(),
            },
        }
    }
}

/// Registry of available tools.
///
/// Read-only once built; share it between runs behind an `Arc`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.contains(&name) {
            return Err(ToolError::DuplicateTool { name });
        }
        tracing::debug!(tool = %name, "Registered tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Result<Self, ToolError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Describe every tool, in registration order.
    pub fn describe(&self) -> Vec<ToolDescription> {
        self.tools
            .iter()
            .map(|t| ToolDescription {
                name: t.name().to_string(),
                description: t.description().to_string(),
                schema: t.parameters_schema(),
            })
            .collect()
    }

    /// Function-calling definitions for chat backends, in registration order.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.describe().iter().map(ToolDefinition::from).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate the arguments and invoke a tool by name.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<String, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
        })?;

        tool.parameters_schema()
            .validate(&args)
            .map_err(|reason| ToolError::ArgumentValidation {
                tool: name.to_string(),
                reason,
            })?;

        tool.execute(args)
            .await
            .map_err(|e| ToolError::ToolExecution {
                tool: name.to_string(),
                cause: format!("{:#}", e),
            })
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
