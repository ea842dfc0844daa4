//! Conversation, configuration and run-log types.

use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::AgentError;
use crate::tools::{ToolError, ToolErrorKind};

/// Default maximum number of Thinking steps per run.
pub const DEFAULT_MAX_STEPS: usize = 10;

/// Default per-tool deadline.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRequest {
    /// Unique within one step.
    pub id: String,
    pub tool: String,
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            arguments,
        }
    }
}

/// Outcome of one tool call, success or typed failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub tool: String,
    pub call_id: String,
    pub outcome: Result<String, ToolError>,
}

impl ToolResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Text shown to the model.
    pub fn content(&self) -> String {
        match &self.outcome {
            Ok(output) => output.clone(),
            Err(e) => format!("Error: {}", e),
        }
    }
}

/// One entry of the conversation. Append-only within a run.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationTurn {
    User(String),
    Assistant {
        text: Option<String>,
        tool_calls: Vec<ToolCallRequest>,
    },
    ToolResult(ToolResult),
}

/// How tool calls within one step are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// One at a time, in request order.
    #[default]
    Sequential,
    /// All calls of a step concurrently, each on its own task.
    Parallel,
}

impl FromStr for ConcurrencyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" | "serial" => Ok(Self::Sequential),
            "parallel" | "concurrent" => Ok(Self::Parallel),
            other => Err(format!("expected 'sequential' or 'parallel', got: {}", other)),
        }
    }
}

/// Per-agent configuration. Immutable once a run starts.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Persona and behavior instructions.
    pub system_prompt: String,

    /// Maximum Thinking steps before the run is aborted.
    pub max_steps: usize,

    /// Deadline for a single tool invocation.
    pub tool_timeout: Duration,

    /// Deadline for a single model step (none by default).
    pub model_timeout: Option<Duration>,

    pub concurrency: ConcurrencyPolicy,

    /// Tool error kinds that abort the run instead of being observed.
    pub fatal_tool_errors: HashSet<ToolErrorKind>,
}

impl AgentConfig {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            max_steps: DEFAULT_MAX_STEPS,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            model_timeout: None,
            concurrency: ConcurrencyPolicy::default(),
            fatal_tool_errors: HashSet::new(),
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = Some(timeout);
        self
    }

    pub fn with_concurrency(mut self, concurrency: ConcurrencyPolicy) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Treat `kind` as fatal to the run.
    pub fn with_fatal_tool_error(mut self, kind: ToolErrorKind) -> Self {
        self.fatal_tool_errors.insert(kind);
        self
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        if self.max_steps == 0 {
            return Err(AgentError::InvalidConfig(
                "max_steps must be greater than zero".to_string(),
            ));
        }
        if self.tool_timeout.is_zero() {
            return Err(AgentError::InvalidConfig(
                "tool_timeout must be non-zero".to_string(),
            ));
        }
        if self.model_timeout.is_some_and(|t| t.is_zero()) {
            return Err(AgentError::InvalidConfig(
                "model_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn is_fatal(&self, error: &ToolError) -> bool {
        error
            .kind()
            .is_some_and(|kind| self.fatal_tool_errors.contains(&kind))
    }
}

/// A single entry in the run log.
#[derive(Debug, Clone, Serialize)]
pub struct RunLogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Step the entry belongs to (1-based).
    pub step: usize,

    pub entry_type: LogEntryType,

    pub content: String,
}

/// Types of log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEntryType {
    /// Model is being queried
    Thinking,
    /// Tool is being called
    ToolCall,
    /// Tool returned a result
    ToolResult,
    /// Agent produced final response
    Response,
    /// The run was aborted
    Error,
}
