//! Agent module - the think/act/observe orchestration core.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Assemble context from the system prompt, tool descriptions and conversation
//! 2. Ask the model for the next step
//! 3. If the model requests tool calls, execute them and fold the results back in
//! 4. Repeat until the model produces a final answer or the run is aborted

mod agent_loop;
mod error;
mod guard;
mod model;
pub mod prompt;
mod types;

pub use agent_loop::{run_agent, run_agent_with_cancel, Agent, AgentRun, RunState};
pub use error::AgentError;
pub use guard::{invoke_guarded, ExecutionGuard};
pub use model::{ChatModel, ModelClient, ModelError, ModelStep};
pub use prompt::{assemble, build_system_prompt, Context};
pub use types::{
    AgentConfig, ConcurrencyPolicy, ConversationTurn, LogEntryType, RunLogEntry, ToolCallRequest,
    ToolResult, DEFAULT_MAX_STEPS, DEFAULT_TOOL_TIMEOUT,
};
