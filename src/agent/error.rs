//! Run-level errors.

use thiserror::Error;

use super::model::ModelError;
use crate::tools::ToolError;

/// Errors that end an agent run.
///
/// Tool failures are normally folded into the conversation and never show up
/// here; only tool error kinds configured as fatal surface as [`AgentError::Tool`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("invalid agent configuration: {0}")]
    InvalidConfig(String),

    /// Transient; the caller may retry the whole run.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("model protocol error: {0}")]
    ModelProtocol(String),

    #[error("step budget of {max_steps} exhausted before a final answer")]
    StepBudgetExceeded { max_steps: usize },

    #[error("run cancelled")]
    Cancelled,

    #[error("fatal tool error: {0}")]
    Tool(#[from] ToolError),
}

impl AgentError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ModelUnavailable(_))
    }
}

impl From<ModelError> for AgentError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Unavailable(msg) => Self::ModelUnavailable(msg),
            ModelError::Protocol(msg) => Self::ModelProtocol(msg),
        }
    }
}
