//! Core agent loop implementation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::tools::{ToolDescription, ToolRegistry};

use super::guard::ExecutionGuard;
use super::model::{ModelClient, ModelStep};
use super::prompt;
use super::types::{
    AgentConfig, ConcurrencyPolicy, ConversationTurn, LogEntryType, RunLogEntry, ToolCallRequest,
    ToolResult,
};
use super::AgentError;

/// Where a run currently is in the think/act/observe cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Thinking,
    Acting,
    Observing,
    Done,
    Aborted,
}

/// A model, a tool registry and a system prompt behind one entry point.
///
/// Cheap to share: each question gets its own [`AgentRun`].
#[derive(Clone)]
pub struct Agent {
    config: AgentConfig,
    tools: Arc<ToolRegistry>,
    model: Arc<dyn ModelClient>,
}

impl Agent {
    /// Create a new agent. Fails if the configuration is invalid.
    pub fn new(
        config: AgentConfig,
        tools: Arc<ToolRegistry>,
        model: Arc<dyn ModelClient>,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        Ok(Self {
            config,
            tools,
            model,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Prepare a run for one user message without starting it.
    pub fn start_run(&self, user_message: &str) -> AgentRun {
        self.start_run_with_cancel(user_message, CancellationToken::new())
    }

    pub fn start_run_with_cancel(&self, user_message: &str, cancel: CancellationToken) -> AgentRun {
        AgentRun::new(
            self.config.clone(),
            Arc::clone(&self.tools),
            Arc::clone(&self.model),
            user_message,
            cancel,
        )
    }

    /// Answer one user message.
    pub async fn ask(&self, user_message: &str) -> Result<String, AgentError> {
        self.start_run(user_message).run().await
    }

    /// Answer one user message; cancelling `cancel` aborts the run.
    pub async fn ask_with_cancel(
        &self,
        user_message: &str,
        cancel: CancellationToken,
    ) -> Result<String, AgentError> {
        self.start_run_with_cancel(user_message, cancel).run().await
    }
}

/// Run the agent loop for a single user message.
pub async fn run_agent(
    config: &AgentConfig,
    registry: Arc<ToolRegistry>,
    model: Arc<dyn ModelClient>,
    user_message: &str,
) -> Result<String, AgentError> {
    run_agent_with_cancel(config, registry, model, user_message, CancellationToken::new()).await
}

/// [`run_agent`] with a run-level cancellation signal.
pub async fn run_agent_with_cancel(
    config: &AgentConfig,
    registry: Arc<ToolRegistry>,
    model: Arc<dyn ModelClient>,
    user_message: &str,
    cancel: CancellationToken,
) -> Result<String, AgentError> {
    AgentRun::new(config.clone(), registry, model, user_message, cancel)
        .run()
        .await
}

/// One execution of the loop for one user message.
///
/// Owns the conversation and the step counter. The registry and the model are
/// shared read-only with other runs.
pub struct AgentRun {
    id: Uuid,
    config: AgentConfig,
    registry: Arc<ToolRegistry>,
    model: Arc<dyn ModelClient>,
    tool_descriptions: Vec<ToolDescription>,
    conversation: Vec<ConversationTurn>,
    guard: ExecutionGuard,
    state: RunState,
    tool_calls_made: usize,
    log: Vec<RunLogEntry>,
    outcome: Option<Result<String, AgentError>>,
}

impl AgentRun {
    pub fn new(
        config: AgentConfig,
        registry: Arc<ToolRegistry>,
        model: Arc<dyn ModelClient>,
        user_message: &str,
        cancel: CancellationToken,
    ) -> Self {
        let guard = ExecutionGuard::new(
            config.max_steps,
            config.tool_timeout,
            config.model_timeout,
            cancel,
        );
        let tool_descriptions = registry.describe();

        Self {
            id: Uuid::new_v4(),
            config,
            registry,
            model,
            tool_descriptions,
            conversation: vec![ConversationTurn::User(user_message.to_string())],
            guard,
            state: RunState::Thinking,
            tool_calls_made: 0,
            log: Vec::new(),
            outcome: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Thinking steps taken so far.
    pub fn steps(&self) -> usize {
        self.guard.steps()
    }

    /// Total tool calls dispatched.
    pub fn tool_calls_made(&self) -> usize {
        self.tool_calls_made
    }

    /// The conversation, starting with the user message.
    pub fn transcript(&self) -> &[ConversationTurn] {
        &self.conversation
    }

    pub fn log(&self) -> &[RunLogEntry] {
        &self.log
    }

    /// Drive the loop to completion.
    ///
    /// A run executes once; later calls return the recorded outcome.
    pub async fn run(&mut self) -> Result<String, AgentError> {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        let outcome = self.drive().await;
        match &outcome {
            Ok(_) => {
                self.state = RunState::Done;
                tracing::info!(
                    run = %self.id,
                    steps = self.steps(),
                    tool_calls = self.tool_calls_made,
                    "Agent run completed"
                );
            }
            Err(e) => {
                self.state = RunState::Aborted;
                self.record(LogEntryType::Error, e.to_string());
                tracing::error!(run = %self.id, steps = self.steps(), "Agent run aborted: {}", e);
            }
        }

        self.outcome = Some(outcome.clone());
        outcome
    }

    async fn drive(&mut self) -> Result<String, AgentError> {
        self.config.validate()?;

        loop {
            self.state = RunState::Thinking;
            let step = self.guard.begin_step()?;
            tracing::debug!(run = %self.id, "Agent step {}", step);
            self.record(LogEntryType::Thinking, format!("Querying model (step {})", step));

            let context = prompt::assemble(
                &self.config.system_prompt,
                &self.tool_descriptions,
                &self.conversation,
            );
            let next = self.guard.model_step(self.model.step(&context)).await?;

            let calls = match next {
                ModelStep::FinalAnswer(text) => {
                    self.record(LogEntryType::Response, truncate_for_log(&text, 2000));
                    self.conversation.push(ConversationTurn::Assistant {
                        text: Some(text.clone()),
                        tool_calls: Vec::new(),
                    });
                    return Ok(text);
                }
                ModelStep::ToolCalls(calls) => calls,
            };

            check_calls(&calls)?;

            self.state = RunState::Acting;
            self.conversation.push(ConversationTurn::Assistant {
                text: None,
                tool_calls: calls.clone(),
            });
            for call in &calls {
                tracing::info!(run = %self.id, tool = %call.tool, call_id = %call.id, "Calling tool");
                self.record(
                    LogEntryType::ToolCall,
                    format!("Calling tool: {} with args: {}", call.tool, call.arguments),
                );
            }
            self.tool_calls_made += calls.len();

            let results = self.execute_tool_calls(&calls).await?;

            self.state = RunState::Observing;
            let mut fatal = None;
            for result in results {
                if let Err(e) = &result.outcome {
                    tracing::warn!(run = %self.id, call_id = %result.call_id, "Tool failed: {}", e);
                    if fatal.is_none() && self.config.is_fatal(e) {
                        fatal = Some(e.clone());
                    }
                }
                self.record(LogEntryType::ToolResult, truncate_for_log(&result.content(), 1000));
                self.conversation.push(ConversationTurn::ToolResult(result));
            }

            if let Some(e) = fatal {
                return Err(AgentError::Tool(e));
            }
        }
    }

    /// Dispatch one step's tool calls under the configured concurrency policy.
    async fn execute_tool_calls(
        &self,
        calls: &[ToolCallRequest],
    ) -> Result<Vec<ToolResult>, AgentError> {
        match self.config.concurrency {
            ConcurrencyPolicy::Sequential => {
                self.guard.run_sequential(&self.registry, calls).await
            }
            ConcurrencyPolicy::Parallel if calls.len() > 1 => {
                self.guard.run_parallel(&self.registry, calls).await
            }
            ConcurrencyPolicy::Parallel => self.guard.run_sequential(&self.registry, calls).await,
        }
    }

    fn record(&mut self, entry_type: LogEntryType, content: String) {
        self.log.push(RunLogEntry {
            timestamp: chrono::Utc::now(),
            step: self.guard.steps(),
            entry_type,
            content,
        });
    }
}

/// A step must carry at least one call and no repeated ids.
fn check_calls(calls: &[ToolCallRequest]) -> Result<(), AgentError> {
    if calls.is_empty() {
        return Err(AgentError::ModelProtocol(
            "model returned neither a final answer nor tool calls".to_string(),
        ));
    }
    for (i, call) in calls.iter().enumerate() {
        if calls[..i].iter().any(|c| c.id == call.id) {
            return Err(AgentError::ModelProtocol(format!(
                "duplicate tool call id '{}'",
                call.id
            )));
        }
    }
    Ok(())
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &s[..end])
    }
}
