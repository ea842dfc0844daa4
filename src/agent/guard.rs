//! Execution guard: step budget, deadlines, panic isolation and cancellation.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::model::{ModelError, ModelStep};
use super::types::{ToolCallRequest, ToolResult};
use super::AgentError;
use crate::tools::{ToolError, ToolRegistry};

/// Budgets and cancellation for one run.
#[derive(Debug)]
pub struct ExecutionGuard {
    max_steps: usize,
    steps: usize,
    tool_timeout: Duration,
    model_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl ExecutionGuard {
    pub fn new(
        max_steps: usize,
        tool_timeout: Duration,
        model_timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            max_steps,
            steps: 0,
            tool_timeout,
            model_timeout,
            cancel,
        }
    }

    /// Steps started so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Start a new step, or fail once the budget is spent.
    pub fn begin_step(&mut self) -> Result<usize, AgentError> {
        if self.cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        if self.steps >= self.max_steps {
            return Err(AgentError::StepBudgetExceeded {
                max_steps: self.max_steps,
            });
        }
        self.steps += 1;
        Ok(self.steps)
    }

    /// Await a model step, honoring cancellation and the optional model deadline.
    pub async fn model_step<F>(&self, step: F) -> Result<ModelStep, AgentError>
    where
        F: Future<Output = Result<ModelStep, ModelError>>,
    {
        let guarded = async {
            match self.model_timeout {
                Some(limit) => match tokio::time::timeout(limit, step).await {
                    Ok(result) => result,
                    Err(_) => Err(ModelError::Unavailable(format!(
                        "model step timed out after {}s",
                        limit.as_secs_f64()
                    ))),
                },
                None => step.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AgentError::Cancelled),
            result = guarded => result.map_err(AgentError::from),
        }
    }

    /// Run calls one at a time in request order.
    pub async fn run_sequential(
        &self,
        registry: &ToolRegistry,
        requests: &[ToolCallRequest],
    ) -> Result<Vec<ToolResult>, AgentError> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(AgentError::Cancelled),
                result = invoke_guarded(registry, request, self.tool_timeout) => results.push(result),
            }
        }
        Ok(results)
    }

    /// Run every call on its own task; results come back in request order.
    pub async fn run_parallel(
        &self,
        registry: &Arc<ToolRegistry>,
        requests: &[ToolCallRequest],
    ) -> Result<Vec<ToolResult>, AgentError> {
        let mut workers = JoinSet::new();
        for (slot, request) in requests.iter().cloned().enumerate() {
            let registry = Arc::clone(registry);
            let timeout = self.tool_timeout;
            workers.spawn(async move { (slot, invoke_guarded(&registry, &request, timeout).await) });
        }

        // One slot per call, written once by its worker.
        let mut slots: Vec<Option<ToolResult>> = requests.iter().map(|_| None).collect();
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    workers.abort_all();
                    return Err(AgentError::Cancelled);
                }
                joined = workers.join_next() => match joined {
                    Some(Ok((slot, result))) => slots[slot] = Some(result),
                    Some(Err(e)) => tracing::warn!("Tool worker failed: {}", e),
                    None => break,
                },
            }
        }

        Ok(slots
            .into_iter()
            .zip(requests)
            .map(|(slot, request)| {
                slot.unwrap_or_else(|| ToolResult {
                    tool: request.tool.clone(),
                    call_id: request.id.clone(),
                    outcome: Err(ToolError::ToolExecution {
                        tool: request.tool.clone(),
                        cause: "tool worker terminated unexpectedly".to_string(),
                    }),
                })
            })
            .collect())
    }
}

/// Invoke one tool call under a deadline.
///
/// Never fails: timeouts and panics become failed [`ToolResult`]s. On timeout
/// the invocation future is dropped, which cancels it.
pub async fn invoke_guarded(
    registry: &ToolRegistry,
    request: &ToolCallRequest,
    timeout: Duration,
) -> ToolResult {
    let invocation = AssertUnwindSafe(registry.invoke(&request.tool, request.arguments.clone()))
        .catch_unwind();

    let outcome = match tokio::time::timeout(timeout, invocation).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(panic)) => Err(ToolError::ToolExecution {
            tool: request.tool.clone(),
            cause: format!("tool panicked: {}", panic_message(panic.as_ref())),
        }),
        Err(_) => Err(ToolError::ToolTimeout {
            tool: request.tool.clone(),
            call_id: request.id.clone(),
            after: timeout,
        }),
    };

    ToolResult {
        tool: request.tool.clone(),
        call_id: request.id.clone(),
        outcome,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
