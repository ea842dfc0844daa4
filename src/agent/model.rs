//! Model capability interface and the chat-completions adapter.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use super::prompt::Context;
use super::types::ToolCallRequest;
use crate::llm::{ChatResponse, LlmClient, LlmError, ToolCall};

/// What the model decided to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelStep {
    FinalAnswer(String),
    /// One or more tool calls; all of them belong to the same step.
    ToolCalls(Vec<ToolCallRequest>),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// Transient backend failure; retrying the run may succeed.
    #[error("model unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with something that is not a valid step.
    #[error("malformed model step: {0}")]
    Protocol(String),
}

/// Generates the next step for a context.
///
/// This is the only thing the agent loop needs from an LLM backend.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn step(&self, context: &Context) -> Result<ModelStep, ModelError>;
}

/// [`ModelClient`] over any chat-completions [`LlmClient`] with native tool calling.
pub struct ChatModel {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl ChatModel {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ModelClient for ChatModel {
    async fn step(&self, context: &Context) -> Result<ModelStep, ModelError> {
        let messages = context.to_chat_messages();
        let tools = context.tool_definitions();

        let response = self
            .llm
            .chat_completion(&self.model, &messages, Some(tools.as_slice()))
            .await
            .map_err(classify_llm_error)?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Model usage"
            );
        }

        parse_response(response)
    }
}

fn classify_llm_error(err: LlmError) -> ModelError {
    if err.is_transient() {
        ModelError::Unavailable(err.to_string())
    } else {
        ModelError::Protocol(err.to_string())
    }
}

/// Translate a chat response into a [`ModelStep`].
///
/// Tool calls win over text. Calls without an id get a generated one; ids
/// repeated within the response are a protocol error. Arguments that are not
/// valid JSON are passed through as a string so argument validation reports
/// them back to the model.
pub(crate) fn parse_response(response: ChatResponse) -> Result<ModelStep, ModelError> {
    let calls = response.tool_calls.unwrap_or_default();

    if !calls.is_empty() {
        let mut seen = HashSet::new();
        let mut requests = Vec::with_capacity(calls.len());
        for call in calls {
            let request = to_request(call)?;
            if !seen.insert(request.id.clone()) {
                return Err(ModelError::Protocol(format!(
                    "duplicate tool call id '{}'",
                    request.id
                )));
            }
            requests.push(request);
        }
        return Ok(ModelStep::ToolCalls(requests));
    }

    match response.content {
        Some(text) if !text.trim().is_empty() => Ok(ModelStep::FinalAnswer(text)),
        _ => Err(ModelError::Protocol(
            "response contains neither text nor tool calls".to_string(),
        )),
    }
}

fn to_request(call: ToolCall) -> Result<ToolCallRequest, ModelError> {
    if call.function.name.trim().is_empty() {
        return Err(ModelError::Protocol("tool call without a name".to_string()));
    }

    let id = if call.id.trim().is_empty() {
        format!("call_{}", Uuid::new_v4().simple())
    } else {
        call.id
    };

    let raw = call.function.arguments.trim();
    let arguments = if raw.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };

    Ok(ToolCallRequest {
        id,
        tool: call.function.name,
        arguments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, FunctionCall};
    use crate::tools::ToolDefinition;
    use serde_json::json;
    use std::sync::Mutex;

    fn call(id: &str, name: &str, args: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: args.to_string(),
            },
        }
    }

    #[test]
    fn text_only_is_final_answer() {
        let step = parse_response(ChatResponse {
            content: Some("42".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(step, ModelStep::FinalAnswer("42".to_string()));
    }

    #[test]
    fn tool_calls_take_precedence_over_text() {
        let step = parse_response(ChatResponse {
            content: Some("Let me check.".to_string()),
            tool_calls: Some(vec![call("c1", "web_search", r#"{"query":"eth"}"#)]),
            usage: None,
        })
        .unwrap();
        assert_eq!(
            step,
            ModelStep::ToolCalls(vec![ToolCallRequest::new(
                "c1",
                "web_search",
                json!({"query": "eth"})
            )])
        );
    }

    #[test]
    fn empty_response_is_protocol_error() {
        let err = parse_response(ChatResponse {
            content: Some("   ".to_string()),
            tool_calls: Some(vec![]),
            usage: None,
        })
        .unwrap_err();
        assert!(matches!(err, ModelError::Protocol(_)));
    }

    #[test]
    fn missing_ids_are_generated_and_duplicates_rejected() {
        let step = parse_response(ChatResponse {
            tool_calls: Some(vec![call("", "a", ""), call("", "b", "")]),
            ..Default::default()
        })
        .unwrap();
        let ModelStep::ToolCalls(requests) = step else {
            panic!("expected tool calls");
        };
        assert!(requests[0].id.starts_with("call_"));
        assert_ne!(requests[0].id, requests[1].id);
        assert_eq!(requests[0].arguments, json!({}));

        let err = parse_response(ChatResponse {
            tool_calls: Some(vec![call("x", "a", "{}"), call("x", "b", "{}")]),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ModelError::Protocol("duplicate tool call id 'x'".into()));
    }

    #[test]
    fn undecodable_arguments_pass_through_as_string() {
        let step = parse_response(ChatResponse {
            tool_calls: Some(vec![call("c1", "a", "{query: eth")]),
            ..Default::default()
        })
        .unwrap();
        let ModelStep::ToolCalls(requests) = step else {
            panic!("expected tool calls");
        };
        assert_eq!(requests[0].arguments, json!("{query: eth"));
    }

    struct RecordingLlm {
        seen_tools: Mutex<Vec<String>>,
        result: fn() -> Result<ChatResponse, LlmError>,
    }

    #[async_trait]
    impl LlmClient for RecordingLlm {
        async fn chat_completion(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            tools: Option<&[ToolDefinition]>,
        ) -> Result<ChatResponse, LlmError> {
            let names = tools
                .unwrap_or_default()
                .iter()
                .map(|t| t.function.name.clone());
            self.seen_tools.lock().unwrap().extend(names);
            (self.result)()
        }
    }

    fn context() -> Context {
        crate::agent::prompt::assemble("Persona", &[], &[])
    }

    #[tokio::test]
    async fn transient_backend_errors_are_unavailable() {
        let llm = Arc::new(RecordingLlm {
            seen_tools: Mutex::new(Vec::new()),
            result: || {
                Err(LlmError::Http {
                    status: 503,
                    body: "overloaded".to_string(),
                })
            },
        });
        let model = ChatModel::new(llm, "test/model");
        let err = model.step(&context()).await.unwrap_err();
        assert!(matches!(err, ModelError::Unavailable(_)));
    }

    #[tokio::test]
    async fn rejected_requests_are_protocol_errors() {
        let llm = Arc::new(RecordingLlm {
            seen_tools: Mutex::new(Vec::new()),
            result: || {
                Err(LlmError::Http {
                    status: 401,
                    body: "bad key".to_string(),
                })
            },
        });
        let model = ChatModel::new(llm, "test/model");
        let err = model.step(&context()).await.unwrap_err();
        assert!(matches!(err, ModelError::Protocol(_)));
    }

    #[tokio::test]
    async fn successful_step_is_parsed() {
        let llm = Arc::new(RecordingLlm {
            seen_tools: Mutex::new(Vec::new()),
            result: || {
                Ok(ChatResponse {
                    content: Some("gm".to_string()),
                    ..Default::default()
                })
            },
        });
        let model = ChatModel::new(llm.clone(), "test/model");
        let step = model.step(&context()).await.unwrap();
        assert_eq!(step, ModelStep::FinalAnswer("gm".to_string()));
        assert!(llm.seen_tools.lock().unwrap().is_empty());
    }
}
