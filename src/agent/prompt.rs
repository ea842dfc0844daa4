//! Prompt assembly: system prompt + tool descriptions + conversation.

use crate::llm::{ChatMessage, FunctionCall, Role, ToolCall};
use crate::tools::{ToolDefinition, ToolDescription};

use super::types::ConversationTurn;

/// Everything the model sees for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    /// Persona followed by the rendered tool list.
    pub system: String,
    pub tools: Vec<ToolDescription>,
    pub turns: Vec<ConversationTurn>,
}

impl Context {
    /// Convert to chat-completions messages.
    pub fn to_chat_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        messages.push(ChatMessage::text(Role::System, self.system.clone()));

        for turn in &self.turns {
            match turn {
                ConversationTurn::User(text) => {
                    messages.push(ChatMessage::text(Role::User, text.clone()));
                }
                ConversationTurn::Assistant { text, tool_calls } => {
                    let calls: Vec<ToolCall> = tool_calls
                        .iter()
                        .map(|c| ToolCall {
                            id: c.id.clone(),
                            call_type: "function".to_string(),
                            function: FunctionCall {
                                name: c.tool.clone(),
                                arguments: c.arguments.to_string(),
                            },
                        })
                        .collect();
                    messages.push(ChatMessage {
                        role: Role::Assistant,
                        content: text.clone(),
                        tool_calls: if calls.is_empty() { None } else { Some(calls) },
                        tool_call_id: None,
                    });
                }
                ConversationTurn::ToolResult(result) => {
                    messages.push(ChatMessage {
                        role: Role::Tool,
                        content: Some(result.content()),
                        tool_calls: None,
                        tool_call_id: Some(result.call_id.clone()),
                    });
                }
            }
        }

        messages
    }

    /// Function definitions for backends with native tool calling.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(ToolDefinition::from).collect()
    }

    /// Render the whole context as plain text, for text-only backends.
    pub fn render(&self) -> String {
        let mut out = format!("System:\n{}\n", self.system);

        for turn in &self.turns {
            match turn {
                ConversationTurn::User(text) => {
                    out.push_str(&format!("\nUser:\n{}\n", text));
                }
                ConversationTurn::Assistant { text, tool_calls } => {
                    out.push_str("\nAssistant:\n");
                    if let Some(text) = text {
                        out.push_str(text);
                        out.push('\n');
                    }
                    for call in tool_calls {
                        out.push_str(&format!(
                            "-> {}({}) [{}]\n",
                            call.tool, call.arguments, call.id
                        ));
                    }
                }
                ConversationTurn::ToolResult(result) => {
                    out.push_str(&format!(
                        "\nTool result [{}] {}:\n{}\n",
                        result.call_id,
                        result.tool,
                        result.content()
                    ));
                }
            }
        }

        out
    }
}

/// Build the system text: persona plus the tool list in registration order.
pub fn build_system_prompt(system_prompt: &str, tools: &[ToolDescription]) -> String {
    if tools.is_empty() {
        return format!(
            "{}\n\n## Tools\n\nNo tools are available. Answer directly.",
            system_prompt.trim()
        );
    }

    let tool_descriptions = tools
        .iter()
        .map(|t| format!("- **{}**({}): {}", t.name, t.schema.signature(), t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"{system_prompt}

## Available Tools
{tool_descriptions}

## Tool Use

1. **Use tools for facts you don't have** - Don't guess project data, prices or recent events.
2. **Check tool errors** - A tool result starting with "Error:" means the call failed. Fix the arguments or try another tool.
3. **Answer when you can** - Once you have enough information, reply with the final answer instead of calling more tools."#,
        system_prompt = system_prompt.trim(),
        tool_descriptions = tool_descriptions
    )
}

/// Assemble the model-facing context. Pure and deterministic.
pub fn assemble(
    system_prompt: &str,
    tools: &[ToolDescription],
    conversation: &[ConversationTurn],
) -> Context {
    Context {
        system: build_system_prompt(system_prompt, tools),
        tools: tools.to_vec(),
        turns: conversation.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::types::{ToolCallRequest, ToolResult};
    use crate::tools::{ParamKind, ToolError, ToolSchema};
    use serde_json::json;

    fn tools() -> Vec<ToolDescription> {
        vec![
            ToolDescription {
                name: "project_lookup".to_string(),
                description: "Look up a project".to_string(),
                schema: ToolSchema::new().required("project", ParamKind::String, "Name"),
            },
            ToolDescription {
                name: "web_search".to_string(),
                description: "Search the web".to_string(),
                schema: ToolSchema::new()
                    .required("query", ParamKind::String, "Query")
                    .optional("max_results", ParamKind::Integer, "Cap"),
            },
        ]
    }

    fn conversation() -> Vec<ConversationTurn> {
        vec![
            ConversationTurn::User("Who backs Uniswap?".to_string()),
            ConversationTurn::Assistant {
                text: None,
                tool_calls: vec![ToolCallRequest::new(
                    "c1",
                    "project_lookup",
                    json!({"project": "Uniswap"}),
                )],
            },
            ConversationTurn::ToolResult(ToolResult {
                tool: "project_lookup".to_string(),
                call_id: "c1".to_string(),
                outcome: Ok("Investors: Paradigm".to_string()),
            }),
        ]
    }

    #[test]
    fn tools_are_listed_in_registration_order() {
        let prompt = build_system_prompt("You are ResearchAnalyst.", &tools());
        let lookup = prompt.find("**project_lookup**(project: string)").unwrap();
        let search = prompt
            .find("**web_search**(query: string, max_results?: integer)")
            .unwrap();
        assert!(prompt.starts_with("You are ResearchAnalyst."));
        assert!(lookup < search);
    }

    #[test]
    fn no_tools_means_answer_directly() {
        let prompt = build_system_prompt("Persona", &[]);
        assert!(prompt.ends_with("No tools are available. Answer directly."));
    }

    #[test]
    fn assemble_is_deterministic() {
        let a = assemble("Persona", &tools(), &conversation());
        let b = assemble("Persona", &tools(), &conversation());
        assert_eq!(a, b);
        assert_eq!(a.render(), b.render());
    }

    #[test]
    fn chat_messages_follow_the_conversation() {
        let messages = assemble("Persona", &tools(), &conversation()).to_chat_messages();
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool]
        );

        let call = &messages[2].tool_calls.as_ref().unwrap()[0];
        assert_eq!(call.function.name, "project_lookup");
        assert_eq!(call.function.arguments, r#"{"project":"Uniswap"}"#);
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(messages[3].content.as_deref(), Some("Investors: Paradigm"));
    }

    #[test]
    fn render_shows_failures() {
        let mut turns = conversation();
        turns.push(ConversationTurn::ToolResult(ToolResult {
            tool: "price".to_string(),
            call_id: "c2".to_string(),
            outcome: Err(ToolError::UnknownTool {
                name: "price".to_string(),
            }),
        }));
        let text = assemble("Persona", &tools(), &turns).render();
        assert!(text.contains("-> project_lookup({\"project\":\"Uniswap\"}) [c1]"));
        assert!(text.contains("Tool result [c2] price:\nError: unknown tool 'price'"));
    }

    #[test]
    fn tool_definitions_keep_order() {
        let defs = assemble("Persona", &tools(), &[]).tool_definitions();
        let names: Vec<_> = defs.iter().map(|d| d.function.name.as_str()).collect();
        assert_eq!(names, vec!["project_lookup", "web_search"]);
    }
}
