//! # Research Agent
//!
//! A tool-using research agent for web3 projects.
//!
//! This library provides:
//! - A think/act/observe agent loop with step budgets, tool deadlines and cancellation
//! - A tool registry with typed argument schemas
//! - An OpenRouter-backed model client
//! - Project lookup and web search tools
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a user question
//! 2. Build context with system prompt and available tools
//! 3. Call LLM, parse its step, execute any tool calls
//! 4. Feed results back to LLM, repeat until it answers
//!
//! ## Example
//!
//! ```rust,ignore
//! use research_agent::agent::{run_agent, AgentConfig};
//!
//! let config = AgentConfig::new("You are a helpful analyst.");
//! let answer = run_agent(&config, registry, model, "Who invested in Lido?").await?;
//! ```

pub mod agent;
pub mod agents;
pub mod config;
pub mod llm;
pub mod tools;

pub use agent::{run_agent, Agent, AgentConfig, AgentError};
pub use config::Config;
