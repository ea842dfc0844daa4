//! ResearchAnalyst: web3 project research with project lookup and web search.

use std::sync::Arc;

use crate::agent::{Agent, AgentError, ChatModel};
use crate::config::Config;
use crate::llm::LlmClient;
use crate::tools::{ProjectCatalog, ProjectLookup, TavilySearch, ToolRegistry};

pub const RESEARCH_ANALYST_PROMPT: &str = "\
You are ResearchAnalyst, responsible for assisting users in conducting research and analysis related to web3 projects. \
Provide accurate and detailed information about project progress, team members, market trends, investors, \
and other relevant data to support investment decisions.

Your answer should be detailed and include puns or jokes where possible. \
Keep a lively, enthusiastic, and energetic tone, maybe include some emojis.";

/// Register the research tools enabled by `config`, project lookup first.
pub fn build_tool_registry(config: &Config) -> anyhow::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    match &config.project_catalog_path {
        Some(path) => {
            let catalog = ProjectCatalog::load(path)?;
            registry.register(Arc::new(ProjectLookup::new(Arc::new(catalog))))?;
        }
        None => tracing::warn!("PROJECT_CATALOG_PATH not set; project lookup disabled"),
    }

    match &config.tavily_api_key {
        Some(key) => registry.register(Arc::new(TavilySearch::new(key.clone())?))?,
        None => tracing::warn!("TAVILY_API_KEY not set; web search disabled"),
    }

    Ok(registry)
}

/// Wire the ResearchAnalyst agent: the configured model, the given tools and
/// the ResearchAnalyst persona.
pub fn research_analyst_agent(
    config: &Config,
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
) -> Result<Agent, AgentError> {
    let model = Arc::new(ChatModel::new(llm, config.default_model.clone()));
    Agent::new(
        config.agent_config(RESEARCH_ANALYST_PROMPT),
        Arc::new(tools),
        model,
    )
}
