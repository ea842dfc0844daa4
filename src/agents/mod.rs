//! Concrete agents assembled from the core loop.

mod research_analyst;

pub use research_analyst::{build_tool_registry, research_analyst_agent, RESEARCH_ANALYST_PROMPT};
