//! Project metadata lookup over a local catalog of web3 projects.
//!
//! The catalog is a JSON array of [`ProjectRecord`]s loaded once at startup.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ParamKind, Tool, ToolSchema};

/// Maximum number of partial matches listed when no exact match exists.
const MAX_PARTIAL_MATCHES: usize = 5;

/// A single project entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub name: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Development stage, e.g. "mainnet" or "testnet".
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub team: Vec<String>,
    #[serde(default)]
    pub investors: Vec<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl ProjectRecord {
    fn render(&self) -> String {
        let mut out = match &self.symbol {
            Some(symbol) => format!("# {} ({})\n", self.name, symbol),
            None => format!("# {}\n", self.name),
        };
        if let Some(category) = &self.category {
            out.push_str(&format!("Category: {}\n", category));
        }
        if let Some(status) = &self.status {
            out.push_str(&format!("Status: {}\n", status));
        }
        if !self.description.is_empty() {
            out.push_str(&format!("Description: {}\n", self.description));
        }
        if !self.team.is_empty() {
            out.push_str(&format!("Team: {}\n", self.team.join(", ")));
        }
        if !self.investors.is_empty() {
            out.push_str(&format!("Investors: {}\n", self.investors.join(", ")));
        }
        if let Some(website) = &self.website {
            out.push_str(&format!("Website: {}\n", website));
        }
        out.trim_end().to_string()
    }
}

/// In-memory project catalog.
#[derive(Debug, Clone, Default)]
pub struct ProjectCatalog {
    projects: Vec<ProjectRecord>,
}

impl ProjectCatalog {
    pub fn new(projects: Vec<ProjectRecord>) -> Self {
        Self { projects }
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read catalog {}: {}", path.display(), e))?;
        let projects: Vec<ProjectRecord> = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid catalog {}: {}", path.display(), e))?;
        tracing::info!("Loaded {} projects from {}", projects.len(), path.display());
        Ok(Self { projects })
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Exact (case-insensitive) match on name or symbol.
    pub fn find(&self, query: &str) -> Option<&ProjectRecord> {
        let needle = query.trim().to_lowercase();
        self.projects.iter().find(|p| {
            p.name.to_lowercase() == needle
                || p.symbol.as_deref().is_some_and(|s| s.to_lowercase() == needle)
        })
    }

    /// Projects whose name or category contains the query.
    pub fn search(&self, query: &str) -> Vec<&ProjectRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.projects
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.category
                        .as_deref()
                        .is_some_and(|c| c.to_lowercase().contains(&needle))
            })
            .collect()
    }
}

/// Look up project progress, team, investors and other metadata.
pub struct ProjectLookup {
    catalog: Arc<ProjectCatalog>,
}

impl ProjectLookup {
    pub fn new(catalog: Arc<ProjectCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for ProjectLookup {
    fn name(&self) -> &str {
        "project_lookup"
    }

    fn description(&self) -> &str {
        "Look up a web3 project by name or token symbol. Returns its category, status, description, team members, investors and website. Prefer this over web search for project fundamentals."
    }

    fn parameters_schema(&self) -> ToolSchema {
        ToolSchema::new().required(
            "project",
            ParamKind::String,
            "Project name or token symbol, e.g. 'Uniswap' or 'UNI'",
        )
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let query = args["project"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'project' argument"))?;

        if let Some(record) = self.catalog.find(query) {
            return Ok(record.render());
        }

        let partial = self.catalog.search(query);
        if partial.is_empty() {
            return Ok(format!("No project found matching: {}", query));
        }

        let names = partial
            .iter()
            .take(MAX_PARTIAL_MATCHES)
            .map(|p| format!("- {}", p.name))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(format!(
            "No exact match for '{}'. Similar projects:\n{}",
            query, names
        ))
    }
}
