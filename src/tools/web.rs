//! Web search tool backed by the Tavily search API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ParamKind, Tool, ToolSchema};

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// Search the web for current information.
pub struct TavilySearch {
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u64,
    search_depth: &'a str,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("research-agent/0.1")
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl Tool for TavilySearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for up-to-date information. Returns result titles, URLs and snippets. Use for news, market trends, funding rounds and anything that may have changed recently."
    }

    fn parameters_schema(&self) -> ToolSchema {
        ToolSchema::new()
            .required("query", ParamKind::String, "The search query")
            .optional(
                "max_results",
                ParamKind::Integer,
                "Maximum number of results to return (default: 5)",
            )
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'query' argument"))?;
        let max_results = args["max_results"]
            .as_f64()
            .map(|n| n as u64)
            .unwrap_or(5)
            .clamp(1, 20);

        tracing::info!("Searching the web: {}", query);

        let response = self
            .client
            .post(TAVILY_SEARCH_URL)
            .json(&SearchRequest {
                api_key: &self.api_key,
                query,
                max_results,
                search_depth: "basic",
                include_answer: true,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Search API error {}: {}",
                status,
                truncate(&body, 300)
            ));
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(format_results(query, &parsed))
    }
}

fn format_results(query: &str, response: &SearchResponse) -> String {
    if response.results.is_empty() && response.answer.is_none() {
        return format!("No results found for: {}", query);
    }

    let mut sections = Vec::new();
    if let Some(answer) = response.answer.as_deref().filter(|a| !a.trim().is_empty()) {
        sections.push(format!("Summary: {}", answer.trim()));
    }
    for hit in &response.results {
        sections.push(format!(
            "**{}**\n{}\nURL: {}",
            hit.title.trim(),
            truncate(hit.content.trim(), 500),
            hit.url
        ));
    }
    sections.join("\n\n")
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
