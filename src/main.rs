//! Research Agent - interactive entry point
//!
//! Reads one question per line from stdin and answers each with a fresh run.
//! Ctrl-C cancels the question in flight.

use std::sync::Arc;
use std::time::Duration;

use research_agent::agent::{Agent, AgentError};
use research_agent::agents::{build_tool_registry, research_analyst_agent};
use research_agent::config::Config;
use research_agent::llm::OpenRouterClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "research_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration: model={}", config.default_model);

    let tools = build_tool_registry(&config)?;
    info!("Registered tools: {:?}", tools.names());

    let llm = Arc::new(OpenRouterClient::new(config.api_key.clone()));
    let agent = research_analyst_agent(&config, llm, tools)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let result = ask_with_retry(
            &agent,
            question,
            &cancel,
            config.run_retries,
            config.show_run_log,
        )
        .await;
        watcher.abort();

        match result {
            Ok(answer) => println!("{}\n", answer),
            Err(AgentError::Cancelled) => eprintln!("(cancelled)\n"),
            Err(e) => eprintln!("Error: {}\n", e),
        }
    }

    Ok(())
}

/// Answer a question, retrying the whole run on transient model failures.
async fn ask_with_retry(
    agent: &Agent,
    question: &str,
    cancel: &CancellationToken,
    retries: u32,
    show_log: bool,
) -> Result<String, AgentError> {
    let mut attempt = 0;
    loop {
        let mut run = agent.start_run_with_cancel(question, cancel.clone());
        let result = run.run().await;

        if show_log {
            for entry in run.log() {
                eprintln!("[step {} {:?}] {}", entry.step, entry.entry_type, entry.content);
            }
        }

        match result {
            Err(e) if e.is_transient() && attempt < retries => {
                let backoff = retry_backoff(attempt);
                tracing::warn!("Transient failure ({}); retrying in {:?}", e, backoff);
                tokio::select! {
                    _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                    _ = tokio::time::sleep(backoff) => {}
                }
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Exponential backoff for retry `attempt` (0-based), capped at five minutes.
fn retry_backoff(attempt: u32) -> Duration {
    let millis =
        (RETRY_BASE_DELAY.as_millis() as u64).saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(millis).min(RETRY_MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(retry_backoff(0), Duration::from_millis(500));
        assert_eq!(retry_backoff(1), Duration::from_secs(1));
        assert_eq!(retry_backoff(3), Duration::from_secs(4));
        assert_eq!(retry_backoff(20), RETRY_MAX_DELAY);
        assert_eq!(retry_backoff(u32::MAX), RETRY_MAX_DELAY);
    }
}
