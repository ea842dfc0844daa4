//! Configuration management for the research agent.
//!
//! Configuration can be set via environment variables:
//! - `OPENROUTER_API_KEY` - Required. Your OpenRouter API key.
//! - `DEFAULT_MODEL` - Optional. The LLM model to use. Defaults to `openai/gpt-4o-mini`.
//! - `MAX_STEPS` - Optional. Maximum agent loop steps per question. Defaults to `10`.
//! - `TOOL_TIMEOUT_SECS` - Optional. Per-tool deadline in seconds. Defaults to `30`.
//! - `MODEL_TIMEOUT_SECS` - Optional. Per-step model deadline in seconds. Unset means none.
//! - `TOOL_CONCURRENCY` - Optional. `sequential` or `parallel`. Defaults to `sequential`.
//! - `TAVILY_API_KEY` - Optional. Enables the web search tool.
//! - `PROJECT_CATALOG_PATH` - Optional. JSON project catalog; enables project lookup.
//! - `RUN_RETRIES` - Optional. Retries of a whole run on transient model errors. Defaults to `2`.
//! - `SHOW_RUN_LOG` - Optional. Print the per-run tool log after each answer. Defaults to `false`.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::agent::{AgentConfig, ConcurrencyPolicy, DEFAULT_MAX_STEPS, DEFAULT_TOOL_TIMEOUT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenRouter API key
    pub api_key: String,

    /// LLM model identifier (OpenRouter format)
    pub default_model: String,

    /// Maximum steps for the agent loop
    pub max_steps: usize,

    pub tool_timeout: Duration,

    pub model_timeout: Option<Duration>,

    pub concurrency: ConcurrencyPolicy,

    /// Tavily API key for web search
    pub tavily_api_key: Option<String>,

    /// Project catalog for the lookup tool
    pub project_catalog_path: Option<PathBuf>,

    /// Retries of a whole run after a transient model failure
    pub run_retries: u32,

    pub show_run_log: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENROUTER_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENROUTER_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENROUTER_API_KEY".to_string()))?;

        let default_model =
            lookup("DEFAULT_MODEL").unwrap_or_else(|| "openai/gpt-4o-mini".to_string());

        let max_steps = parse_var::<usize>(&lookup, "MAX_STEPS")?.unwrap_or(DEFAULT_MAX_STEPS);
        if max_steps == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_STEPS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let tool_timeout = parse_var::<u64>(&lookup, "TOOL_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOOL_TIMEOUT);
        if tool_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "TOOL_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let model_timeout = parse_var::<u64>(&lookup, "MODEL_TIMEOUT_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let concurrency = parse_var::<ConcurrencyPolicy>(&lookup, "TOOL_CONCURRENCY")?
            .unwrap_or_default();

        let run_retries = parse_var::<u32>(&lookup, "RUN_RETRIES")?.unwrap_or(2);

        let show_run_log = lookup("SHOW_RUN_LOG")
            .map(|v| {
                parse_bool(&v).map_err(|e| ConfigError::InvalidValue("SHOW_RUN_LOG".to_string(), e))
            })
            .transpose()?
            .unwrap_or(false);

        Ok(Self {
            api_key,
            default_model,
            max_steps,
            tool_timeout,
            model_timeout,
            concurrency,
            tavily_api_key: lookup("TAVILY_API_KEY").filter(|v| !v.trim().is_empty()),
            project_catalog_path: lookup("PROJECT_CATALOG_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            run_retries,
            show_run_log,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, default_model: String) -> Self {
        Self {
            api_key,
            default_model,
            max_steps: DEFAULT_MAX_STEPS,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            model_timeout: None,
            concurrency: ConcurrencyPolicy::default(),
            tavily_api_key: None,
            project_catalog_path: None,
            run_retries: 2,
            show_run_log: false,
        }
    }

    /// Agent settings for the given persona.
    pub fn agent_config(&self, system_prompt: &str) -> AgentConfig {
        let config = AgentConfig::new(system_prompt)
            .with_max_steps(self.max_steps)
            .with_tool_timeout(self.tool_timeout)
            .with_concurrency(self.concurrency);
        match self.model_timeout {
            Some(timeout) => config.with_model_timeout(timeout),
            None => config,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("{}", e)))
        })
        .transpose()
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("OPENROUTER_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.default_model, "openai/gpt-4o-mini");
        assert_eq!(config.max_steps, 10);
        assert_eq!(config.tool_timeout, Duration::from_secs(30));
        assert_eq!(config.model_timeout, None);
        assert_eq!(config.concurrency, ConcurrencyPolicy::Sequential);
        assert_eq!(config.run_retries, 2);
        assert!(config.tavily_api_key.is_none());
        assert!(!config.show_run_log);
    }

    #[test]
    fn api_key_is_required() {
        assert!(matches!(
            load(&[]),
            Err(ConfigError::MissingEnvVar(ref k)) if k == "OPENROUTER_API_KEY"
        ));
        assert!(load(&[("OPENROUTER_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("MAX_STEPS", "4"),
            ("TOOL_TIMEOUT_SECS", "5"),
            ("MODEL_TIMEOUT_SECS", "60"),
            ("TOOL_CONCURRENCY", "parallel"),
            ("TAVILY_API_KEY", "tvly-123"),
            ("PROJECT_CATALOG_PATH", "/data/projects.json"),
            ("SHOW_RUN_LOG", "yes"),
        ])
        .unwrap();

        assert_eq!(config.max_steps, 4);
        assert_eq!(config.tool_timeout, Duration::from_secs(5));
        assert_eq!(config.model_timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.concurrency, ConcurrencyPolicy::Parallel);
        assert_eq!(config.tavily_api_key.as_deref(), Some("tvly-123"));
        assert_eq!(
            config.project_catalog_path,
            Some(PathBuf::from("/data/projects.json"))
        );
        assert!(config.show_run_log);

        let agent = config.agent_config("Persona");
        assert_eq!(agent.max_steps, 4);
        assert_eq!(agent.model_timeout, Some(Duration::from_secs(60)));
        assert_eq!(agent.concurrency, ConcurrencyPolicy::Parallel);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (key, value) in [
            ("MAX_STEPS", "0"),
            ("MAX_STEPS", "many"),
            ("TOOL_TIMEOUT_SECS", "0"),
            ("TOOL_CONCURRENCY", "fast"),
            ("SHOW_RUN_LOG", "maybe"),
        ] {
            let err = load(&[("OPENROUTER_API_KEY", "sk-test"), (key, value)]).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue(ref k, _) if k == key),
                "{} = {} should be rejected",
                key,
                value
            );
        }
    }
}
