use std::fmt;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Keyword heuristics and a fixed note template; no network
    Rules,
    /// OpenAI-compatible chat completions endpoint
    Llm,
}

/// Endpoint settings for the generative strategies.
#[derive(Debug, Clone, Args)]
pub struct LlmArgs {
    #[arg(long, env = "LLM_API_BASE", default_value = "https://api.openai.com/v1")]
    pub llm_api_base: String,
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o-mini")]
    pub llm_model: String,
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value_t = 60)]
    pub llm_timeout_secs: u64,
    /// Reviews classified concurrently
    #[arg(long, env = "LLM_CONCURRENCY", default_value_t = 4)]
    pub llm_concurrency: usize,
}

#[derive(Clone)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub concurrency: usize,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl LlmArgs {
    pub fn into_config(self) -> anyhow::Result<LlmConfig> {
        let api_key = self
            .llm_api_key
            .filter(|key| !key.trim().is_empty())
            .context("LLM_API_KEY must be set to use the llm strategy")?;

        Ok(LlmConfig {
            api_base: self.llm_api_base.trim_end_matches('/').to_string(),
            api_key,
            model: self.llm_model,
            timeout: Duration::from_secs(self.llm_timeout_secs.max(1)),
            concurrency: self.llm_concurrency.max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(key: Option<&str>) -> LlmArgs {
        LlmArgs {
            llm_api_base: "http://localhost:8080/v1/".to_string(),
            llm_api_key: key.map(str::to_string),
            llm_model: "local-model".to_string(),
            llm_timeout_secs: 0,
            llm_concurrency: 0,
        }
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let err = args(None).into_config().unwrap_err();
        assert!(err.to_string().contains("LLM_API_KEY"));
        assert!(args(Some("  ")).into_config().is_err());
    }

    #[test]
    fn config_normalizes_values() {
        let config = args(Some("secret")).into_config().unwrap();
        assert_eq!(config.api_base, "http://localhost:8080/v1");
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.concurrency, 1);
        assert!(!format!("{config:?}").contains("secret"));
    }
}
