//! Layered configuration: defaults -> environment variables -> explicit overrides.
//!
//! No config-file format is pulled in (the crate otherwise has no use for a
//! YAML/TOML dependency), so the fallback chain the teacher codebase runs
//! against a project-local file instead runs against `TASKGRAPH_*`
//! environment variables.

use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "TASKGRAPH_";

/// Top-level configuration for the demo binary and anything else that
/// assembles an [`crate::Agent`] outside of a test.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub scheduler: SchedulerSettings,
    pub runner: RunnerSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self { llm: LlmConfig::default(), scheduler: SchedulerSettings::default(), runner: RunnerSettings::default() }
    }
}

impl Config {
    /// Defaults, overridden field-by-field by any `TASKGRAPH_*` environment
    /// variable that is set. Mirrors the teacher's `Config::load()` fallback
    /// chain, minus the file-based layers this crate has no use for.
    pub fn load() -> Self {
        let mut config = Self::default();
        config.llm.apply_env();
        config.scheduler.apply_env();
        config.runner.apply_env();
        tracing::debug!(?config, "Config::load: resolved");
        config
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("llm", &self.llm)
            .field("scheduler", &self.scheduler)
            .field("runner", &self.runner)
            .finish()
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key_env", &self.api_key_env)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// LLM provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name; only `"anthropic"` is implemented.
    pub provider: String,
    pub model: String,
    /// Name of the environment variable holding the API key (not the key itself).
    pub api_key_env: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 4096,
            timeout_ms: 60_000,
        }
    }
}

impl LlmConfig {
    fn apply_env(&mut self) {
        if let Ok(v) = env_var("LLM_PROVIDER") {
            self.provider = v;
        }
        if let Ok(v) = env_var("LLM_MODEL") {
            self.model = v;
        }
        if let Ok(v) = env_var("LLM_API_KEY_ENV") {
            self.api_key_env = v;
        }
        if let Ok(v) = env_var("LLM_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = env_var("LLM_MAX_TOKENS").ok().and_then(|s| s.parse().ok()) {
            self.max_tokens = v;
        }
        if let Some(v) = env_var("LLM_TIMEOUT_MS").ok().and_then(|s| s.parse().ok()) {
            self.timeout_ms = v;
        }
    }
}

/// Scheduler concurrency defaults (see [`crate::scheduler::SchedulerConfig`],
/// which a `SchedulerSettings` is turned into when the Agent is built).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// `None` means unbounded, matching the source design; the demo binary
    /// sets a practical default.
    pub max_concurrent: Option<usize>,
    pub idle_poll_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self { max_concurrent: Some(8), idle_poll_ms: 100 }
    }
}

impl SchedulerSettings {
    fn apply_env(&mut self) {
        if let Ok(v) = env_var("SCHEDULER_MAX_CONCURRENT") {
            self.max_concurrent = if v.eq_ignore_ascii_case("unbounded") { None } else { v.parse().ok() };
        }
        if let Some(v) = env_var("SCHEDULER_IDLE_POLL_MS").ok().and_then(|s| s.parse().ok()) {
            self.idle_poll_ms = v;
        }
    }
}

/// Runner safety ceilings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Max tool-loop iterations before a task is force-failed (§4.5 step 5).
    pub max_iterations: u32,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self { max_iterations: 20 }
    }
}

impl RunnerSettings {
    fn apply_env(&mut self) {
        if let Some(v) = env_var("RUNNER_MAX_ITERATIONS").ok().and_then(|s| s.parse().ok()) {
            self.max_iterations = v;
        }
    }
}

fn env_var(suffix: &str) -> Result<String, std::env::VarError> {
    std::env::var(format!("{ENV_PREFIX}{suffix}"))
}
