//! Configuration stored under `.stepwise/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".stepwise/config.toml";

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

/// Top-level configuration (TOML).
///
/// Every field has a default, so a partial file (or no file at all) is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StepwiseConfig {
    /// Pause between successive phase generations, in milliseconds.
    pub phase_delay_ms: u64,
    pub backend: BackendConfig,
    pub generation: GenerationConfig,
    pub timeouts: TimeoutConfig,
    pub context: ContextConfig,
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackendConfig {
    /// Chat-completion endpoint.
    pub url: String,
    pub model: String,
    /// Name of an environment variable holding a bearer token, if any.
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub chat_temperature: f64,
    pub plan_temperature: f64,
    pub micro_task_temperature: f64,
    /// Token cap for streamed generations; `-1` means unlimited.
    pub max_tokens: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    pub classify_secs: u64,
    /// Non-streaming requests (questions, summary).
    pub complete_secs: u64,
    /// Longest silence tolerated while reading a stream; not a total deadline.
    pub stream_read_secs: u64,
    /// Per shell command.
    pub command_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContextConfig {
    /// Characters of previous narrative included in each micro-task prompt.
    pub prompt_tail_chars: usize,
    /// Characters of previous narrative retained between phases.
    pub tail_limit_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Run extracted commands after each phase.
    pub enabled: bool,
    /// Bytes of stdout/stderr kept per command.
    pub output_limit_bytes: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/v1/chat/completions".to_string(),
            model: "local-model".to_string(),
            api_key_env: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            chat_temperature: 0.7,
            plan_temperature: 0.7,
            micro_task_temperature: 0.25,
            max_tokens: -1,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            classify_secs: 10,
            complete_secs: 15,
            stream_read_secs: 300,
            command_secs: 600,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            prompt_tail_chars: 900,
            tail_limit_chars: 1200,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for StepwiseConfig {
    fn default() -> Self {
        Self {
            phase_delay_ms: 120,
            backend: BackendConfig::default(),
            generation: GenerationConfig::default(),
            timeouts: TimeoutConfig::default(),
            context: ContextConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

impl TimeoutConfig {
    pub fn classify(&self) -> Duration {
        Duration::from_secs(self.classify_secs)
    }

    pub fn complete(&self) -> Duration {
        Duration::from_secs(self.complete_secs)
    }

    pub fn stream_read(&self) -> Duration {
        Duration::from_secs(self.stream_read_secs)
    }

    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }
}

impl StepwiseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.backend.url.trim().is_empty() {
            return Err(anyhow!("backend.url must be non-empty"));
        }
        if self.backend.model.trim().is_empty() {
            return Err(anyhow!("backend.model must be non-empty"));
        }
        if let Some(var) = &self.backend.api_key_env
            && var.trim().is_empty()
        {
            return Err(anyhow!("backend.api_key_env must be non-empty when set"));
        }
        for (name, value) in [
            ("generation.chat_temperature", self.generation.chat_temperature),
            ("generation.plan_temperature", self.generation.plan_temperature),
            (
                "generation.micro_task_temperature",
                self.generation.micro_task_temperature,
            ),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(anyhow!("{name} must be within 0.0..=2.0"));
            }
        }
        if self.generation.max_tokens == 0 || self.generation.max_tokens < -1 {
            return Err(anyhow!("generation.max_tokens must be -1 or > 0"));
        }
        for (name, value) in [
            ("timeouts.classify_secs", self.timeouts.classify_secs),
            ("timeouts.complete_secs", self.timeouts.complete_secs),
            ("timeouts.stream_read_secs", self.timeouts.stream_read_secs),
            ("timeouts.command_secs", self.timeouts.command_secs),
        ] {
            if value == 0 {
                return Err(anyhow!("{name} must be > 0"));
            }
        }
        if self.context.tail_limit_chars == 0 {
            return Err(anyhow!("context.tail_limit_chars must be > 0"));
        }
        if self.context.prompt_tail_chars > self.context.tail_limit_chars {
            return Err(anyhow!(
                "context.prompt_tail_chars must not exceed context.tail_limit_chars"
            ));
        }
        if self.execution.output_limit_bytes == 0 {
            return Err(anyhow!("execution.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `StepwiseConfig::default()`.
pub fn load_config(path: &Path) -> Result<StepwiseConfig> {
    if !path.exists() {
        let cfg = StepwiseConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: StepwiseConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &StepwiseConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
