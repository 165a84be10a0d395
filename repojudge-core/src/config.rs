//! Evaluation pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{JudgeError, Result};

/// Lines per source chunk.
pub const CHUNK_LINES: usize = 1000;
/// Complexity above which a function is reported as an issue.
pub const COMPLEXITY_THRESHOLD: u32 = 7;
/// Maximum number of Python files handed to the linter.
pub const LINT_SAMPLE_SIZE: usize = 3;
/// Maximum number of chunks submitted to the model.
pub const MAX_LLM_CHUNKS: usize = 5;
/// Character budget per submitted chunk.
pub const MAX_CHUNK_CHARS: usize = 3000;
/// Attempts made to delete a workspace.
pub const CLEANUP_ATTEMPTS: u32 = 3;
/// Pause between workspace deletion attempts.
pub const CLEANUP_BACKOFF: Duration = Duration::from_secs(2);

const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 300;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

/// Extensions collected for LLM review when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".cpp", ".java", ".c", ".h", ".ts", ".html", ".css", ".md", ".txt",
];

/// Settings for the hosted chat-completion model.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// API key; `None` disables LLM scoring.
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Maximum number of chunks scored per evaluation.
    pub max_chunks: usize,
    /// Character budget per chunk.
    pub max_chunk_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
            max_chunks: MAX_LLM_CHUNKS,
            max_chunk_chars: MAX_CHUNK_CHARS,
        }
    }
}

/// Settings for one evaluator instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Directory under which per-request workspaces are created.
    pub workspace_root: PathBuf,
    /// Leave cloned workspaces on disk after evaluation.
    pub keep_workspace: bool,
    /// Timeout for `git clone`.
    pub clone_timeout: Duration,
    /// Timeout for each analysis tool invocation.
    pub tool_timeout: Duration,
    /// Workspace deletion attempts.
    pub cleanup_attempts: u32,
    /// Pause between deletion attempts.
    pub cleanup_backoff: Duration,
    /// File-name suffixes collected as source chunks.
    pub extensions: Vec<String>,
    /// Lines per chunk.
    pub chunk_lines: usize,
    /// Complexity issue threshold.
    pub complexity_threshold: u32,
    /// Linter sample size.
    pub lint_sample_size: usize,
    /// Model settings.
    pub llm: LlmConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir().join("repojudge-workspaces"),
            keep_workspace: false,
            clone_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            cleanup_attempts: CLEANUP_ATTEMPTS,
            cleanup_backoff: CLEANUP_BACKOFF,
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            chunk_lines: CHUNK_LINES,
            complexity_threshold: COMPLEXITY_THRESHOLD,
            lint_sample_size: LINT_SAMPLE_SIZE,
            llm: LlmConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Build a configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let workspace_root = non_empty_var("REPOJUDGE_WORKSPACE_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.workspace_root);
        let keep_workspace = std::env::var("REPOJUDGE_KEEP_WORKSPACE")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let clone_timeout = duration_var("REPOJUDGE_CLONE_TIMEOUT_SECS", defaults.clone_timeout)?;
        let tool_timeout = duration_var("REPOJUDGE_TOOL_TIMEOUT_SECS", defaults.tool_timeout)?;

        let llm = LlmConfig {
            api_key: non_empty_var("OPENAI_API_KEY"),
            base_url: non_empty_var("OPENAI_BASE_URL").unwrap_or(defaults.llm.base_url),
            model: non_empty_var("REPOJUDGE_LLM_MODEL").unwrap_or(defaults.llm.model),
            request_timeout: duration_var(
                "REPOJUDGE_LLM_TIMEOUT_SECS",
                defaults.llm.request_timeout,
            )?,
            ..defaults.llm
        };

        Ok(Self {
            workspace_root,
            keep_workspace,
            clone_timeout,
            tool_timeout,
            llm,
            ..defaults
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn duration_var(key: &str, default: Duration) -> Result<Duration> {
    let Some(raw) = non_empty_var(key) else {
        return Ok(default);
    };
    let secs: u64 = raw
        .parse()
        .map_err(|_| JudgeError::Config(format!("{key} must be a whole number of seconds")))?;
    if secs == 0 {
        return Err(JudgeError::Config(format!("{key} must be positive")));
    }
    Ok(Duration::from_secs(secs))
}
