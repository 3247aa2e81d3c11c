//! Runtime configuration
//!
//! Everything the original kept as process-global mutable state (API keys,
//! selected model, tuning knobs) lives in an explicit config object passed
//! to the orchestrator at construction.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration for one agent instance.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Workspace root all relative paths resolve against.
    pub workspace: PathBuf,
    /// Model identifier sent to the provider.
    pub model: String,
    /// Ordered credential list; rotated on auth/rate-limit failures,
    /// wrapping around. Attempts per call = list length.
    pub api_keys: Vec<String>,
    /// Hard timeout for a single model call.
    pub request_timeout: Duration,
    /// Token budget for the model response.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
    pub index: IndexConfig,
    pub safety: SafetyConfig,
}

impl AgentConfig {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            model: "deepseek/deepseek-chat".to_string(),
            api_keys: Vec::new(),
            request_timeout: Duration::from_secs(120),
            max_tokens: 2000,
            temperature: 0.7,
            index: IndexConfig::default(),
            safety: SafetyConfig::default(),
        }
    }
}

/// Tuning for the indexing pipeline.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Soft chunk size: once the buffer passes this, the next boundary
    /// line flushes the chunk.
    pub chunk_size: usize,
    /// Hard ceiling: flush regardless of boundaries. Guards against
    /// minified or otherwise un-splittable content.
    pub max_chunk_size: usize,
    /// Path substrings and `*`-wildcard patterns to skip while scanning.
    pub ignore_patterns: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            max_chunk_size: 2000,
            ignore_patterns: vec![
                "node_modules".into(),
                ".git".into(),
                ".vscode".into(),
                ".idea".into(),
                "target".into(),
                "dist".into(),
                "build".into(),
                "coverage".into(),
                ".next".into(),
                ".cache".into(),
                ".cinder-backups".into(),
                "*.lock".into(),
                "package-lock.json".into(),
                "yarn.lock".into(),
                "*.min.js".into(),
                "*.min.css".into(),
                "*.bundle.js".into(),
                "*.map".into(),
                "*.generated.*".into(),
            ],
        }
    }
}

/// Tuning for validation, confirmation, and the undo stack.
#[derive(Debug, Clone)]
pub struct SafetyConfig {
    /// Directory (relative to the workspace) holding backup snapshots.
    pub backup_dir: PathBuf,
    /// Undo stack capacity; oldest entries are evicted silently.
    pub max_undo_steps: usize,
    /// How long the confirmation gate waits before auto-approving. Set
    /// very high to effectively require an explicit answer.
    pub confirm_timeout: Duration,
    /// Content length above which a warning (not a block) is raised.
    pub large_content_threshold: usize,
    /// Backups older than this are swept by `cleanup_backups`.
    pub backup_max_age: Duration,
    /// Basenames that always require confirmation to touch.
    pub critical_files: Vec<String>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from(".cinder-backups"),
            max_undo_steps: 10,
            confirm_timeout: Duration::from_secs(10),
            large_content_threshold: 10_000,
            backup_max_age: Duration::from_secs(24 * 60 * 60),
            critical_files: vec![
                "package.json".into(),
                "package-lock.json".into(),
                "yarn.lock".into(),
                "Cargo.toml".into(),
                "Cargo.lock".into(),
                ".gitignore".into(),
                "README.md".into(),
            ],
        }
    }
}
