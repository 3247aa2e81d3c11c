//! Cinder core - an AI coding agent over an indexed workspace
//!
//! The pipeline: [`index`] maintains an incremental, queryable index of a
//! directory tree; [`agent`] turns a free-text request plus retrieved
//! context into a validated action list; [`safety`] gatekeeps and executes
//! those actions against the live filesystem with backup/undo support.
//!
//! Key components:
//! - `index` - scan/chunk/embed pipeline and semantic search
//! - `agent` - request analysis, context retrieval, response parsing, orchestration
//! - `safety` - scope/risk validation, backups, bounded undo history
//! - `ai` - model provider trait and the OpenRouter-format client
//! - `config` - explicit runtime configuration (no global state)

pub mod agent;
pub mod ai;
pub mod config;
pub mod error;
pub mod index;
pub mod safety;

pub use agent::orchestrator::{AgentOrchestrator, CurrentFile, ProcessOutcome};
pub use agent::parser::{AgentAction, ParsedResponse};
pub use config::{AgentConfig, IndexConfig, SafetyConfig};
pub use error::AgentError;
pub use index::indexer::CodebaseIndexer;
pub use safety::manager::{ActionResult, SafetyManager};
