//! The agent pipeline
//!
//! Turns a free-text request plus retrieved codebase context into a
//! validated action list, and orchestrates the full request lifecycle.
//!
//! Key components:
//! - `analyzer` - heuristic intent/complexity/keyword classification
//! - `session` - per-workspace continuity state and follow-up detection
//! - `retriever` - session-aware + semantic context bundles
//! - `prompt` - system prompt assembly
//! - `parser` - multi-strategy recovery parser for model output
//! - `state` - phase machine and progress observation
//! - `orchestrator` - the glue; single public entry point

pub mod analyzer;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod retriever;
pub mod session;
pub mod state;

pub use analyzer::{Complexity, CurrentFile, Intent, RequestAnalysis};
pub use orchestrator::{AgentOrchestrator, ProcessOutcome};
pub use parser::{AgentAction, ParsedResponse};
pub use session::{Continuity, SessionManager};
pub use state::{Phase, ProgressObserver};
