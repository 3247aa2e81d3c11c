//! Request lifecycle orchestration
//!
//! The single public entry point. One request at a time per orchestrator:
//! the whole pipeline runs under one lock, so a second `process` call
//! queues behind the first instead of interleaving index updates and
//! session writes.
//!
//! `process` never returns an error and never panics across this boundary.
//! Pipeline failures (provider down, model timeout) come back as a failed
//! outcome; per-action failures live inside the result list of a
//! successful outcome.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use super::analyzer;
pub use super::analyzer::CurrentFile;
use super::parser::{self, AgentAction};
use super::prompt;
use super::retriever;
use super::session::{SessionManager, SessionStats};
use super::state::{LogObserver, Phase, ProgressObserver};
use crate::ai::{CompletionOptions, LlmProvider};
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::index::indexer::{CodebaseIndexer, IndexReport, IndexStats, SearchHit};
use crate::safety::manager::{ActionResult, AutoApprove, ConfirmationGate};
use crate::safety::undo::UndoDetail;
use crate::safety::SafetyManager;

/// How much context backed one request.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ContextStats {
    pub chunks_used: usize,
    pub files_used: usize,
    pub total_files: usize,
    pub total_chunks: usize,
}

/// Terminal report of one `process` call. `success` reflects the pipeline,
/// not individual actions: a run where one action failed to apply still
/// succeeds, with the failure recorded in `results`.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub success: bool,
    pub operation_id: String,
    pub analysis: String,
    pub explanation: String,
    pub results: Vec<ActionResult>,
    pub modified_files: Vec<String>,
    pub context_stats: ContextStats,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub phase: Phase,
}

struct Inner {
    indexer: CodebaseIndexer,
    safety: SafetyManager,
    session: SessionManager,
}

/// Owns the full pipeline: index, retrieval, model call, parsing, gated
/// execution, re-index, session bookkeeping.
pub struct AgentOrchestrator {
    config: AgentConfig,
    provider: Arc<dyn LlmProvider>,
    gate: Arc<dyn ConfirmationGate>,
    observer: Arc<dyn ProgressObserver>,
    inner: Mutex<Inner>,
}

impl AgentOrchestrator {
    pub fn new(config: AgentConfig, provider: Arc<dyn LlmProvider>) -> Self {
        let indexer = CodebaseIndexer::new(config.workspace.clone(), config.index.clone());
        let safety = SafetyManager::new(config.workspace.clone(), config.safety.clone());
        Self {
            config,
            provider,
            gate: Arc::new(AutoApprove),
            observer: Arc::new(LogObserver),
            inner: Mutex::new(Inner {
                indexer,
                safety,
                session: SessionManager::new(),
            }),
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn ConfirmationGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Full pass over the workspace. Run once at startup; later passes are
    /// cheap because unchanged files are hash-gated out.
    pub async fn index_workspace(&self) -> IndexReport {
        self.inner.lock().await.indexer.index_all()
    }

    /// Run one request end to end.
    pub async fn process(&self, request: &str, current_file: Option<CurrentFile>) -> ProcessOutcome {
        let mut inner = self.inner.lock().await;
        let started = Instant::now();
        let operation_id = Uuid::new_v4().to_string();
        info!("processing request {operation_id}: {request:?}");

        self.observer.on_phase(Phase::Analyzing);
        let analysis = analyzer::analyze(request, current_file.as_ref());

        self.observer.on_phase(Phase::RetrievingContext);
        let context = retriever::retrieve(&inner.indexer, &inner.session, &analysis, request);
        let context_stats = ContextStats {
            chunks_used: context.chunks.len(),
            files_used: context.files.len(),
            total_files: context.total_files,
            total_chunks: context.total_chunks,
        };
        let system_prompt =
            prompt::build_system_prompt(&analysis, &context, current_file.as_ref());

        self.observer.on_phase(Phase::AwaitingModel);
        let options = CompletionOptions {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };
        let raw = match tokio::time::timeout(
            self.config.request_timeout,
            self.provider.complete(&system_prompt, request, &options),
        )
        .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => return self.fail(operation_id, err, started),
            Err(_) => {
                return self.fail(
                    operation_id,
                    AgentError::Timeout(self.config.request_timeout.as_secs()),
                    started,
                )
            }
        };

        self.observer.on_phase(Phase::Parsing);
        let parsed = parser::parse(&raw);

        // Retrieval scope doubles as the mutation scope: touching files the
        // context never surfaced elevates the batch to a confirmation.
        self.observer.on_phase(Phase::Validating);
        let batch = inner.safety.validate_batch(&parsed.actions, &context.files);
        if batch.requires_confirmation {
            self.observer.on_phase(Phase::AwaitingConfirmation);
        }

        self.observer.on_phase(Phase::Executing);
        let results = match inner
            .safety
            .execute(&parsed.actions, &context.files, self.gate.as_ref())
            .await
        {
            Ok(results) => results,
            Err(err) => return self.fail(operation_id, err, started),
        };

        self.observer.on_phase(Phase::Reindexing);
        let modified_files: Vec<String> = results
            .iter()
            .filter(|r| r.executed)
            .map(|r| r.path.clone())
            .collect();
        if !modified_files.is_empty() {
            inner.indexer.update_index(&modified_files);
        }

        let executed_pairs: Vec<(String, String)> = results
            .iter()
            .filter(|r| r.executed)
            .map(|r| (r.kind.clone(), r.path.clone()))
            .collect();
        inner.session.record_operation(
            &operation_id,
            request,
            &parsed.analysis,
            executed_pairs,
            modified_files.clone(),
        );

        self.observer.on_phase(Phase::Done);
        ProcessOutcome {
            success: true,
            operation_id,
            analysis: parsed.analysis,
            explanation: parsed.explanation,
            results,
            modified_files,
            context_stats,
            duration_ms: started.elapsed().as_millis() as u64,
            error: None,
            phase: Phase::Done,
        }
    }

    fn fail(&self, operation_id: String, err: AgentError, started: Instant) -> ProcessOutcome {
        error!("request {operation_id} failed: {err}");
        self.observer.on_phase(Phase::Failed);
        ProcessOutcome {
            success: false,
            operation_id,
            analysis: String::new(),
            explanation: String::new(),
            results: Vec::new(),
            modified_files: Vec::new(),
            context_stats: ContextStats::default(),
            duration_ms: started.elapsed().as_millis() as u64,
            error: Some(err.to_string()),
            phase: Phase::Failed,
        }
    }

    pub async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        self.inner.lock().await.indexer.search(query, limit)
    }

    pub async fn index_stats(&self) -> IndexStats {
        self.inner.lock().await.indexer.stats()
    }

    pub async fn undo(&self, index: usize) -> Result<String, AgentError> {
        self.inner.lock().await.safety.undo(index)
    }

    pub async fn undo_multiple(&self, indices: &[usize]) -> Vec<Result<String, AgentError>> {
        self.inner.lock().await.safety.undo_multiple(indices)
    }

    pub async fn undo_details(&self) -> Vec<UndoDetail> {
        self.inner.lock().await.safety.undo_details()
    }

    pub async fn session_stats(&self) -> SessionStats {
        self.inner.lock().await.session.stats()
    }

    pub async fn clear_session(&self) {
        self.inner.lock().await.session.clear();
    }

    pub async fn clear_undo(&self) {
        self.inner.lock().await.safety.clear_undo();
    }

    /// Sweep expired backups; returns how many were removed.
    pub async fn cleanup_backups(&self) -> usize {
        self.inner.lock().await.safety.cleanup_backups()
    }

    /// Validate without executing, for previews. No scope restriction.
    pub async fn preview(&self, actions: &[AgentAction]) -> crate::safety::BatchValidation {
        self.inner.lock().await.safety.validate_batch(actions, &[])
    }
}
