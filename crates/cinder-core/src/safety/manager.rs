//! Action validation, gated execution, and undo
//!
//! One confirmation decision covers a whole batch; a denial aborts it with
//! no filesystem change. Past that gate, execution is partial-failure by
//! design: each action applies independently, the result list always lines
//! up one to one with the input list, and a failed action never rolls back
//! its predecessors or blocks its successors.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::backup::BackupStore;
use super::undo::{UndoDetail, UndoEntry, UndoStack, UndoStep};
use crate::agent::parser::AgentAction;
use crate::config::SafetyConfig;
use crate::error::AgentError;

/// Outcome of validating one action against a scope set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionValidation {
    pub valid: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub requires_confirmation: bool,
    /// Path falls outside the supplied scope set.
    pub scoped_violation: bool,
}

/// Aggregate validation for a whole batch. Scope violations never
/// invalidate the batch by themselves; they elevate it to a confirmation
/// requirement.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchValidation {
    pub valid: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub requires_confirmation: bool,
    pub scoped_violations: Vec<String>,
}

/// Line counts for an edit, shown to the user alongside the result.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LineDiff {
    pub added: usize,
    pub removed: usize,
}

/// Outcome of one action. `executed` is false for validation failures,
/// declined confirmations, and IO errors alike; `error` says which.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub kind: String,
    pub path: String,
    pub executed: bool,
    pub error: Option<String>,
    pub diff: Option<LineDiff>,
    pub timestamp: DateTime<Utc>,
}

impl ActionResult {
    fn failure(action: &AgentAction, error: String) -> Self {
        Self {
            kind: action.kind().to_string(),
            path: action.path().to_string(),
            executed: false,
            error: Some(error),
            diff: None,
            timestamp: Utc::now(),
        }
    }
}

/// Answers one confirmation request per risky batch; denial aborts the
/// whole batch before any mutation. The executor wraps the call in a
/// timeout and auto-approves on expiry, so a gate that never answers
/// degrades to unattended mode instead of hanging.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, actions: &[AgentAction], validation: &BatchValidation) -> bool;
}

/// Gate that approves everything immediately. Used headless and in tests.
pub struct AutoApprove;

#[async_trait]
impl ConfirmationGate for AutoApprove {
    async fn confirm(&self, _actions: &[AgentAction], _validation: &BatchValidation) -> bool {
        true
    }
}

/// Guards every filesystem mutation the agent proposes.
pub struct SafetyManager {
    workspace: PathBuf,
    cfg: SafetyConfig,
    backups: BackupStore,
    undo: UndoStack,
    /// Undo stack snapshot, so undo works across process restarts.
    undo_path: PathBuf,
}

impl SafetyManager {
    pub fn new(workspace: impl Into<PathBuf>, cfg: SafetyConfig) -> Self {
        let workspace = workspace.into();
        let backups = BackupStore::new(&workspace, &cfg.backup_dir);
        let undo_path = workspace.join(&cfg.backup_dir).join("undo.json");
        let undo = Self::load_undo(&undo_path, cfg.max_undo_steps);
        Self {
            workspace,
            cfg,
            backups,
            undo,
            undo_path,
        }
    }

    fn load_undo(path: &Path, capacity: usize) -> UndoStack {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Vec<UndoStep>>(&raw) {
                Ok(steps) => UndoStack::restore(capacity, steps),
                Err(err) => {
                    warn!("discarding corrupt undo snapshot: {err}");
                    UndoStack::new(capacity)
                }
            },
            Err(_) => UndoStack::new(capacity),
        }
    }

    fn persist_undo(&self) {
        let write = || -> Result<(), std::io::Error> {
            if let Some(parent) = self.undo_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let raw = serde_json::to_string(self.undo.snapshot())?;
            std::fs::write(&self.undo_path, raw)
        };
        if let Err(err) = write() {
            warn!("failed to persist undo stack: {err}");
        }
    }

    /// Static checks for one action, no filesystem access. An empty scope
    /// set means no scope restriction. Scope violations, deletions, and
    /// critical files require confirmation; oversized content only warns.
    pub fn validate(&self, action: &AgentAction, scope: &[String]) -> ActionValidation {
        let mut v = ActionValidation {
            valid: true,
            ..Default::default()
        };

        let path = action.path();
        if path.trim().is_empty() {
            v.valid = false;
            v.errors.push("action has an empty path".to_string());
            return v;
        }

        if !scope.is_empty() && !scope.iter().any(|s| s == path) {
            v.scoped_violation = true;
            v.requires_confirmation = true;
            v.warnings
                .push(format!("{path} is outside the operation's scope"));
        }

        if escapes_workspace(path) {
            v.requires_confirmation = true;
            v.warnings
                .push(format!("path {path} points outside the workspace"));
        }

        if matches!(action, AgentAction::DeleteFile { .. }) {
            v.requires_confirmation = true;
            v.warnings.push(format!("deletes {path}"));
        }

        if let Some(name) = Path::new(path).file_name().and_then(|n| n.to_str()) {
            if self.cfg.critical_files.iter().any(|c| c == name) {
                v.requires_confirmation = true;
                v.warnings.push(format!("{name} is a critical project file"));
            }
        }

        if let Some(content) = action.content() {
            if content.len() > self.cfg.large_content_threshold {
                v.warnings.push(format!(
                    "content is large ({} characters)",
                    content.len()
                ));
            }
        }

        v
    }

    /// Validate a whole batch against a scope set.
    pub fn validate_batch(&self, actions: &[AgentAction], scope: &[String]) -> BatchValidation {
        let mut batch = BatchValidation {
            valid: true,
            ..Default::default()
        };

        for action in actions {
            let v = self.validate(action, scope);
            batch.valid &= v.valid;
            batch.warnings.extend(v.warnings);
            batch.errors.extend(v.errors);
            batch.requires_confirmation |= v.requires_confirmation;
            if v.scoped_violation {
                batch.scoped_violations.push(action.path().to_string());
            }
        }
        batch
    }

    /// Execute a batch. One confirmation covers the whole batch; denial
    /// aborts it before any filesystem change. After approval each action
    /// runs independently, and the returned list always has one entry per
    /// input action, in order.
    pub async fn execute(
        &mut self,
        actions: &[AgentAction],
        scope: &[String],
        gate: &dyn ConfirmationGate,
    ) -> Result<Vec<ActionResult>, AgentError> {
        let batch = self.validate_batch(actions, scope);

        if batch.requires_confirmation {
            let approved = match tokio::time::timeout(
                self.cfg.confirm_timeout,
                gate.confirm(actions, &batch),
            )
            .await
            {
                Ok(answer) => answer,
                Err(_) => {
                    warn!("confirmation timed out, auto-approving batch");
                    true
                }
            };
            if !approved {
                return Err(AgentError::ConfirmationDenied);
            }
        }

        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            let validation = self.validate(action, scope);
            if !validation.valid {
                results.push(ActionResult::failure(action, validation.errors.join("; ")));
                continue;
            }
            results.push(self.apply(action));
        }

        let executed = results.iter().filter(|r| r.executed).count();
        info!("executed {executed}/{} actions", actions.len());
        Ok(results)
    }

    fn apply(&mut self, action: &AgentAction) -> ActionResult {
        let outcome = match action {
            AgentAction::CreateFile { path, content, .. } => self.write_file(path, content),
            AgentAction::EditFile { path, content, .. } => self.write_file(path, content),
            AgentAction::DeleteFile { path, .. } => self.delete_file(path),
            AgentAction::CreateFolder { path, .. } => self.create_folder(path),
        };

        match outcome {
            Ok(diff) => ActionResult {
                kind: action.kind().to_string(),
                path: action.path().to_string(),
                executed: true,
                error: None,
                diff,
                timestamp: Utc::now(),
            },
            Err(err) => ActionResult::failure(action, err.to_string()),
        }
    }

    /// Create or overwrite. Existing content is backed up first and the
    /// undo entry restores it; a genuinely new file undoes by removal.
    fn write_file(&mut self, rel_path: &str, content: &str) -> Result<Option<LineDiff>, AgentError> {
        let full = self.workspace.join(rel_path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|err| AgentError::io(parent, err))?;
        }

        let previous = match std::fs::read_to_string(&full) {
            Ok(existing) => Some(existing),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(AgentError::io(&full, err)),
        };

        let (entry, diff) = match &previous {
            Some(existing) => {
                let backup_key = self.backups.save(rel_path, existing)?;
                (
                    UndoEntry::Restore {
                        path: rel_path.to_string(),
                        backup_key,
                    },
                    Some(line_diff(existing, content)),
                )
            }
            None => (
                UndoEntry::RemoveFile {
                    path: rel_path.to_string(),
                },
                None,
            ),
        };

        std::fs::write(&full, content).map_err(|err| AgentError::io(&full, err))?;
        self.record_undo(entry, if previous.is_some() { "edit_file" } else { "create_file" });
        debug!("wrote {rel_path} ({} bytes)", content.len());
        Ok(diff)
    }

    fn delete_file(&mut self, rel_path: &str) -> Result<Option<LineDiff>, AgentError> {
        let full = self.workspace.join(rel_path);
        let existing =
            std::fs::read_to_string(&full).map_err(|err| AgentError::io(&full, err))?;
        let backup_key = self.backups.save(rel_path, &existing)?;

        std::fs::remove_file(&full).map_err(|err| AgentError::io(&full, err))?;
        self.record_undo(
            UndoEntry::Restore {
                path: rel_path.to_string(),
                backup_key,
            },
            "delete_file",
        );
        debug!("deleted {rel_path}");
        Ok(None)
    }

    fn create_folder(&mut self, rel_path: &str) -> Result<Option<LineDiff>, AgentError> {
        let full = self.workspace.join(rel_path);
        let existed = full.is_dir();
        std::fs::create_dir_all(&full).map_err(|err| AgentError::io(&full, err))?;
        if !existed {
            self.record_undo(
                UndoEntry::RemoveFolder {
                    path: rel_path.to_string(),
                },
                "create_folder",
            );
        }
        Ok(None)
    }

    /// Eviction is silent; the evicted step's backup stays on disk for the
    /// age sweep so a restore by hand is still possible.
    fn record_undo(&mut self, entry: UndoEntry, kind: &str) {
        if let Some(evicted) = self.undo.push(entry, kind) {
            debug!("undo stack full, dropped step for {}", evicted.entry.path());
        }
        self.persist_undo();
    }

    /// Reverse the step at `index` (0 is most recent). Returns the path
    /// that was reverted.
    pub fn undo(&mut self, index: usize) -> Result<String, AgentError> {
        let step = self
            .undo
            .remove(index)
            .ok_or_else(|| AgentError::Validation(format!("no undo step at index {index}")))?;
        self.persist_undo();

        let path = step.entry.path().to_string();
        match &step.entry {
            UndoEntry::RemoveFile { path } => {
                let full = self.workspace.join(path);
                std::fs::remove_file(&full).map_err(|err| AgentError::io(&full, err))?;
            }
            UndoEntry::RemoveFolder { path } => {
                let full = self.workspace.join(path);
                std::fs::remove_dir(&full).map_err(|err| AgentError::io(&full, err))?;
            }
            UndoEntry::Restore { path, backup_key } => {
                let content = self.backups.load(backup_key)?;
                let full = self.workspace.join(path);
                if let Some(parent) = full.parent() {
                    std::fs::create_dir_all(parent).map_err(|err| AgentError::io(parent, err))?;
                }
                std::fs::write(&full, content).map_err(|err| AgentError::io(&full, err))?;
                self.backups.remove(backup_key);
            }
        }

        info!("undid {} on {path}", step.action_kind);
        Ok(path)
    }

    /// Undo several steps in one call. Indices refer to the current stack
    /// and are applied highest first so earlier removals do not shift later
    /// ones.
    pub fn undo_multiple(&mut self, indices: &[usize]) -> Vec<Result<String, AgentError>> {
        let mut ordered: Vec<usize> = indices.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));
        ordered.dedup();

        ordered.into_iter().map(|i| self.undo(i)).collect()
    }

    pub fn undo_details(&self) -> Vec<UndoDetail> {
        self.undo.details()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn clear_undo(&mut self) {
        self.undo.clear();
        self.persist_undo();
    }

    /// Sweep backups past the configured age. Returns how many were
    /// removed.
    pub fn cleanup_backups(&self) -> usize {
        self.backups.sweep(self.cfg.backup_max_age)
    }
}

/// True when a relative path would resolve outside the workspace root.
fn escapes_workspace(rel_path: &str) -> bool {
    let path = Path::new(rel_path);
    if path.is_absolute() {
        return true;
    }

    let mut depth: isize = 0;
    for component in path.components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            Component::Normal(_) => depth += 1,
            _ => {}
        }
    }
    false
}

/// Line-level added/removed counts, order-insensitive. Good enough for a
/// result summary, not a real diff.
fn line_diff(old: &str, new: &str) -> LineDiff {
    let old_lines: HashSet<&str> = old.lines().collect();
    let new_lines: HashSet<&str> = new.lines().collect();

    LineDiff {
        added: new_lines.difference(&old_lines).count(),
        removed: old_lines.difference(&new_lines).count(),
    }
}
