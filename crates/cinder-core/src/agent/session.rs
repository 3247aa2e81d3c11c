//! Per-workspace session state
//!
//! Tracks conversation continuity so follow-up requests ("make it blue")
//! carry the previous operation's files and context instead of starting a
//! fresh semantic search.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Cap on the operation history ring.
const MAX_HISTORY: usize = 10;
/// How many recent operations feed the summary string.
const SUMMARY_WINDOW: usize = 3;

/// One completed agent operation, as remembered by the session.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub request: String,
    pub analysis: String,
    /// Action kind + path pairs of the actions that actually executed.
    pub executed: Vec<(String, String)>,
}

/// Continuity context handed to retrieval and prompting.
#[derive(Debug, Clone)]
pub enum Continuity {
    /// The request continues the previous operation.
    FollowUp {
        last_request: String,
        last_files_modified: Vec<String>,
        summary: String,
    },
    /// Unrelated to the previous operation; only the summary carries over.
    NewRequest { summary: String },
}

impl Continuity {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FollowUp { .. } => "follow_up",
            Self::NewRequest { .. } => "new_request",
        }
    }
}

/// Read-only session counters.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub total_operations: usize,
    pub last_files_modified: usize,
    pub summary: String,
}

/// Conversation state for one open workspace. Created when the workspace
/// opens, updated after every completed operation, discarded on clear.
pub struct SessionManager {
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    last_files_modified: Vec<String>,
    history: VecDeque<OperationRecord>,
    summary: String,
}

impl SessionManager {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_activity: now,
            last_files_modified: Vec::new(),
            history: VecDeque::new(),
            summary: String::new(),
        }
    }

    /// Classify the request against the previous one. `None` before any
    /// operation has completed.
    pub fn continuity(&self, request: &str) -> Option<Continuity> {
        let last = self.history.back()?;

        if is_follow_up(request, &last.request) {
            debug!("follow-up request detected, carrying {} files", self.last_files_modified.len());
            Some(Continuity::FollowUp {
                last_request: last.request.clone(),
                last_files_modified: self.last_files_modified.clone(),
                summary: self.summary.clone(),
            })
        } else {
            Some(Continuity::NewRequest {
                summary: self.summary.clone(),
            })
        }
    }

    /// Record a completed operation: refresh continuity context, append to
    /// the bounded history ring, regenerate the summary.
    pub fn record_operation(
        &mut self,
        operation_id: &str,
        request: &str,
        analysis: &str,
        executed: Vec<(String, String)>,
        modified_files: Vec<String>,
    ) {
        self.last_activity = Utc::now();
        self.last_files_modified = modified_files;

        self.history.push_back(OperationRecord {
            id: operation_id.to_string(),
            timestamp: self.last_activity,
            request: request.to_string(),
            analysis: analysis.to_string(),
            executed,
        });
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }

        self.summary = self.build_summary();
    }

    pub fn last_files_modified(&self) -> &[String] {
        &self.last_files_modified
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            created_at: self.created_at,
            last_activity: self.last_activity,
            total_operations: self.history.len(),
            last_files_modified: self.last_files_modified.len(),
            summary: self.summary.clone(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    fn build_summary(&self) -> String {
        let recent: Vec<&OperationRecord> = self
            .history
            .iter()
            .rev()
            .take(SUMMARY_WINDOW)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        if recent.is_empty() {
            return "No recent operations".to_string();
        }

        recent
            .iter()
            .map(|op| {
                let mut kinds: Vec<&str> = Vec::new();
                let mut files: Vec<&str> = Vec::new();
                for (kind, path) in &op.executed {
                    if !kinds.contains(&kind.as_str()) {
                        kinds.push(kind);
                    }
                    if !files.contains(&path.as_str()) {
                        files.push(path);
                    }
                }
                format!("{} -> {} on {}", op.request, kinds.join(", "), files.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

const FOLLOW_UP_KEYWORDS: &[&str] = &[
    "make it", "make the", "make this", "make that", "add more", "add some", "improve", "enhance",
    "better", "more", "fix the", "fix this", "update the", "update this", "change", "modify",
    "adjust",
];

const COMMON_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// Keyword, pronoun, and shared-term heuristics for continuation.
fn is_follow_up(current: &str, last: &str) -> bool {
    let lower = current.to_lowercase();

    let has_keyword = FOLLOW_UP_KEYWORDS.iter().any(|k| lower.contains(k));
    let has_pronoun = lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| matches!(w, "it" | "this" | "that" | "them" | "those"));

    has_keyword || has_pronoun || shares_terms(current, last)
}

/// At least two meaningful terms in common with the previous request.
fn shares_terms(current: &str, last: &str) -> bool {
    let meaningful = |text: &str| -> Vec<String> {
        text.to_lowercase()
            .split_whitespace()
            .filter(|w| w.len() > 2 && !COMMON_WORDS.contains(w))
            .map(str::to_string)
            .collect()
    };

    let last_terms = meaningful(last);
    meaningful(current)
        .iter()
        .filter(|w| last_terms.contains(w))
        .count()
        >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(session: &mut SessionManager, request: &str) {
        session.record_operation(
            "op-1",
            request,
            "did the thing",
            vec![("create_file".into(), "src/Footer.jsx".into())],
            vec!["src/Footer.jsx".into()],
        );
    }

    #[test]
    fn test_no_continuity_before_first_operation() {
        let session = SessionManager::new();
        assert!(session.continuity("add a footer").is_none());
    }

    #[test]
    fn test_pronoun_marks_follow_up() {
        let mut session = SessionManager::new();
        record(&mut session, "create a footer component");

        match session.continuity("now center it").unwrap() {
            Continuity::FollowUp {
                last_files_modified, ..
            } => assert_eq!(last_files_modified, vec!["src/Footer.jsx"]),
            other => panic!("expected follow-up, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_shared_terms_mark_follow_up() {
        let mut session = SessionManager::new();
        record(&mut session, "create a footer component");

        let continuity = session.continuity("style footer component darker").unwrap();
        assert_eq!(continuity.kind(), "follow_up");
    }

    #[test]
    fn test_unrelated_request_is_new() {
        let mut session = SessionManager::new();
        record(&mut session, "create a footer component");

        let continuity = session.continuity("delete stale migrations").unwrap();
        assert_eq!(continuity.kind(), "new_request");
    }

    #[test]
    fn test_history_is_bounded() {
        let mut session = SessionManager::new();
        for i in 0..15 {
            record(&mut session, &format!("request number {i}"));
        }
        assert_eq!(session.stats().total_operations, MAX_HISTORY);
    }

    #[test]
    fn test_summary_covers_recent_operations() {
        let mut session = SessionManager::new();
        record(&mut session, "create a footer");
        let summary = session.stats().summary;
        assert!(summary.contains("create a footer"));
        assert!(summary.contains("src/Footer.jsx"));
    }
}
