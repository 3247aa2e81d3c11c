//! Bounded undo stack
//!
//! Each entry describes how to reverse one executed action. Capacity is
//! fixed; pushing onto a full stack silently drops the oldest entry. The
//! dropped entry's backup file stays on disk until the age sweep collects
//! it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How to reverse one executed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum UndoEntry {
    /// A file was created; undo deletes it.
    RemoveFile { path: String },
    /// A folder was created; undo removes it if still empty.
    RemoveFolder { path: String },
    /// A file was overwritten or deleted; undo restores the snapshot.
    Restore { path: String, backup_key: String },
}

impl UndoEntry {
    pub fn path(&self) -> &str {
        match self {
            Self::RemoveFile { path }
            | Self::RemoveFolder { path }
            | Self::Restore { path, .. } => path,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::RemoveFile { .. } => "remove created file",
            Self::RemoveFolder { .. } => "remove created folder",
            Self::Restore { .. } => "restore previous content",
        }
    }
}

/// One recorded step, newest first in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoStep {
    pub entry: UndoEntry,
    pub action_kind: String,
    pub timestamp: DateTime<Utc>,
}

/// What a UI shows for one undoable step.
#[derive(Debug, Clone, Serialize)]
pub struct UndoDetail {
    /// Index to pass to `remove`; 0 is the most recent step.
    pub index: usize,
    pub path: String,
    pub action_kind: String,
    pub description: &'static str,
    pub timestamp: DateTime<Utc>,
}

pub struct UndoStack {
    steps: Vec<UndoStep>,
    capacity: usize,
}

impl UndoStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            steps: Vec::new(),
            capacity,
        }
    }

    /// Push a step, evicting the oldest when full. Returns the evicted
    /// step so the caller can decide what to do with its backup.
    pub fn push(&mut self, entry: UndoEntry, action_kind: &str) -> Option<UndoStep> {
        self.steps.push(UndoStep {
            entry,
            action_kind: action_kind.to_string(),
            timestamp: Utc::now(),
        });
        if self.steps.len() > self.capacity {
            return Some(self.steps.remove(0));
        }
        None
    }

    /// Take the step at `index`, where 0 is the most recent.
    pub fn remove(&mut self, index: usize) -> Option<UndoStep> {
        if index >= self.steps.len() {
            return None;
        }
        let actual = self.steps.len() - 1 - index;
        Some(self.steps.remove(actual))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Oldest-first snapshot for persistence.
    pub fn snapshot(&self) -> &[UndoStep] {
        &self.steps
    }

    /// Rebuild from a persisted snapshot, truncating to capacity from the
    /// oldest end.
    pub fn restore(capacity: usize, mut steps: Vec<UndoStep>) -> Self {
        if steps.len() > capacity {
            steps.drain(..steps.len() - capacity);
        }
        Self { steps, capacity }
    }

    /// Newest-first listing for display.
    pub fn details(&self) -> Vec<UndoDetail> {
        self.steps
            .iter()
            .rev()
            .enumerate()
            .map(|(index, step)| UndoDetail {
                index,
                path: step.entry.path().to_string(),
                action_kind: step.action_kind.clone(),
                description: step.entry.describe(),
                timestamp: step.timestamp,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_n(stack: &mut UndoStack, n: usize) {
        for i in 0..n {
            stack.push(
                UndoEntry::RemoveFile {
                    path: format!("file{i}.txt"),
                },
                "create_file",
            );
        }
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut stack = UndoStack::new(3);
        push_n(&mut stack, 3);
        assert!(stack
            .push(
                UndoEntry::RemoveFile {
                    path: "file3.txt".into()
                },
                "create_file"
            )
            .is_some_and(|evicted| evicted.entry.path() == "file0.txt"));
        assert_eq!(stack.len(), 3);
    }

    #[test]
    fn test_index_zero_is_most_recent() {
        let mut stack = UndoStack::new(10);
        push_n(&mut stack, 3);

        let step = stack.remove(0).unwrap();
        assert_eq!(step.entry.path(), "file2.txt");
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_out_of_range_index_is_none() {
        let mut stack = UndoStack::new(10);
        push_n(&mut stack, 2);
        assert!(stack.remove(5).is_none());
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_details_are_newest_first() {
        let mut stack = UndoStack::new(10);
        push_n(&mut stack, 3);

        let details = stack.details();
        assert_eq!(details[0].path, "file2.txt");
        assert_eq!(details[0].index, 0);
        assert_eq!(details[2].path, "file0.txt");
    }
}
