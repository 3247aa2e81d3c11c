//! Pre-mutation backup snapshots
//!
//! One flat directory of snapshot files. Keys combine the sanitized source
//! path, a timestamp, and a process-wide monotonic counter, so two backups
//! of the same file in the same millisecond still get distinct keys.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::error::AgentError;

static BACKUP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Owns the backup directory under the workspace.
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    pub fn new(workspace: &Path, backup_dir: &Path) -> Self {
        Self {
            dir: workspace.join(backup_dir),
        }
    }

    /// Snapshot `content` as the pre-change state of `rel_path`. Returns
    /// the backup key used for restore.
    pub fn save(&self, rel_path: &str, content: &str) -> Result<String, AgentError> {
        std::fs::create_dir_all(&self.dir).map_err(|err| AgentError::io(&self.dir, err))?;

        let key = self.make_key(rel_path);
        let target = self.dir.join(&key);
        std::fs::write(&target, content).map_err(|err| AgentError::io(&target, err))?;
        debug!("backed up {rel_path} as {key}");
        Ok(key)
    }

    /// Read a snapshot back. Missing snapshots (already swept) surface as
    /// not-found errors.
    pub fn load(&self, key: &str) -> Result<String, AgentError> {
        let path = self.dir.join(key);
        std::fs::read_to_string(&path).map_err(|err| AgentError::io(&path, err))
    }

    pub fn remove(&self, key: &str) {
        let path = self.dir.join(key);
        if let Err(err) = std::fs::remove_file(&path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove backup {key}: {err}");
            }
        }
    }

    /// Delete snapshots older than `max_age`. Returns how many were
    /// removed; unreadable entries are skipped.
    pub fn sweep(&self, max_age: Duration) -> usize {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let now = SystemTime::now();
        let mut removed = 0;
        for entry in entries.flatten() {
            let Ok(meta) = entry.metadata() else { continue };
            let Ok(modified) = meta.modified() else { continue };
            let expired = now
                .duration_since(modified)
                .map(|age| age > max_age)
                .unwrap_or(false);
            if expired && std::fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!("swept {removed} expired backups");
        }
        removed
    }

    /// `src/App.jsx` at t=1700000000000 with seq 7 becomes
    /// `src_App.jsx.1700000000000.7.bak`.
    fn make_key(&self, rel_path: &str) -> String {
        let sanitized: String = rel_path
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        let millis = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let seq = BACKUP_SEQ.fetch_add(1, Ordering::Relaxed);
        format!("{sanitized}.{millis}.{seq}.bak")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> BackupStore {
        BackupStore::new(dir.path(), &PathBuf::from(".backups"))
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let key = store.save("src/App.jsx", "original content").unwrap();
        assert_eq!(store.load(&key).unwrap(), "original content");
    }

    #[test]
    fn test_same_path_gets_distinct_keys() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let a = store.save("src/App.jsx", "v1").unwrap();
        let b = store.save("src/App.jsx", "v2").unwrap();
        assert_ne!(a, b);
        assert_eq!(store.load(&a).unwrap(), "v1");
        assert_eq!(store.load(&b).unwrap(), "v2");
    }

    #[test]
    fn test_load_missing_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save("a.txt", "x").unwrap();

        let err = store.load("nope.bak").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_sweep_keeps_fresh_backups() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let key = store.save("a.txt", "x").unwrap();

        assert_eq!(store.sweep(Duration::from_secs(3600)), 0);
        assert!(store.load(&key).is_ok());
    }

    #[test]
    fn test_sweep_removes_expired_backups() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let key = store.save("a.txt", "x").unwrap();

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(store.sweep(Duration::ZERO), 1);
        assert!(store.load(&key).unwrap_err().is_not_found());
    }
}
