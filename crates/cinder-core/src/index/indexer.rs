//! Incremental codebase indexing and search
//!
//! Owns every index structure (file records, chunks, embeddings, the
//! dependency graph). Re-indexing is hash-gated: a file whose content hash
//! is unchanged costs one read and one comparison, nothing more. A single
//! unreadable file is logged and skipped; it never aborts the pass.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::chunker::{self, Chunk};
use super::dependencies::{self, DependencyRecord};
use super::embedding::{self, Embedding};
use super::hash::content_hash;
use super::language::{self, FileCategory};
use crate::config::IndexConfig;
use crate::error::AgentError;

/// One indexed file. Replaced, not mutated, when the hash changes.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
    pub hash: String,
    pub language: &'static str,
    pub category: FileCategory,
    pub size: u64,
    pub indexed_at: DateTime<Utc>,
}

struct EmbeddingEntry {
    chunk_id: String,
    file_path: String,
    embedding: Embedding,
}

/// A scored search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub score: f32,
}

/// Shaped output of [`CodebaseIndexer::get_context`].
#[derive(Debug, Clone, Default)]
pub struct ContextBundle {
    pub relevant_chunks: Vec<Chunk>,
    /// Deduplicated, order of first appearance.
    pub relevant_files: Vec<String>,
    pub total_files: usize,
    pub total_chunks: usize,
}

/// Read-only introspection counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub total_files: usize,
    pub total_chunks: usize,
    pub total_embeddings: usize,
    pub languages: HashMap<String, usize>,
    pub categories: HashMap<String, usize>,
}

/// Summary of one full or partial index pass.
#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub files_indexed: usize,
    pub files_unchanged: usize,
    pub files_failed: usize,
    pub duration_ms: u64,
}

/// Maintains an up-to-date, queryable index of a directory tree.
pub struct CodebaseIndexer {
    workspace: PathBuf,
    cfg: IndexConfig,
    substrings: Vec<String>,
    wildcards: Vec<Regex>,
    files: HashMap<String, FileRecord>,
    chunks: HashMap<String, Vec<Chunk>>,
    dependency_graph: HashMap<String, DependencyRecord>,
    /// Insertion order of file paths; keeps search tie-breaks stable.
    file_order: Vec<String>,
    embeddings: Vec<EmbeddingEntry>,
}

impl CodebaseIndexer {
    pub fn new(workspace: impl Into<PathBuf>, cfg: IndexConfig) -> Self {
        let mut substrings = Vec::new();
        let mut wildcards = Vec::new();
        for pattern in &cfg.ignore_patterns {
            if pattern.contains('*') {
                let escaped = regex::escape(&pattern.to_lowercase()).replace(r"\*", ".*");
                match Regex::new(&escaped) {
                    Ok(re) => wildcards.push(re),
                    Err(err) => warn!("invalid ignore pattern {pattern}: {err}"),
                }
            } else {
                substrings.push(pattern.to_lowercase());
            }
        }

        Self {
            workspace: workspace.into(),
            cfg,
            substrings,
            wildcards,
            files: HashMap::new(),
            chunks: HashMap::new(),
            dependency_graph: HashMap::new(),
            file_order: Vec::new(),
            embeddings: Vec::new(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Recursively index the whole tree. Unchanged files (by content hash)
    /// are skipped; unreadable files are logged and skipped.
    pub fn index_all(&mut self) -> IndexReport {
        let started = Instant::now();
        let mut report = IndexReport::default();

        for rel_path in self.scan_tree() {
            match self.process_file(&rel_path) {
                Ok(true) => report.files_indexed += 1,
                Ok(false) => report.files_unchanged += 1,
                Err(err) => {
                    warn!("skipping {rel_path}: {err}");
                    report.files_failed += 1;
                }
            }
        }

        self.rebuild_derived();
        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "indexed {} files ({} unchanged, {} failed) in {}ms",
            report.files_indexed, report.files_unchanged, report.files_failed, report.duration_ms
        );
        report
    }

    /// Re-index a small changed set, typically right after the agent wrote
    /// files. Paths that no longer exist are treated as deletions; paths
    /// never seen before are indexed fresh.
    pub fn update_index(&mut self, changed: &[String]) -> IndexReport {
        let started = Instant::now();
        let mut report = IndexReport::default();

        for rel_path in changed {
            match self.process_file(rel_path) {
                Ok(true) => report.files_indexed += 1,
                Ok(false) => report.files_unchanged += 1,
                Err(err) if err.is_not_found() => {
                    debug!("removing deleted file {rel_path} from index");
                    self.remove_file(rel_path);
                }
                Err(err) => {
                    warn!("skipping {rel_path}: {err}");
                    report.files_failed += 1;
                }
            }
        }

        self.rebuild_derived();
        report.duration_ms = started.elapsed().as_millis() as u64;
        report
    }

    /// Rank every stored chunk against the query. Descending score; ties
    /// keep insertion order (stable sort). Empty index yields an empty
    /// list, never an error.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let query_embedding = embedding::embed(query);
        let mut hits: Vec<SearchHit> = Vec::new();

        for entry in &self.embeddings {
            let Some(chunk) = self.lookup_chunk(&entry.file_path, &entry.chunk_id) else {
                continue;
            };
            hits.push(SearchHit {
                chunk: chunk.clone(),
                score: embedding::similarity(&query_embedding, &entry.embedding),
            });
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        hits
    }

    /// Shape a search into the context bundle the retriever consumes.
    pub fn get_context(&self, query: &str, max_chunks: usize) -> ContextBundle {
        let hits = self.search(query, max_chunks);
        let mut relevant_files: Vec<String> = Vec::new();
        let mut relevant_chunks = Vec::with_capacity(hits.len());

        for hit in hits {
            if !relevant_files.contains(&hit.chunk.file_path) {
                relevant_files.push(hit.chunk.file_path.clone());
            }
            relevant_chunks.push(hit.chunk);
        }

        ContextBundle {
            relevant_chunks,
            relevant_files,
            total_files: self.files.len(),
            total_chunks: self.total_chunks(),
        }
    }

    pub fn chunks_for(&self, path: &str) -> &[Chunk] {
        self.chunks.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dependencies_for(&self, path: &str) -> Option<&DependencyRecord> {
        self.dependency_graph.get(path)
    }

    pub fn file_hash(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(|f| f.hash.as_str())
    }

    pub fn stats(&self) -> IndexStats {
        let mut languages: HashMap<String, usize> = HashMap::new();
        let mut categories: HashMap<String, usize> = HashMap::new();
        for record in self.files.values() {
            *languages.entry(record.language.to_string()).or_insert(0) += 1;
            *categories
                .entry(record.category.as_str().to_string())
                .or_insert(0) += 1;
        }

        IndexStats {
            total_files: self.files.len(),
            total_chunks: self.total_chunks(),
            total_embeddings: self.embeddings.len(),
            languages,
            categories,
        }
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.chunks.clear();
        self.dependency_graph.clear();
        self.file_order.clear();
        self.embeddings.clear();
    }

    fn total_chunks(&self) -> usize {
        self.chunks.values().map(Vec::len).sum()
    }

    fn lookup_chunk(&self, file_path: &str, chunk_id: &str) -> Option<&Chunk> {
        self.chunks
            .get(file_path)?
            .iter()
            .find(|c| c.id == chunk_id)
    }

    /// Enumerate indexable files, relative paths in walk order.
    fn scan_tree(&self) -> Vec<String> {
        let mut found = Vec::new();
        let walker = WalkDir::new(&self.workspace)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let rel = entry
                    .path()
                    .strip_prefix(&self.workspace)
                    .unwrap_or(entry.path());
                let rel_str = rel.to_string_lossy();
                rel_str.is_empty() || !self.should_ignore(&rel_str)
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("error scanning workspace: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !language::is_indexable(&name) {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&self.workspace) {
                found.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
        found
    }

    /// Ignore check: plain patterns match as path substrings, `*` patterns
    /// as wildcards, both case-insensitive.
    fn should_ignore(&self, rel_path: &str) -> bool {
        let normalized = rel_path.replace('\\', "/").to_lowercase();
        if self.substrings.iter().any(|p| normalized.contains(p)) {
            return true;
        }
        self.wildcards.iter().any(|re| re.is_match(&normalized))
    }

    /// Index one file. `Ok(true)` means re-processed, `Ok(false)` means the
    /// hash matched and nothing was done.
    fn process_file(&mut self, rel_path: &str) -> Result<bool, AgentError> {
        let full_path = self.workspace.join(rel_path);
        let content = std::fs::read_to_string(&full_path)
            .map_err(|err| AgentError::io(&full_path, err))?;
        let hash = content_hash(&content);

        if self.files.get(rel_path).is_some_and(|f| f.hash == hash) {
            return Ok(false);
        }

        let name = Path::new(rel_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| rel_path.to_string());
        let lang = language::detect_language(&name);
        let chunks = chunker::split(&content, rel_path, lang, &self.cfg);

        let record = FileRecord {
            path: rel_path.to_string(),
            size: content.len() as u64,
            hash,
            language: lang,
            category: language::categorize(rel_path, &name),
            content,
            indexed_at: Utc::now(),
        };

        if self.files.insert(rel_path.to_string(), record).is_none() {
            self.file_order.push(rel_path.to_string());
        }
        self.chunks.insert(rel_path.to_string(), chunks);
        Ok(true)
    }

    fn remove_file(&mut self, rel_path: &str) {
        self.files.remove(rel_path);
        self.chunks.remove(rel_path);
        self.dependency_graph.remove(rel_path);
        self.file_order.retain(|p| p != rel_path);
        self.embeddings.retain(|e| e.file_path != rel_path);
    }

    /// Rebuild the dependency graph and all embeddings. The graph is a
    /// random-access structure over the whole tree, so it is rebuilt in
    /// full to catch cross-file references; embeddings are rebuilt in file
    /// insertion order to keep search tie-breaks deterministic.
    fn rebuild_derived(&mut self) {
        self.dependency_graph.clear();
        for (path, record) in &self.files {
            self.dependency_graph
                .insert(path.clone(), dependencies::extract(&record.content, record.language));
        }

        self.embeddings.clear();
        for path in &self.file_order {
            let Some(chunks) = self.chunks.get(path) else {
                continue;
            };
            for chunk in chunks {
                self.embeddings.push(EmbeddingEntry {
                    chunk_id: chunk.id.clone(),
                    file_path: path.clone(),
                    embedding: embedding::embed_chunk(chunk),
                });
            }
        }
    }
}
