//! Session-aware context retrieval
//!
//! Builds the code context the model sees. Follow-up requests are anchored
//! to the files the previous operation touched, topped up with a smaller
//! semantic search; new requests get a wider semantic search. Either way
//! the result is bounded and deduplicated.

use tracing::debug;

use super::analyzer::RequestAnalysis;
use super::session::{Continuity, SessionManager};
use crate::index::chunker::Chunk;
use crate::index::dependencies::DependencyRecord;
use crate::index::indexer::CodebaseIndexer;

/// Semantic hits for a request with no usable session anchor.
const SEMANTIC_LIMIT_NEW: usize = 8;
/// Semantic top-up when carried files already anchor the context.
const SEMANTIC_LIMIT_FOLLOW_UP: usize = 4;
/// Leading chunks taken from each carried or current file.
const CHUNKS_PER_ANCHOR_FILE: usize = 2;

/// Everything retrieval produces for one request.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    pub chunks: Vec<Chunk>,
    /// Files backing the chunks, deduplicated in order of first appearance.
    pub files: Vec<String>,
    /// Import/export records for each file in `files`.
    pub dependencies: Vec<(String, DependencyRecord)>,
    pub continuity: Option<Continuity>,
    pub total_files: usize,
    pub total_chunks: usize,
}

pub fn retrieve(
    indexer: &CodebaseIndexer,
    session: &SessionManager,
    analysis: &RequestAnalysis,
    request: &str,
) -> RetrievedContext {
    let continuity = session.continuity(request);
    let query = build_query(analysis, request);

    let mut chunks: Vec<Chunk> = Vec::new();

    // The open editor file is always the strongest anchor.
    if let Some(current) = &analysis.current_file {
        take_leading_chunks(indexer, current, &mut chunks);
    }

    let semantic_limit = match &continuity {
        Some(Continuity::FollowUp {
            last_files_modified,
            ..
        }) => {
            for file in last_files_modified {
                take_leading_chunks(indexer, file, &mut chunks);
            }
            SEMANTIC_LIMIT_FOLLOW_UP
        }
        _ => SEMANTIC_LIMIT_NEW,
    };

    let bundle = indexer.get_context(&query, semantic_limit);
    for chunk in bundle.relevant_chunks {
        push_unique(&mut chunks, chunk);
    }

    let mut files: Vec<String> = Vec::new();
    for chunk in &chunks {
        if !files.contains(&chunk.file_path) {
            files.push(chunk.file_path.clone());
        }
    }

    let dependencies = files
        .iter()
        .filter_map(|path| {
            indexer
                .dependencies_for(path)
                .map(|record| (path.clone(), record.clone()))
        })
        .collect();

    debug!(
        "retrieved {} chunks from {} files for query {query:?}",
        chunks.len(),
        files.len()
    );

    RetrievedContext {
        chunks,
        files,
        dependencies,
        continuity,
        total_files: bundle.total_files,
        total_chunks: bundle.total_chunks,
    }
}

/// Search on extracted keywords; raw text only when nothing survived
/// stop-word removal.
fn build_query(analysis: &RequestAnalysis, request: &str) -> String {
    if analysis.keywords.is_empty() {
        request.to_string()
    } else {
        analysis.keywords.join(" ")
    }
}

fn take_leading_chunks(indexer: &CodebaseIndexer, path: &str, out: &mut Vec<Chunk>) {
    for chunk in indexer.chunks_for(path).iter().take(CHUNKS_PER_ANCHOR_FILE) {
        push_unique(out, chunk.clone());
    }
}

fn push_unique(out: &mut Vec<Chunk>, chunk: Chunk) {
    if !out.iter().any(|c| c.id == chunk.id) {
        out.push(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::analyzer;
    use crate::config::IndexConfig;
    use std::fs;
    use tempfile::TempDir;

    fn indexed_workspace() -> (TempDir, CodebaseIndexer) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(
            dir.path().join("src/footer.js"),
            "function renderFooter(theme) {\n  return theme.footer;\n}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("src/header.js"),
            "function renderHeader(theme) {\n  return theme.header;\n}\n",
        )
        .unwrap();

        let mut indexer = CodebaseIndexer::new(dir.path(), IndexConfig::default());
        indexer.index_all();
        (dir, indexer)
    }

    #[test]
    fn test_new_request_uses_semantic_search() {
        let (_dir, indexer) = indexed_workspace();
        let session = SessionManager::new();
        let analysis = analyzer::analyze("improve the renderFooter theme", None);

        let ctx = retrieve(&indexer, &session, &analysis, "improve the renderFooter theme");
        assert!(ctx.continuity.is_none());
        assert!(!ctx.chunks.is_empty());
        assert_eq!(ctx.chunks[0].file_path, "src/footer.js");
    }

    #[test]
    fn test_follow_up_carries_previous_files_first() {
        let (_dir, indexer) = indexed_workspace();
        let mut session = SessionManager::new();
        session.record_operation(
            "op-1",
            "create a header",
            "created header",
            vec![("create_file".into(), "src/header.js".into())],
            vec!["src/header.js".into()],
        );

        let analysis = analyzer::analyze("make it taller", None);
        let ctx = retrieve(&indexer, &session, &analysis, "make it taller");

        assert_eq!(ctx.continuity.as_ref().unwrap().kind(), "follow_up");
        assert_eq!(ctx.chunks[0].file_path, "src/header.js");
    }

    #[test]
    fn test_chunks_are_deduplicated() {
        let (_dir, indexer) = indexed_workspace();
        let mut session = SessionManager::new();
        session.record_operation(
            "op-1",
            "footer work",
            "footer",
            vec![("edit_file".into(), "src/footer.js".into())],
            vec!["src/footer.js".into()],
        );

        // Follow-up carries footer.js, and semantic search surfaces it again.
        let analysis = analyzer::analyze("make it match renderFooter theme", None);
        let ctx = retrieve(&indexer, &session, &analysis, "make it match renderFooter theme");
        assert_eq!(ctx.continuity.as_ref().unwrap().kind(), "follow_up");

        let mut ids: Vec<&str> = ctx.chunks.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), ctx.chunks.len());
    }

    #[test]
    fn test_dependencies_cover_retrieved_files() {
        let (_dir, indexer) = indexed_workspace();
        let session = SessionManager::new();
        let analysis = analyzer::analyze("renderHeader", None);

        let ctx = retrieve(&indexer, &session, &analysis, "renderHeader");
        for (path, _) in &ctx.dependencies {
            assert!(ctx.files.contains(path));
        }
    }
}
