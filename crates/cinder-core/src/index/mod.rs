//! Codebase indexing
//!
//! Maintains an up-to-date, queryable in-memory index of a directory tree.
//!
//! Key components:
//! - `hash` - stable content hashing for change detection
//! - `language` - extension-based language and category classification
//! - `chunker` - boundary-aligned, bounded chunk splitting
//! - `dependencies` - regex-based import/export/function/class extraction
//! - `embedding` - sparse bag-of-words vectors and cosine similarity
//! - `indexer` - orchestrates scanning, incremental updates, and search

pub mod chunker;
pub mod dependencies;
pub mod embedding;
pub mod hash;
pub mod indexer;
pub mod language;

pub use chunker::Chunk;
pub use dependencies::DependencyRecord;
pub use embedding::Embedding;
pub use indexer::{CodebaseIndexer, ContextBundle, IndexStats, SearchHit};
pub use language::FileCategory;
