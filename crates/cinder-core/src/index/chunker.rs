//! Boundary-aligned chunk splitting
//!
//! Splits file text into bounded chunks aligned to semantic boundaries
//! where detectable. Splitting is deterministic: the same content always
//! yields byte-identical chunk boundaries. Chunk line ranges are 1-based,
//! inclusive, contiguous, and collectively span every line of the file.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::dependencies;
use crate::config::IndexConfig;

/// A bounded, line-addressed slice of a file used as the unit of retrieval
/// and embedding. Immutable once created; the full set for a file is
/// replaced atomically on re-index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// `path:startLine-endLine`, deterministic from path + range.
    pub id: String,
    pub content: String,
    pub file_path: String,
    /// 1-based inclusive.
    pub start_line: usize,
    /// 1-based inclusive.
    pub end_line: usize,
    /// Rough length/4 estimate, good enough for budget math.
    pub token_count: usize,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub purpose: Option<&'static str>,
}

static JS_BOUNDARIES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^export\s+(class|function|const|let|var|default|interface|type|enum)",
        r"^import\s+",
        r"^class\s+\w+",
        r"^(async\s+)?function\s+\w+",
        r"^(const|let|var)\s+\w+",
        r"^(interface|type|enum|namespace)\s+\w+",
        r"^(if|for|while|switch)\s*\(",
        r"^(try|finally)\s*\{",
        r"^(describe|it|test|beforeEach|afterEach|beforeAll|afterAll)\s*\(",
        r"^/\*\*",
        r"^\s*//\s*(===|---)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static PY_BOUNDARIES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^import\s+",
        r"^from\s+\w+\s+import",
        r"^class\s+\w+",
        r"^(async\s+)?def\s+\w+",
        r"^@\w+",
        r#"^if\s+__name__\s*==\s*['"]__main__['"]"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static RUST_BOUNDARIES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^(pub\s+)?(async\s+)?fn\s+\w+",
        r"^(pub\s+)?(struct|enum|trait|mod|const|static|type)\s+\w+",
        r"^impl\b",
        r"^use\s+",
        r"^#\[",
        r"^///",
        r"^//!",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static GO_BOUNDARIES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^func\s+",
        r"^type\s+\w+",
        r"^import\s+",
        r"^(var|const)\s+",
        r"^package\s+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

fn boundary_set(language: &str) -> &'static [Regex] {
    match language {
        "python" => &PY_BOUNDARIES,
        "rust" => &RUST_BOUNDARIES,
        "go" => &GO_BOUNDARIES,
        // javascript patterns double as a generic fallback
        _ => &JS_BOUNDARIES,
    }
}

fn is_boundary(line: &str, language: &str) -> bool {
    boundary_set(language).iter().any(|re| re.is_match(line))
}

/// Keyword buckets for the purpose tag, checked in priority order.
const PURPOSES: &[(&str, &[&str])] = &[
    ("authentication", &["auth", "login", "logout", "password", "token", "credential", "oauth"]),
    ("data-management", &["database", "query", "schema", "model", "repository", "migration", "sql"]),
    ("ui-component", &["component", "render", "button", "modal", "view", "widget", "props"]),
    ("business-logic", &["service", "controller", "handler", "process", "workflow", "validate"]),
    ("utility", &["util", "helper", "format", "convert", "parse"]),
    ("configuration", &["config", "settings", "option", "environment"]),
    ("testing", &["test", "spec", "mock", "assert", "expect"]),
    ("documentation", &["readme", "documentation", "changelog", "license"]),
];

/// Best-effort purpose tag for a chunk, from keyword frequency.
pub fn infer_purpose(content: &str) -> Option<&'static str> {
    let lower = content.to_lowercase();
    PURPOSES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(purpose, _)| *purpose)
}

/// Split file content into chunks.
///
/// A chunk is flushed when the buffer has passed the soft size and the
/// current line matches a boundary pattern for the language, or
/// unconditionally when adding the line would pass the hard ceiling
/// (minified content, giant literals). The final non-empty buffer always
/// becomes a trailing chunk.
pub fn split(content: &str, file_path: &str, language: &str, cfg: &IndexConfig) -> Vec<Chunk> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = content.split('\n').collect();
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut start = 0usize;
    let mut buf_len = 0usize;

    for (i, line) in lines.iter().enumerate() {
        let line_len = line.len() + 1;
        let boundary_flush = buf_len > cfg.chunk_size && is_boundary(line, language);
        let hard_flush = buf_len + line_len > cfg.max_chunk_size;

        if (boundary_flush || hard_flush) && buf_len > 0 {
            push_chunk(&mut chunks, &lines, start, i, file_path, language);
            start = i;
            buf_len = 0;
        }
        buf_len += line_len;
    }

    let remainder = lines[start..].join("\n");
    if !remainder.trim().is_empty() {
        push_chunk(&mut chunks, &lines, start, lines.len(), file_path, language);
    } else if let Some(last) = chunks.last_mut() {
        // Trailing whitespace-only lines fold into the previous chunk's
        // range so the ranges still span the whole file.
        last.end_line = lines.len();
        last.id = format!("{}:{}-{}", file_path, last.start_line, last.end_line);
    }

    chunks
}

/// `start..end` is a 0-based exclusive line range.
fn push_chunk(
    chunks: &mut Vec<Chunk>,
    lines: &[&str],
    start: usize,
    end: usize,
    file_path: &str,
    language: &str,
) {
    let raw = lines[start..end].join("\n");
    let content = raw.trim_end().to_string();
    let start_line = start + 1;
    let end_line = end;

    let deps = dependencies::extract(&content, language);
    let functions = deps.functions.into_iter().map(|f| f.name).collect();
    let classes = deps.classes.into_iter().map(|c| c.name).collect();

    chunks.push(Chunk {
        id: format!("{}:{}-{}", file_path, start_line, end_line),
        purpose: infer_purpose(&content),
        token_count: raw.len().div_ceil(4),
        content,
        file_path: file_path.to_string(),
        start_line,
        end_line,
        functions,
        classes,
    });
}
