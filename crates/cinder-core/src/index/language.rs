//! Language and category classification
//!
//! Pure extension/path heuristics; feeds the chunker's boundary pattern
//! selection and the dependency extractor's regex tables.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Broad category of an indexed file, derived from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Source,
    Test,
    Configuration,
    Documentation,
    Assets,
    Scripts,
    Other,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Test => "test",
            Self::Configuration => "configuration",
            Self::Documentation => "documentation",
            Self::Assets => "assets",
            Self::Scripts => "scripts",
            Self::Other => "other",
        }
    }
}

/// Map a filename to its language tag. Unknown extensions are "text".
pub fn detect_language(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "js" | "jsx" | "mjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" => "python",
        "java" => "java",
        "cpp" | "hpp" | "cc" => "cpp",
        "c" | "h" => "c",
        "rs" => "rust",
        "go" => "go",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "css" => "css",
        "scss" => "scss",
        "less" => "less",
        "html" | "htm" => "html",
        "json" => "json",
        "xml" => "xml",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "md" => "markdown",
        "sh" | "bash" | "zsh" | "fish" => "shell",
        "ps1" => "powershell",
        "bat" | "cmd" => "batch",
        "vue" => "vue",
        "svelte" => "svelte",
        "sql" => "sql",
        _ => "text",
    }
}

/// Whether the file is worth indexing at all (text content we understand).
pub fn is_indexable(filename: &str) -> bool {
    const EXTENSIONS: &[&str] = &[
        "js", "jsx", "mjs", "ts", "tsx", "py", "java", "cpp", "c", "h", "hpp", "cc", "rs", "go",
        "rb", "php", "swift", "kt", "scala", "css", "scss", "less", "html", "htm", "json", "xml",
        "yaml", "yml", "toml", "ini", "conf", "md", "txt", "sh", "bash", "zsh", "fish", "ps1",
        "bat", "cmd", "vue", "svelte", "sql", "graphql", "proto", "env",
    ];

    match Path::new(filename).extension().and_then(|e| e.to_str()) {
        Some(ext) => EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        // Extensionless doc/config files like README, Makefile, Dockerfile.
        None => matches!(
            filename,
            "README" | "LICENSE" | "CHANGELOG" | "Makefile" | "Dockerfile"
        ),
    }
}

/// Categorize a file from its relative path and name.
pub fn categorize(relative_path: &str, filename: &str) -> FileCategory {
    let path = relative_path.replace('\\', "/").to_ascii_lowercase();
    let name = filename.to_ascii_lowercase();

    if name.ends_with(".json")
        || name.ends_with(".toml")
        || name.ends_with(".yaml")
        || name.ends_with(".yml")
        || name.ends_with(".ini")
        || name.ends_with(".conf")
        || name.ends_with(".config")
        || name.starts_with(".env")
    {
        return FileCategory::Configuration;
    }

    if name.ends_with(".md") || name.ends_with(".rst") || name.starts_with("readme") {
        return FileCategory::Documentation;
    }

    let has_segment = |seg: &str| {
        path.split('/')
            .any(|part| part == seg)
    };

    if has_segment("test") || has_segment("tests") || has_segment("spec") || has_segment("__tests__")
    {
        return FileCategory::Test;
    }
    if name.contains(".test.") || name.contains(".spec.") || name.starts_with("test_") {
        return FileCategory::Test;
    }
    if has_segment("docs") || has_segment("documentation") {
        return FileCategory::Documentation;
    }
    if has_segment("public") || has_segment("static") || has_segment("assets") {
        return FileCategory::Assets;
    }
    if has_segment("scripts") || has_segment("tools") || has_segment("bin") {
        return FileCategory::Scripts;
    }
    if has_segment("src") || has_segment("app") || has_segment("lib") || has_segment("crates") {
        return FileCategory::Source;
    }

    // Top-level code files count as source too.
    if detect_language(filename) != "text" && !matches!(detect_language(filename), "json" | "yaml")
    {
        return FileCategory::Source;
    }

    FileCategory::Other
}
