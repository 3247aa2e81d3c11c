//! Regex-based dependency extraction
//!
//! Line-by-line pattern matching for imports, exports, functions, and
//! classes. Best-effort by design, not a real parser: false negatives are
//! expected and acceptable.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One import statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub line: usize,
    pub module: String,
    pub items: Vec<String>,
}

/// One export statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub line: usize,
    pub items: Vec<String>,
}

/// One function declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub line: usize,
    pub name: String,
    pub signature: String,
}

/// One class (or struct) declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub line: usize,
    pub name: String,
}

/// Everything extracted from one file. Rebuilt in full on every index pass
/// so cross-file references stay current.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyRecord {
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<ExportRecord>,
    pub functions: Vec<FunctionRecord>,
    pub classes: Vec<ClassRecord>,
}

static JS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:import|const|let|var)\s+(?:\{[^}]*\}|\w+)\s+from\s+['"`]([^'"`]+)['"`]"#)
        .unwrap()
});
static JS_IMPORT_ITEMS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^}]+)\}").unwrap());
static PY_IMPORT_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^from\s+([\w.]+)\s+import\s+(.+)$").unwrap());
static PY_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^import\s+([\w.]+)").unwrap());
static JAVA_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^import\s+([\w.]+);").unwrap());
static C_INCLUDE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^#include\s+[<"]([^>"]+)[>"]"#).unwrap());
static RUST_USE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:pub\s+)?use\s+([\w:]+)").unwrap());
static GO_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^import\s+"([^"]+)""#).unwrap());

static JS_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^export\s+(?:default\s+)?(?:async\s+)?(?:function|class|const|let|var|interface|type|enum)\s+(\w+)").unwrap()
});
static PY_EXPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:def|class)\s+(\w+)").unwrap());
static RUST_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^pub\s+(?:async\s+)?(?:fn|struct|enum|trait|mod|const|static|type)\s+(\w+)")
        .unwrap()
});

static JS_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:export\s+)?(?:async\s+)?function\s+(\w+)\s*\(").unwrap());
static PY_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:async\s+)?def\s+(\w+)\s*\(").unwrap());
static RUST_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:pub\s+)?(?:async\s+)?fn\s+(\w+)").unwrap());
static GO_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^func\s+(?:\([^)]*\)\s+)?(\w+)\s*\(").unwrap());
static JAVA_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:public\s+|private\s+|protected\s+)?(?:static\s+)?(?:final\s+)?(?:[\w<>\[\]]+\s+)?(\w+)\s*\(").unwrap()
});

static JS_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:export\s+)?(?:abstract\s+)?class\s+(\w+)").unwrap());
static PY_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^class\s+(\w+)").unwrap());
static JAVA_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:public\s+|private\s+|protected\s+)?(?:abstract\s+)?(?:final\s+)?class\s+(\w+)")
        .unwrap()
});
static RUST_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:pub\s+)?(?:struct|enum|trait)\s+(\w+)").unwrap());
static GO_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^type\s+(\w+)\s+struct").unwrap());

/// Extract the dependency record for one file's content.
pub fn extract(content: &str, language: &str) -> DependencyRecord {
    let mut record = DependencyRecord::default();

    for (i, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        let line_no = i + 1;

        if let Some(import) = match_import(line, language) {
            record.imports.push(ImportRecord {
                line: line_no,
                module: import.0,
                items: import.1,
            });
        }
        if let Some(items) = match_export(line, language) {
            record.exports.push(ExportRecord {
                line: line_no,
                items,
            });
        }
        if let Some(name) = match_function(line, language) {
            record.functions.push(FunctionRecord {
                line: line_no,
                name,
                signature: line.to_string(),
            });
        }
        if let Some(name) = match_class(line, language) {
            record.classes.push(ClassRecord {
                line: line_no,
                name,
            });
        }
    }

    record
}

fn capture(re: &Regex, line: &str) -> Option<String> {
    re.captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn match_import(line: &str, language: &str) -> Option<(String, Vec<String>)> {
    match language {
        "javascript" | "typescript" => capture(&JS_IMPORT, line).map(|module| {
            let items = JS_IMPORT_ITEMS
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| {
                    m.as_str()
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            (module, items)
        }),
        "python" => {
            if let Some(caps) = PY_IMPORT_FROM.captures(line) {
                let module = caps.get(1).map(|m| m.as_str().to_string())?;
                let items = caps
                    .get(2)
                    .map(|m| {
                        m.as_str()
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default();
                Some((module, items))
            } else {
                capture(&PY_IMPORT, line).map(|m| (m, Vec::new()))
            }
        }
        "java" => capture(&JAVA_IMPORT, line).map(|m| (m, Vec::new())),
        "c" | "cpp" => capture(&C_INCLUDE, line).map(|m| (m, Vec::new())),
        "rust" => capture(&RUST_USE, line).map(|m| (m, Vec::new())),
        "go" => capture(&GO_IMPORT, line).map(|m| (m, Vec::new())),
        _ => None,
    }
}

fn match_export(line: &str, language: &str) -> Option<Vec<String>> {
    let name = match language {
        "javascript" | "typescript" => capture(&JS_EXPORT, line),
        "python" => capture(&PY_EXPORT, line),
        "rust" => capture(&RUST_EXPORT, line),
        _ => None,
    }?;
    Some(vec![name])
}

fn match_function(line: &str, language: &str) -> Option<String> {
    match language {
        "javascript" | "typescript" => capture(&JS_FUNCTION, line),
        "python" => capture(&PY_FUNCTION, line),
        "rust" => capture(&RUST_FUNCTION, line),
        "go" => capture(&GO_FUNCTION, line),
        "java" => capture(&JAVA_METHOD, line),
        _ => None,
    }
}

fn match_class(line: &str, language: &str) -> Option<String> {
    match language {
        "javascript" | "typescript" => capture(&JS_CLASS, line),
        "python" => capture(&PY_CLASS, line),
        "java" => capture(&JAVA_CLASS, line),
        "rust" => capture(&RUST_TYPE, line),
        "go" => capture(&GO_TYPE, line),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_javascript_imports_and_exports() {
        let src = "import { useState, useEffect } from 'react'\nexport function App() {}\n";
        let record = extract(src, "javascript");

        assert_eq!(record.imports.len(), 1);
        assert_eq!(record.imports[0].module, "react");
        assert_eq!(record.imports[0].items, vec!["useState", "useEffect"]);
        assert_eq!(record.exports.len(), 1);
        assert_eq!(record.exports[0].items, vec!["App"]);
        assert_eq!(record.functions[0].name, "App");
    }

    #[test]
    fn test_python_declarations() {
        let src = "from os import path, sep\nclass Runner:\n    def start(self):\n        pass\n";
        let record = extract(src, "python");

        assert_eq!(record.imports[0].module, "os");
        assert_eq!(record.imports[0].items, vec!["path", "sep"]);
        assert_eq!(record.classes[0].name, "Runner");
        assert_eq!(record.functions[0].name, "start");
        assert_eq!(record.functions[0].line, 3);
    }

    #[test]
    fn test_rust_declarations() {
        let src = "use std::fs;\npub struct Index;\npub fn build() {}\n";
        let record = extract(src, "rust");

        assert_eq!(record.imports[0].module, "std::fs");
        assert_eq!(record.classes[0].name, "Index");
        assert_eq!(record.functions[0].name, "build");
    }

    #[test]
    fn test_unknown_language_extracts_nothing() {
        let record = extract("import x from 'y'", "text");
        assert_eq!(record, DependencyRecord::default());
    }
}
