//! Request analysis
//!
//! Pure keyword heuristics, no ML. Classifies what the user wants before
//! any context is retrieved so retrieval and prompting can adapt.

use serde::Serialize;

/// The file open in the user's editor when the request was made. `content`
/// carries the live buffer when it differs from what is on disk.
#[derive(Debug, Clone)]
pub struct CurrentFile {
    /// Workspace-relative path.
    pub path: String,
    pub content: Option<String>,
}

/// Coarse intent of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Create,
    Edit,
    Delete,
    Fix,
    Refactor,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Fix => "fix",
            Self::Refactor => "refactor",
            Self::General => "general",
        }
    }
}

/// Rough effort estimate, used only to shade the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Everything the analyzer derives from one request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAnalysis {
    pub intent: Intent,
    pub complexity: Complexity,
    /// Distinct content words, stop words removed, for semantic search.
    pub keywords: Vec<String>,
    /// Hints about the kinds of artifacts likely involved.
    pub operations: Vec<&'static str>,
    /// Workspace-relative path of the file open in the editor, if any.
    pub current_file: Option<String>,
}

const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "but", "for", "with", "this", "that", "will", "want", "make", "create",
    "add", "edit", "update", "please",
];

pub fn analyze(request: &str, current_file: Option<&CurrentFile>) -> RequestAnalysis {
    RequestAnalysis {
        intent: detect_intent(request),
        complexity: assess_complexity(request),
        keywords: extract_keywords(request),
        operations: detect_operations(request),
        current_file: current_file.map(|f| f.path.clone()),
    }
}

fn detect_intent(request: &str) -> Intent {
    let lower = request.to_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if any(&["create", "add", "new"]) {
        Intent::Create
    } else if any(&["edit", "update", "modify"]) {
        Intent::Edit
    } else if any(&["delete", "remove"]) {
        Intent::Delete
    } else if any(&["fix", "bug", "error"]) {
        Intent::Fix
    } else if any(&["refactor", "improve"]) {
        Intent::Refactor
    } else {
        Intent::General
    }
}

fn detect_operations(request: &str) -> Vec<&'static str> {
    let lower = request.to_lowercase();
    let mut ops = Vec::new();

    if lower.contains("component") || lower.contains("react") {
        ops.push("create_component");
    }
    if lower.contains("hook") || lower.contains("use") {
        ops.push("create_hook");
    }
    if lower.contains("style") || lower.contains("css") {
        ops.push("create_style");
    }
    if lower.contains("config") || lower.contains("package.json") {
        ops.push("update_config");
    }
    if lower.contains("test") || lower.contains("spec") {
        ops.push("create_test");
    }
    ops
}

fn extract_keywords(request: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for raw in request.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
        if raw.len() <= 2 || STOP_WORDS.contains(&raw) {
            continue;
        }
        if !keywords.iter().any(|k| k == raw) {
            keywords.push(raw.to_string());
        }
    }
    keywords
}

fn assess_complexity(request: &str) -> Complexity {
    let word_count = request.split_whitespace().count();
    let multiple_operations = detect_operations(request).len() > 1;
    let lower = request.to_lowercase();
    let complex_keywords = ["component", "hook", "service", "api", "database", "state", "routing"]
        .iter()
        .any(|k| lower.contains(k));

    if word_count > 50 || multiple_operations || complex_keywords {
        Complexity::High
    } else if word_count > 20 {
        Complexity::Medium
    } else {
        Complexity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_detection() {
        assert_eq!(analyze("create a footer", None).intent, Intent::Create);
        assert_eq!(analyze("fix the login bug", None).intent, Intent::Fix);
        assert_eq!(analyze("refactor the parser", None).intent, Intent::Refactor);
        assert_eq!(analyze("what does this do", None).intent, Intent::General);
    }

    #[test]
    fn test_keywords_drop_stop_words_and_dupes() {
        let analysis = analyze("add the footer and footer styles", None);
        assert_eq!(analysis.keywords, vec!["footer", "styles"]);
    }

    #[test]
    fn test_complexity() {
        assert_eq!(analyze("rename a variable", None).complexity, Complexity::Low);
        assert_eq!(
            analyze("build a database service with api routing", None).complexity,
            Complexity::High
        );
    }

    #[test]
    fn test_operation_hints() {
        let ops = analyze("add a react component with css styles", None).operations;
        assert!(ops.contains(&"create_component"));
        assert!(ops.contains(&"create_style"));
    }
}
