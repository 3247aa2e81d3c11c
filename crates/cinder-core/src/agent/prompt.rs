//! System prompt assembly
//!
//! One long string, built section by section from the analysis and the
//! retrieved context. The response format contract at the end is what the
//! parser expects back; keep the two in sync.

use std::fmt::Write;

use super::analyzer::{CurrentFile, RequestAnalysis};
use super::retriever::RetrievedContext;
use super::session::Continuity;

pub fn build_system_prompt(
    analysis: &RequestAnalysis,
    context: &RetrievedContext,
    open_file: Option<&CurrentFile>,
) -> String {
    let mut prompt = String::with_capacity(4096);

    prompt.push_str(
        "You are an expert coding agent working inside the user's project. \
         You propose concrete file changes and nothing else.\n\n",
    );

    write_session_section(&mut prompt, context);
    write_project_section(&mut prompt, analysis, context);
    write_open_file_section(&mut prompt, open_file);
    write_code_section(&mut prompt, context);
    write_dependency_section(&mut prompt, context);
    write_contract_section(&mut prompt);

    prompt
}

/// The live editor buffer outranks the indexed copy of the same file.
fn write_open_file_section(prompt: &mut String, open_file: Option<&CurrentFile>) {
    let Some(CurrentFile {
        path,
        content: Some(content),
    }) = open_file
    else {
        return;
    };
    let _ = write!(
        prompt,
        "## Open file (unsaved buffer)\n### {path}\n```\n{content}\n```\n\n"
    );
}

fn write_session_section(prompt: &mut String, context: &RetrievedContext) {
    match &context.continuity {
        Some(Continuity::FollowUp {
            last_request,
            last_files_modified,
            summary,
        }) => {
            let _ = write!(
                prompt,
                "## Session\nThis is a FOLLOW-UP to the previous request: {last_request:?}.\n\
                 Files modified last time: {}.\n\
                 Prefer editing those files over creating new ones.\n\
                 Recent operations: {summary}\n\n",
                last_files_modified.join(", ")
            );
        }
        Some(Continuity::NewRequest { summary }) => {
            let _ = write!(
                prompt,
                "## Session\nThis is a new request. Recent operations: {summary}\n\n"
            );
        }
        None => {}
    }
}

fn write_project_section(
    prompt: &mut String,
    analysis: &RequestAnalysis,
    context: &RetrievedContext,
) {
    let _ = write!(
        prompt,
        "## Project\nIndexed files: {}, code chunks: {}.\n\
         Request intent: {}, complexity: {}.\n",
        context.total_files,
        context.total_chunks,
        analysis.intent.as_str(),
        analysis.complexity.as_str()
    );
    if let Some(current) = &analysis.current_file {
        let _ = write!(prompt, "File currently open in the editor: {current}\n");
    }
    if !analysis.operations.is_empty() {
        let _ = write!(
            prompt,
            "Likely artifact kinds: {}\n",
            analysis.operations.join(", ")
        );
    }
    prompt.push('\n');
}

fn write_code_section(prompt: &mut String, context: &RetrievedContext) {
    if context.chunks.is_empty() {
        prompt.push_str("## Relevant code\nNo indexed code matched this request.\n\n");
        return;
    }

    prompt.push_str("## Relevant code\n");
    for chunk in &context.chunks {
        let _ = write!(
            prompt,
            "### {} (lines {}-{})",
            chunk.file_path, chunk.start_line, chunk.end_line
        );
        if let Some(purpose) = chunk.purpose {
            let _ = write!(prompt, " [{purpose}]");
        }
        let _ = write!(prompt, "\n```\n{}\n```\n", chunk.content);
    }
    prompt.push('\n');
}

fn write_dependency_section(prompt: &mut String, context: &RetrievedContext) {
    if context.dependencies.is_empty() {
        return;
    }

    prompt.push_str("## Imports and exports\n");
    for (path, record) in &context.dependencies {
        let imports: Vec<&str> = record.imports.iter().map(|i| i.module.as_str()).collect();
        let exports: Vec<&str> = record
            .exports
            .iter()
            .flat_map(|e| e.items.iter().map(String::as_str))
            .collect();
        let _ = write!(
            prompt,
            "- {path}: imports [{}], exports [{}]\n",
            imports.join(", "),
            exports.join(", ")
        );
    }
    prompt.push('\n');
}

fn write_contract_section(prompt: &mut String) {
    prompt.push_str(
        "## Response format\n\
         Respond with a single JSON object and nothing else. No prose, no\n\
         markdown fences. Shape:\n\
         {\n\
           \"analysis\": \"what you understood and plan to do\",\n\
           \"actions\": [\n\
             {\"type\": \"create_file\", \"path\": \"relative/path\", \"content\": \"full file content\", \"reason\": \"why\"},\n\
             {\"type\": \"edit_file\", \"path\": \"relative/path\", \"content\": \"full new file content\", \"reason\": \"why\"},\n\
             {\"type\": \"delete_file\", \"path\": \"relative/path\", \"reason\": \"why\"},\n\
             {\"type\": \"create_folder\", \"path\": \"relative/path\", \"reason\": \"why\"}\n\
           ],\n\
           \"explanation\": \"summary for the user\"\n\
         }\n\
         Rules: paths are workspace-relative; edit_file carries the complete\n\
         replacement content, never a diff; escape quotes inside content\n\
         strings; an empty actions array is valid when no change is needed.\n",
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::analyzer;

    #[test]
    fn test_prompt_contains_contract_and_stats() {
        let current = CurrentFile {
            path: "src/App.jsx".to_string(),
            content: Some("export function App() {}\n".to_string()),
        };
        let analysis = analyzer::analyze("add a footer component", Some(&current));
        let context = RetrievedContext {
            total_files: 12,
            total_chunks: 40,
            ..Default::default()
        };

        let prompt = build_system_prompt(&analysis, &context, Some(&current));
        assert!(prompt.contains("\"create_file\""));
        assert!(prompt.contains("Indexed files: 12"));
        assert!(prompt.contains("src/App.jsx"));
        assert!(prompt.contains("unsaved buffer"));
        assert!(prompt.contains("No indexed code matched"));
    }

    #[test]
    fn test_follow_up_section_lists_previous_files() {
        let analysis = analyzer::analyze("make it darker", None);
        let context = RetrievedContext {
            continuity: Some(Continuity::FollowUp {
                last_request: "add a footer".to_string(),
                last_files_modified: vec!["src/Footer.jsx".to_string()],
                summary: "add a footer -> create_file on src/Footer.jsx".to_string(),
            }),
            ..Default::default()
        };

        let prompt = build_system_prompt(&analysis, &context, None);
        assert!(prompt.contains("FOLLOW-UP"));
        assert!(prompt.contains("src/Footer.jsx"));
    }
}
