//! Multi-strategy recovery parsing of model output
//!
//! Model replies are supposed to be JSON but frequently are not: wrapped
//! in prose or code fences, truncated mid-structure, or corrupted by
//! unescaped quotes inside `content` fields. An ordered chain of recovery
//! strategies runs until one produces parseable JSON; the result is then
//! validated into typed actions. If everything fails, the caller gets a
//! structured empty-actions fallback - a parse failure must never fabricate
//! file writes, and the parser never raises past this boundary.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AgentError;

/// A proposed filesystem mutation. Variants carry exactly the fields their
/// kind requires; `delete_file` has no content at the type level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentAction {
    CreateFile {
        path: String,
        content: String,
        #[serde(default)]
        reason: String,
        #[serde(default)]
        dependencies: Vec<String>,
    },
    EditFile {
        path: String,
        content: String,
        #[serde(default)]
        reason: String,
        #[serde(default)]
        dependencies: Vec<String>,
    },
    DeleteFile {
        path: String,
        #[serde(default)]
        reason: String,
    },
    CreateFolder {
        path: String,
        #[serde(default)]
        reason: String,
    },
}

impl AgentAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateFile { .. } => "create_file",
            Self::EditFile { .. } => "edit_file",
            Self::DeleteFile { .. } => "delete_file",
            Self::CreateFolder { .. } => "create_folder",
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::CreateFile { path, .. }
            | Self::EditFile { path, .. }
            | Self::DeleteFile { path, .. }
            | Self::CreateFolder { path, .. } => path,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Self::CreateFile { content, .. } | Self::EditFile { content, .. } => Some(content),
            _ => None,
        }
    }
}

/// Validated shape of one model reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub analysis: String,
    pub actions: Vec<AgentAction>,
    pub explanation: String,
}

/// Total parse: any unrecoverable input becomes the empty-actions fallback.
pub fn parse(raw: &str) -> ParsedResponse {
    match try_parse(raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("model response unrecoverable: {err}");
            ParsedResponse {
                analysis: format!(
                    "Failed to parse model response: {err}. The response contained malformed \
                     JSON that could not be recovered."
                ),
                actions: Vec::new(),
                explanation: "Response parsing failed due to malformed JSON. No files will be \
                              created automatically. Please try the request again or rephrase it."
                    .to_string(),
            }
        }
    }
}

/// The strategy chain: first success wins, then the result is validated.
/// A validation failure is a parse failure; later strategies do not get a
/// second look at text an earlier strategy already parsed.
pub fn try_parse(raw: &str) -> Result<ParsedResponse, AgentError> {
    let candidate = extract_candidate(raw);

    let strategies: &[(&str, fn(&str) -> Result<Value, AgentError>)] = &[
        ("direct", parse_direct),
        ("cleaned", parse_cleaned),
        ("content-repair", parse_with_content_repair),
        ("truncation-repair", parse_with_truncation_repair),
        ("aggressive-repair", parse_with_aggressive_repair),
    ];

    let mut last_error = AgentError::Parse("empty response".to_string());
    for (name, strategy) in strategies {
        match strategy(&candidate) {
            Ok(value) => {
                debug!("parsed model response with strategy {name}");
                return validate(value);
            }
            Err(err) => last_error = err,
        }
    }
    Err(last_error)
}

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").unwrap());

/// Pull the most plausible JSON span out of the raw reply: fenced block if
/// present, then the outermost `{...}`, falling back to first-brace-to-end
/// for truncated replies.
fn extract_candidate(raw: &str) -> String {
    let text = CODE_FENCE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw);

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => text[start..=end].to_string(),
        (Some(start), _) => text[start..].to_string(),
        _ => text.trim().to_string(),
    }
}

fn parse_json(text: &str) -> Result<Value, AgentError> {
    serde_json::from_str(text).map_err(|err| AgentError::Parse(err.to_string()))
}

fn parse_direct(text: &str) -> Result<Value, AgentError> {
    parse_json(text)
}

fn parse_cleaned(text: &str) -> Result<Value, AgentError> {
    parse_json(&clean(text))
}

fn parse_with_content_repair(text: &str) -> Result<Value, AgentError> {
    parse_json(&clean(&escape_content_fields(text)))
}

fn parse_with_truncation_repair(text: &str) -> Result<Value, AgentError> {
    let balanced = if text.trim_end().ends_with('}') {
        text.to_string()
    } else {
        balance_delimiters(text)
    };
    parse_json(&clean(&balanced))
}

static BARE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:").unwrap());
static BARE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":\s*([A-Za-z_][A-Za-z0-9_]*)\s*([,}\]])").unwrap());
static ADJACENT_OBJECTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\}\s*\{").unwrap());
static ADJACENT_ARRAYS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\]\s*\[").unwrap());
static ADJACENT_STRINGS: Lazy<Regex> = Lazy::new(|| Regex::new(r#""\s+""#).unwrap());
static MISSING_COMMA_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""\s*"type":"#).unwrap());
static MISSING_COMMA_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r#""\s*"path":"#).unwrap());
static MISSING_COMMA_CONTENT: Lazy<Regex> = Lazy::new(|| Regex::new(r#""\s*"content":"#).unwrap());

/// Last resort: a chain of targeted substitutions for structurally broken
/// JSON, then the same delimiter balancing as the truncation strategy.
fn parse_with_aggressive_repair(text: &str) -> Result<Value, AgentError> {
    let mut fixed = BARE_KEY.replace_all(text, "$1\"$2\":").into_owned();

    fixed = BARE_VALUE
        .replace_all(&fixed, |caps: &regex::Captures| {
            let ident = &caps[1];
            if matches!(ident, "true" | "false" | "null") {
                format!(":{}{}", ident, &caps[2])
            } else {
                format!(":\"{}\"{}", ident, &caps[2])
            }
        })
        .into_owned();

    fixed = ADJACENT_OBJECTS.replace_all(&fixed, "},{").into_owned();
    fixed = ADJACENT_ARRAYS.replace_all(&fixed, "],[").into_owned();
    fixed = ADJACENT_STRINGS.replace_all(&fixed, "\",\"").into_owned();
    fixed = MISSING_COMMA_TYPE.replace_all(&fixed, "\", \"type\":").into_owned();
    fixed = MISSING_COMMA_PATH.replace_all(&fixed, "\", \"path\":").into_owned();
    fixed = MISSING_COMMA_CONTENT
        .replace_all(&fixed, "\", \"content\":")
        .into_owned();

    fixed = escape_content_fields(&fixed);
    parse_json(&clean(&balance_delimiters(&fixed)))
}

static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").unwrap());

/// Generic cleanup: trailing commas before closers, control characters,
/// outer whitespace.
fn clean(text: &str) -> String {
    let no_commas = TRAILING_COMMA.replace_all(text, "$1");
    no_commas
        .chars()
        .filter(|c| {
            let code = *c as u32;
            !(code < 0x20 || (0x7F..=0x9F).contains(&code))
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Re-escape bare quotes inside every `"content": "..."` value - the
/// dominant corruption, since models embed free-form code as a JSON
/// string. A quote counts as the value's terminator only when the next
/// non-whitespace character closes or continues the enclosing structure.
fn escape_content_fields(text: &str) -> String {
    const KEY: &str = "\"content\"";
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if matches_at(&chars, i, KEY) {
            out.push_str(KEY);
            i += KEY.len();

            // copy `: "` with arbitrary whitespace
            while i < chars.len() && chars[i].is_whitespace() {
                out.push(chars[i]);
                i += 1;
            }
            if i < chars.len() && chars[i] == ':' {
                out.push(':');
                i += 1;
                while i < chars.len() && chars[i].is_whitespace() {
                    out.push(chars[i]);
                    i += 1;
                }
                if i < chars.len() && chars[i] == '"' {
                    out.push('"');
                    i += 1;
                    i = copy_escaped_value(&chars, i, &mut out);
                }
            }
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Copy a string value starting just after its opening quote, escaping any
/// embedded quote that cannot be the terminator. Returns the next index.
fn copy_escaped_value(chars: &[char], mut i: usize, out: &mut String) -> usize {
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            out.push(c);
            out.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if c == '"' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j >= chars.len() || matches!(chars[j], ',' | '}' | ']') {
                out.push('"');
                return i + 1;
            }
            out.push('\\');
            out.push('"');
            i += 1;
            continue;
        }
        out.push(c);
        i += 1;
    }
    i
}

fn matches_at(chars: &[char], at: usize, literal: &str) -> bool {
    literal
        .chars()
        .enumerate()
        .all(|(k, expect)| chars.get(at + k) == Some(&expect))
}

/// Close every unclosed delimiter in proper nesting order. Delimiters
/// inside string literals are ignored; an escaped quote does not toggle
/// string state. A reply truncated mid-string gets its quote closed first.
fn balance_delimiters(text: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for c in text.chars() {
        if escape {
            escape = false;
            continue;
        }
        match c {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => stack.push('}'),
            '[' if !in_string => stack.push(']'),
            '}' | ']' if !in_string => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut out = text.to_string();
    if in_string {
        out.push('"');
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

/// Post-parse validation, applied no matter which strategy succeeded.
/// Violations route through the same fallback as a hard parse failure.
fn validate(value: Value) -> Result<ParsedResponse, AgentError> {
    let obj = value
        .as_object()
        .ok_or_else(|| AgentError::Validation("response is not a JSON object".to_string()))?;

    let analysis = obj
        .get("analysis")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");
    if analysis.is_empty() {
        return Err(AgentError::Validation(
            "missing analysis field in response".to_string(),
        ));
    }

    let actions_value = obj
        .get("actions")
        .ok_or_else(|| AgentError::Validation("missing actions array in response".to_string()))?;
    let raw_actions = actions_value
        .as_array()
        .ok_or_else(|| AgentError::Validation("actions is not an array".to_string()))?;

    let mut actions = Vec::with_capacity(raw_actions.len());
    for raw in raw_actions {
        actions.push(validate_action(raw)?);
    }

    let explanation = obj
        .get("explanation")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    Ok(ParsedResponse {
        analysis: analysis.to_string(),
        actions,
        explanation,
    })
}

fn validate_action(raw: &Value) -> Result<AgentAction, AgentError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| AgentError::Validation("action is not an object".to_string()))?;

    let field = |name: &str| -> String {
        obj.get(name)
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    };

    let kind = field("type");
    let path = field("path");
    if kind.is_empty() || path.is_empty() {
        return Err(AgentError::Validation(
            "action missing type or path".to_string(),
        ));
    }

    let reason = field("reason");
    let dependencies = obj
        .get("dependencies")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let require_content = || -> Result<String, AgentError> {
        let content = field("content");
        if content.is_empty() {
            return Err(AgentError::Validation(format!(
                "{kind} action for {path} requires content"
            )));
        }
        Ok(content)
    };

    match kind.as_str() {
        "create_file" => Ok(AgentAction::CreateFile {
            content: require_content()?,
            path,
            reason,
            dependencies,
        }),
        "edit_file" => Ok(AgentAction::EditFile {
            content: require_content()?,
            path,
            reason,
            dependencies,
        }),
        "delete_file" => Ok(AgentAction::DeleteFile { path, reason }),
        "create_folder" => Ok(AgentAction::CreateFolder { path, reason }),
        other => Err(AgentError::Validation(format!(
            "unknown action type: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_action(path: &str, content: &str) -> AgentAction {
        AgentAction::CreateFile {
            path: path.to_string(),
            content: content.to_string(),
            reason: String::new(),
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn test_well_formed_json_parses_directly() {
        let raw = r#"{"analysis":"add footer","actions":[{"type":"create_file","path":"src/Footer.jsx","content":"<footer />"}],"explanation":"done"}"#;
        let parsed = try_parse(raw).unwrap();

        assert_eq!(parsed.analysis, "add footer");
        assert_eq!(parsed.actions, vec![create_action("src/Footer.jsx", "<footer />")]);
        assert_eq!(parsed.explanation, "done");
    }

    #[test]
    fn test_json_in_code_fence_and_prose() {
        let raw = "Sure! Here is the plan:\n```json\n{\"analysis\":\"a\",\"actions\":[],\"explanation\":\"e\"}\n```\nLet me know.";
        let parsed = try_parse(raw).unwrap();
        assert_eq!(parsed.analysis, "a");
        assert!(parsed.actions.is_empty());
    }

    #[test]
    fn test_trailing_commas_recovered() {
        let raw = r#"{"analysis":"a","actions":[{"type":"delete_file","path":"old.js",},],"explanation":"e",}"#;
        let parsed = try_parse(raw).unwrap();
        assert_eq!(parsed.actions.len(), 1);
        assert_eq!(parsed.actions[0].kind(), "delete_file");
    }

    #[test]
    fn test_unescaped_quotes_in_content_recovered() {
        let raw = r#"{"analysis":"a","actions":[{"type":"create_file","path":"a.js","content":"say "hello" now"}],"explanation":"e"}"#;
        let parsed = try_parse(raw).unwrap();
        assert_eq!(parsed.actions[0].content(), Some(r#"say "hello" now"#));
    }

    #[test]
    fn test_truncated_response_recovered() {
        // Missing two closing braces and one bracket.
        let raw = r#"{"analysis":"x","actions":[{"type":"create_file","path":"a.js","content":"1""#;
        let parsed = try_parse(raw).unwrap();

        assert_eq!(parsed.analysis, "x");
        assert_eq!(parsed.actions, vec![create_action("a.js", "1")]);
    }

    #[test]
    fn test_truncated_mid_string_recovered() {
        let raw = r#"{"analysis":"x","actions":[],"explanation":"cut of"#;
        let parsed = try_parse(raw).unwrap();
        assert_eq!(parsed.analysis, "x");
        assert!(parsed.actions.is_empty());
    }

    #[test]
    fn test_unquoted_keys_recovered() {
        let raw = r#"{analysis: "a", actions: [], explanation: "e"}"#;
        let parsed = try_parse(raw).unwrap();
        assert_eq!(parsed.analysis, "a");
    }

    #[test]
    fn test_missing_comma_between_objects_recovered() {
        let raw = r#"{"analysis":"a","actions":[{"type":"create_file","path":"a.js","content":"1"} {"type":"create_file","path":"b.js","content":"2"}],"explanation":"e"}"#;
        let parsed = try_parse(raw).unwrap();
        assert_eq!(parsed.actions.len(), 2);
        assert_eq!(parsed.actions[1].path(), "b.js");
    }

    #[test]
    fn test_missing_comma_before_key_recovered() {
        let raw = r#"{"analysis":"a","actions":[{"type":"create_file" "path":"a.js","content":"1"}],"explanation":"e"}"#;
        let parsed = try_parse(raw).unwrap();
        assert_eq!(parsed.actions[0].path(), "a.js");
    }

    #[test]
    fn test_unrecoverable_input_falls_back_to_empty_actions() {
        for raw in ["complete nonsense", "", "{{{{ ::: ]]", "\"just a string\""] {
            let parsed = parse(raw);
            assert!(parsed.actions.is_empty(), "input {raw:?} produced actions");
            assert!(parsed.analysis.contains("Failed to parse"));
            assert!(parsed.explanation.contains("No files will be created"));
        }
    }

    #[test]
    fn test_missing_analysis_is_a_parse_failure() {
        let parsed = parse(r#"{"actions":[{"type":"create_file","path":"a.js","content":"1"}]}"#);
        assert!(parsed.actions.is_empty());
    }

    #[test]
    fn test_create_without_content_is_a_parse_failure() {
        let parsed = parse(r#"{"analysis":"a","actions":[{"type":"create_file","path":"a.js"}],"explanation":"e"}"#);
        assert!(parsed.actions.is_empty());
    }

    #[test]
    fn test_unknown_action_type_is_a_parse_failure() {
        let parsed = parse(r#"{"analysis":"a","actions":[{"type":"rename_file","path":"a.js"}],"explanation":"e"}"#);
        assert!(parsed.actions.is_empty());
    }

    #[test]
    fn test_round_trip() {
        let original = ParsedResponse {
            analysis: "add a footer".to_string(),
            actions: vec![
                create_action("src/Footer.jsx", "export const Footer = () => null;\n"),
                AgentAction::DeleteFile {
                    path: "src/Old.jsx".to_string(),
                    reason: "superseded".to_string(),
                },
            ],
            explanation: "footer added".to_string(),
        };

        let serialized = serde_json::to_string(&original).unwrap();
        assert_eq!(try_parse(&serialized).unwrap(), original);
    }

    #[test]
    fn test_balance_ignores_braces_inside_strings() {
        let raw = r#"{"analysis":"has a { brace","actions":[],"explanation":"e"#;
        let parsed = try_parse(raw).unwrap();
        assert_eq!(parsed.analysis, "has a { brace");
    }
}
