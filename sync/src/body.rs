//! Issue body rendering and parsing (spec §4.6).
//!
//! A root task and its whole descendant lineage are mirrored onto a single
//! GitHub issue body: prose description, root metadata comments inline,
//! then one `<details>` block per subtask carrying its own metadata
//! comments and `### Description`/`### Result` subsections.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use dex_core::model::Task;

const ROOT_PREFIX: &str = "dex:task";
const SUBTASK_PREFIX: &str = "dex:subtask";

/// Header spellings accepted when parsing, in preference order. The first
/// one present anywhere in the body wins; the latter two are legacy.
const HEADERS: &[&str] = &["## Tasks", "## Subtasks", "## Task Tree", "## Task Details"];

/// A subtask recovered from a `<details>` block, prior to id remapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSubtask {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub completed: bool,
    pub priority: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub commit_sha: Option<String>,
    pub description: String,
    pub result: Option<String>,
}

/// The full parse of an issue body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedIssue {
    pub prose: String,
    pub root_metadata: HashMap<String, String>,
    pub subtasks: Vec<ParsedSubtask>,
}

/// Encodes a value, escaping it to `base64:<...>` whenever it would
/// otherwise corrupt the surrounding framing: a literal newline, the
/// comment-close sequence, a section/block boundary marker that
/// `extract_between` scans for, or collision with the escape prefix itself.
pub fn encode_value(value: &str) -> String {
    let needs_escaping = value.contains('\n')
        || value.contains("-->")
        || value.contains("### Result")
        || value.contains("</details>")
        || value.starts_with("base64:");
    if needs_escaping {
        format!("base64:{}", BASE64.encode(value.as_bytes()))
    } else {
        value.to_string()
    }
}

/// Inverse of [`encode_value`]. Falls back to the raw string if it claims
/// the `base64:` prefix but does not actually decode — better to surface a
/// mangled value than to drop it.
pub fn decode_value(value: &str) -> String {
    if let Some(encoded) = value.strip_prefix("base64:") {
        if let Ok(bytes) = BASE64.decode(encoded) {
            if let Ok(s) = String::from_utf8(bytes) {
                return s;
            }
        }
    }
    value.to_string()
}

fn render_comment(prefix: &str, key: &str, value: &str) -> String {
    format!("<!-- {prefix}:{key}:{} -->", encode_value(value))
}

fn opt_iso(value: Option<DateTime<Utc>>) -> String {
    match value {
        Some(ts) => ts.to_rfc3339(),
        None => "null".to_string(),
    }
}

/// Renders the root's own metadata comments, placed alongside the prose
/// description rather than inside a `<details>` block.
fn render_root_metadata(root: &Task) -> String {
    let mut out = String::new();
    out.push_str(&render_comment(ROOT_PREFIX, "id", &root.id));
    out.push('\n');
    out.push_str(&render_comment(ROOT_PREFIX, "priority", &root.priority.to_string()));
    out.push('\n');
    out.push_str(&render_comment(ROOT_PREFIX, "completed", &root.completed.to_string()));
    out.push('\n');
    out.push_str(&render_comment(ROOT_PREFIX, "created_at", &root.created_at.to_rfc3339()));
    out.push('\n');
    out.push_str(&render_comment(ROOT_PREFIX, "updated_at", &root.updated_at.to_rfc3339()));
    out.push('\n');
    out.push_str(&render_comment(ROOT_PREFIX, "started_at", &opt_iso(root.started_at)));
    out.push('\n');
    out.push_str(&render_comment(ROOT_PREFIX, "completed_at", &opt_iso(root.completed_at)));
    out.push('\n');
    if let Some(commit) = root.metadata.as_ref().and_then(|m| m.commit.as_ref()) {
        out.push_str(&render_comment(ROOT_PREFIX, "commit_sha", &commit.sha));
        out.push('\n');
    }
    out
}

fn render_subtask_block(task: &Task) -> String {
    let summary = if task.completed {
        format!("✅ <b>{}</b>", task.name)
    } else {
        format!("<b>{}</b>", task.name)
    };

    let mut out = String::new();
    out.push_str("<details>\n");
    out.push_str(&format!("<summary>{summary}</summary>\n"));
    out.push_str(&render_comment(SUBTASK_PREFIX, "id", &task.id));
    out.push('\n');
    if let Some(parent) = &task.parent_id {
        out.push_str(&render_comment(SUBTASK_PREFIX, "parent", parent));
        out.push('\n');
    }
    out.push_str(&render_comment(SUBTASK_PREFIX, "priority", &task.priority.to_string()));
    out.push('\n');
    out.push_str(&render_comment(SUBTASK_PREFIX, "completed", &task.completed.to_string()));
    out.push('\n');
    out.push_str(&render_comment(SUBTASK_PREFIX, "created_at", &task.created_at.to_rfc3339()));
    out.push('\n');
    out.push_str(&render_comment(SUBTASK_PREFIX, "updated_at", &task.updated_at.to_rfc3339()));
    out.push('\n');
    out.push_str(&render_comment(SUBTASK_PREFIX, "started_at", &opt_iso(task.started_at)));
    out.push('\n');
    out.push_str(&render_comment(SUBTASK_PREFIX, "completed_at", &opt_iso(task.completed_at)));
    out.push('\n');
    if let Some(commit) = task.metadata.as_ref().and_then(|m| m.commit.as_ref()) {
        out.push_str(&render_comment(SUBTASK_PREFIX, "commit_sha", &commit.sha));
        out.push('\n');
    }
    out.push_str("### Description\n");
    out.push_str(&encode_value(&task.description));
    out.push_str("\n\n### Result\n");
    out.push_str(&encode_value(task.result.as_deref().unwrap_or("")));
    out.push_str("\n</details>\n");
    out
}

/// Renders the full issue body for a root task and its descendants, in the
/// order the caller supplies them (typically a depth-first walk so that
/// `dex:subtask:parent:` comments always precede their own children in the
/// text, though parsing does not require that order).
pub fn render_issue_body(root: &Task, descendants: &[&Task]) -> String {
    let mut out = String::new();
    out.push_str(&encode_value(root.description.trim_end()));
    out.push_str("\n\n");
    out.push_str(&render_root_metadata(root));
    out.push_str("\n## Tasks\n\n");
    for task in descendants {
        out.push_str(&render_subtask_block(task));
        out.push('\n');
    }
    out
}

fn find_header(body: &str) -> Option<(usize, usize)> {
    HEADERS
        .iter()
        .find_map(|h| body.find(h).map(|idx| (idx, idx + h.len())))
}

fn parse_comments(prefix: &str, text: &str) -> HashMap<String, String> {
    let marker = format!("<!-- {prefix}:");
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix(&marker) else {
            continue;
        };
        let Some(rest) = rest.strip_suffix("-->") else {
            continue;
        };
        let rest = rest.trim_end();
        if let Some((key, value)) = rest.split_once(':') {
            map.insert(key.to_string(), decode_value(value));
        }
    }
    map
}

fn parse_opt_iso(map: &HashMap<String, String>, key: &str) -> Option<DateTime<Utc>> {
    map.get(key)
        .filter(|v| v.as_str() != "null")
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Public counterpart of [`parse_opt_iso`], for callers materializing a
/// `root_metadata` map back into a `Task` (import's root side).
pub fn parse_metadata_timestamp(map: &HashMap<String, String>, key: &str) -> Option<DateTime<Utc>> {
    parse_opt_iso(map, key)
}

/// Parses a boolean metadata value, defaulting to `false` if absent or
/// unparsable.
pub fn parse_metadata_bool(map: &HashMap<String, String>, key: &str) -> bool {
    map.get(key).and_then(|v| v.parse().ok()).unwrap_or(false)
}

fn strip_bold(s: &str) -> String {
    s.trim()
        .trim_start_matches("<b>")
        .trim_end_matches("</b>")
        .trim()
        .to_string()
}

/// Parses a `<summary>` line's text into `(completed, name)`, accepting
/// both the new `✅ <b>name</b>` form and the legacy `[ ]`/`[x]` checkbox
/// form.
fn parse_summary(raw: &str) -> (bool, String) {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix('✅') {
        return (true, strip_bold(rest));
    }
    if let Some(rest) = trimmed
        .strip_prefix("[x]")
        .or_else(|| trimmed.strip_prefix("[X]"))
    {
        return (true, strip_bold(rest));
    }
    if let Some(rest) = trimmed.strip_prefix("[ ]") {
        return (false, strip_bold(rest));
    }
    (false, strip_bold(trimmed))
}

fn extract_between<'a>(text: &'a str, start_tag: &str, end_tags: &[&str]) -> Option<&'a str> {
    let start = text.find(start_tag)? + start_tag.len();
    let rest = &text[start..];
    let end = end_tags
        .iter()
        .filter_map(|t| rest.find(t))
        .min()
        .unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn parse_subtask_block(block: &str) -> Option<ParsedSubtask> {
    let summary_raw = extract_between(block, "<summary>", &["</summary>"])?;
    let (completed, name) = parse_summary(summary_raw);
    let meta = parse_comments(SUBTASK_PREFIX, block);
    let id = meta.get("id")?.clone();

    let description = decode_value(
        extract_between(block, "### Description", &["### Result", "</details>"]).unwrap_or_default(),
    );
    let result = extract_between(block, "### Result", &["</details>"])
        .map(decode_value)
        .filter(|s| !s.is_empty());

    Some(ParsedSubtask {
        id,
        parent_id: meta.get("parent").cloned(),
        name,
        completed,
        priority: meta.get("priority").and_then(|v| v.parse().ok()),
        created_at: parse_opt_iso(&meta, "created_at"),
        updated_at: parse_opt_iso(&meta, "updated_at"),
        started_at: parse_opt_iso(&meta, "started_at"),
        completed_at: parse_opt_iso(&meta, "completed_at"),
        commit_sha: meta.get("commit_sha").cloned(),
        description,
        result,
    })
}

/// Parses a rendered issue body back into prose, root metadata and the
/// list of recovered subtasks. Blocks missing an `id` comment are skipped
/// rather than erroring, per spec.
pub fn parse_issue_body(body: &str) -> ParsedIssue {
    let Some((header_start, header_end)) = find_header(body) else {
        return ParsedIssue {
            prose: decode_value(strip_root_metadata_comments(body).trim()),
            root_metadata: parse_comments(ROOT_PREFIX, body),
            subtasks: Vec::new(),
        };
    };

    let before = &body[..header_start];
    let after = &body[header_end..];

    let root_metadata = parse_comments(ROOT_PREFIX, before);
    let prose = decode_value(strip_root_metadata_comments(before).trim());

    let mut subtasks = Vec::new();
    let mut cursor = 0usize;
    while let Some(rel_start) = after[cursor..].find("<details>") {
        let start = cursor + rel_start;
        let Some(rel_end) = after[start..].find("</details>") else {
            break;
        };
        let end = start + rel_end + "</details>".len();
        let block = &after[start..end];
        if let Some(parsed) = parse_subtask_block(block) {
            subtasks.push(parsed);
        }
        cursor = end;
    }

    ParsedIssue {
        prose,
        root_metadata,
        subtasks,
    }
}

fn strip_root_metadata_comments(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().starts_with("<!-- dex:task:"))
        .collect::<Vec<_>>()
        .join("\n")
}
