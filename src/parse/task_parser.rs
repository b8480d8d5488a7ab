use std::sync::LazyLock;

use regex::Regex;

use crate::model::repeat::RepeatRule;
use crate::model::task::{Backlink, Location, NoteId, Task, TaskStatus};

/// Inline metadata token: `@name(value)`. Tags are order-independent and
/// may sit anywhere in the line after the checkbox.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z][A-Za-z0-9_-]*)\(([^()]*)\)").unwrap());

/// Pure predicate: is this line a checkbox task line?
///
/// True exactly for the four recognized glyph forms, independent of
/// status, dates, or anything after the checkbox.
pub fn is_task(line: &str) -> bool {
    checkbox(line).is_some()
}

/// Recognize the checkbox prefix: indent, `- [`, a status glyph, `]`,
/// then either end of line or a space. Returns (indent, status, rest).
fn checkbox(line: &str) -> Option<(usize, TaskStatus, &str)> {
    let indent = count_indent(line);
    let content = &line[indent..];
    let after_marker = content.strip_prefix("- [")?;
    let glyph = after_marker.chars().next()?;
    let status = TaskStatus::from_checkbox_char(glyph)?;
    let after_glyph = &after_marker[glyph.len_utf8()..];
    match after_glyph.strip_prefix(']') {
        Some("") => Some((indent, status, "")),
        Some(rest) => Some((indent, status, rest.strip_prefix(' ')?)),
        None => None,
    }
}

/// Count leading spaces
fn count_indent(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Parse a raw line into a [`Task`]. Returns `None` for anything that is
/// not a checkbox line; never fails on arbitrary text.
///
/// Recognized tags (`@due`, `@repeat`, `@from`) are decoded into their
/// structured fields. Unknown tags — and recognized tags whose value does
/// not decode, or duplicates of an already-seen tag — are preserved
/// verbatim in `extra_tags` and re-emitted on serialization.
pub fn parse_line(raw: &str, line_idx: usize, note: &NoteId) -> Option<Task> {
    let (indent, status, rest) = checkbox(raw)?;

    let mut due = None;
    let mut repeat = None;
    let mut origin = None;
    let mut extra_tags = Vec::new();

    // Collect tag tokens and splice the text out of what remains.
    let mut text_parts: Vec<&str> = Vec::new();
    let mut cursor = 0;
    for caps in TAG_RE.captures_iter(rest) {
        let whole = caps.get(0).unwrap();
        text_parts.push(&rest[cursor..whole.start()]);
        cursor = whole.end();

        let name = &caps[1];
        let value = &caps[2];
        let recognized = match name {
            "due" if due.is_none() => {
                due = value.trim().parse().ok();
                due.is_some()
            }
            "repeat" if repeat.is_none() => {
                repeat = value.parse::<RepeatRule>().ok();
                repeat.is_some()
            }
            "from" if origin.is_none() => {
                origin = Backlink::parse(value.trim());
                origin.is_some()
            }
            _ => false,
        };
        if !recognized {
            extra_tags.push(whole.as_str().to_string());
        }
    }
    text_parts.push(&rest[cursor..]);

    let text = text_parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let mut task = Task {
        status,
        text,
        due,
        repeat,
        origin,
        extra_tags,
        indent,
        location: Some(Location {
            note: note.clone(),
            line: line_idx,
        }),
    };

    // A well-formed moved stub's whole payload is one backlink token.
    if task.status == TaskStatus::Moved
        && task.origin.is_none()
        && let Some(link) = Backlink::parse(&task.text)
    {
        task.origin = Some(link);
        task.text = String::new();
    }

    Some(task)
}
