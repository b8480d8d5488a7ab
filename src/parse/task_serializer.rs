use crate::model::task::{Task, TaskStatus};

/// Fixed-width glyph prefix of a moved stub, following the `- ` list
/// marker: glyph plus trailing space, 4 characters. Preview renderers
/// strip exactly this prefix and substitute an icon, so the width is a
/// wire contract and must not change.
pub const MOVED_PREFIX: &str = "[>] ";

/// Serialize a task back to its raw line form. Exact inverse of
/// [`crate::parse::parse_line`] for any task it produced.
///
/// Tag order is canonical: text, `@due`, `@repeat`, `@from`, then any
/// preserved unknown tags in their original order.
pub fn serialize_line(task: &Task) -> String {
    let mut line = format!(
        "{}- [{}]",
        " ".repeat(task.indent),
        task.status.checkbox_char()
    );

    // A stub's backlink takes the text slot; on a hand-written moved
    // line whose text survived parsing, the origin stays an @from tag.
    let stub = task.status == TaskStatus::Moved && task.text.is_empty();
    if stub {
        if let Some(ref link) = task.origin {
            line.push(' ');
            line.push_str(&link.to_string());
        }
    } else if !task.text.is_empty() {
        line.push(' ');
        line.push_str(&task.text);
    }
    if let Some(due) = task.due {
        line.push_str(&format!(" @due({})", due.format("%Y-%m-%d")));
    }
    if let Some(ref rule) = task.repeat {
        line.push_str(&format!(" @repeat({})", rule));
    }
    if !stub && let Some(ref link) = task.origin {
        line.push_str(&format!(" @from({})", link));
    }
    for tag in &task.extra_tags {
        line.push(' ');
        line.push_str(tag);
    }

    line
}

/// The renderer-facing moved-stub contract: if `line` is a moved stub,
/// return the text after the list marker and the fixed [`MOVED_PREFIX`],
/// i.e. what a preview should display next to its icon.
pub fn moved_display_rest(line: &str) -> Option<&str> {
    let content = line.trim_start_matches(' ');
    content.strip_prefix("- ")?.strip_prefix(MOVED_PREFIX)
}
