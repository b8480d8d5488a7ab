use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::model::repeat::RepeatRule;

/// Identifier of a note, as understood by the note store.
///
/// For date-keyed notes this is the `YYYY-MM-DD` date string; arbitrary
/// titles are allowed for notes the store did not create itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        NoteId(id.into())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        NoteId(date.format("%Y-%m-%d").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task checkbox status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    Done,
    Cancelled,
    /// The line is a stub left behind by relocation; its only payload is
    /// a backlink to where the task went.
    Moved,
}

impl TaskStatus {
    /// The character used inside the checkbox `[ ]`
    pub fn checkbox_char(self) -> char {
        match self {
            TaskStatus::Todo => ' ',
            TaskStatus::Done => 'x',
            TaskStatus::Cancelled => '-',
            TaskStatus::Moved => '>',
        }
    }

    /// Parse a checkbox character into a status
    pub fn from_checkbox_char(c: char) -> Option<TaskStatus> {
        match c {
            ' ' => Some(TaskStatus::Todo),
            'x' => Some(TaskStatus::Done),
            '-' => Some(TaskStatus::Cancelled),
            '>' => Some(TaskStatus::Moved),
            _ => None,
        }
    }
}

/// A structured reference to another note (and optionally a line in it),
/// written as `[[note]]`, `[[note#L12]]`, `[[note|alias]]` or
/// `[[note#L12|alias]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backlink {
    pub note: NoteId,
    /// 0-based line anchor. Advisory: line numbers drift under hand edits.
    pub line: Option<usize>,
    /// Display alias shown instead of the raw target.
    pub alias: Option<String>,
}

impl Backlink {
    pub fn to_note(note: NoteId) -> Self {
        Backlink {
            note,
            line: None,
            alias: None,
        }
    }

    /// Parse a full backlink token. Returns `None` unless the whole string
    /// is one well-formed `[[...]]` token.
    pub fn parse(token: &str) -> Option<Backlink> {
        let inner = token.strip_prefix("[[")?.strip_suffix("]]")?;
        if inner.is_empty() || inner.contains("[[") || inner.contains("]]") {
            return None;
        }
        let (target, alias) = match inner.split_once('|') {
            Some((t, a)) if !a.is_empty() => (t, Some(a.to_string())),
            Some(_) => return None,
            None => (inner, None),
        };
        let (note, line) = match target.split_once("#L") {
            Some((n, l)) => (n, Some(l.parse::<usize>().ok()?)),
            None => (target, None),
        };
        if note.is_empty() {
            return None;
        }
        Some(Backlink {
            note: NoteId::new(note),
            line,
            alias,
        })
    }
}

impl fmt::Display for Backlink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[[{}", self.note)?;
        if let Some(line) = self.line {
            write!(f, "#L{}", line)?;
        }
        if let Some(ref alias) = self.alias {
            write!(f, "|{}", alias)?;
        }
        write!(f, "]]")
    }
}

/// Where a task currently sits. Never persisted in the line text;
/// recomputed on every parse pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub note: NoteId,
    /// 0-based line index within the note.
    pub line: usize,
}

/// The structured form of one checkbox line.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub status: TaskStatus,
    /// Display content, with marker syntax and metadata tags stripped.
    /// Empty for a well-formed `Moved` stub.
    pub text: String,
    pub due: Option<NaiveDate>,
    pub repeat: Option<RepeatRule>,
    /// On a `Moved` stub: where the task went. On a freshly relocated
    /// task: where it came from.
    pub origin: Option<Backlink>,
    /// Unrecognized `@name(value)` tokens, verbatim and in order.
    pub extra_tags: Vec<String>,
    /// Leading spaces on the line, preserved across the round trip.
    pub indent: usize,
    #[serde(skip)]
    pub location: Option<Location>,
}

impl Task {
    /// A bare todo task with the given text, no tags, no location.
    pub fn new(status: TaskStatus, text: impl Into<String>) -> Self {
        Task {
            status,
            text: text.into(),
            due: None,
            repeat: None,
            origin: None,
            extra_tags: Vec::new(),
            indent: 0,
            location: None,
        }
    }

    /// The moved-stub counterpart of this task, linking to `dest`.
    pub fn moved_stub(&self, dest: Backlink) -> Task {
        Task {
            status: TaskStatus::Moved,
            text: String::new(),
            due: None,
            repeat: None,
            origin: Some(dest),
            extra_tags: Vec::new(),
            indent: self.indent,
            location: None,
        }
    }
}

// Location is scan-transient bookkeeping, not task identity.
impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status
            && self.text == other.text
            && self.due == other.due
            && self.repeat == other.repeat
            && self.origin == other.origin
            && self.extra_tags == other.extra_tags
            && self.indent == other.indent
    }
}

impl Eq for Task {}
