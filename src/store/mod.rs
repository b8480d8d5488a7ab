pub mod dir;
pub mod mem;

pub use dir::DirStore;
pub use mem::MemStore;

use chrono::NaiveDate;

use crate::model::task::NoteId;

/// Error type for note store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("no note named {0}")]
    Missing(NoteId),
    #[error("invalid note id: {0}")]
    InvalidNoteId(String),
    #[error("note store unavailable: {0}")]
    Unavailable(String),
}

/// The host-facing storage contract the engine runs against.
///
/// The engine never patches notes in place: every mutation reads the
/// full line sequence, computes a replacement, and writes the whole
/// sequence back through [`NoteStore::write_lines`].
pub trait NoteStore {
    /// Get-or-create the note conventionally associated with a date.
    /// Naming and template policy belong to the implementation.
    fn resolve_note(&mut self, date: NaiveDate) -> Result<NoteId, StoreError>;

    /// Full current content of a note, as ordered lines.
    fn read_lines(&self, id: &NoteId) -> Result<Vec<String>, StoreError>;

    /// Atomic full replacement of a note's content.
    fn write_lines(&mut self, id: &NoteId, lines: Vec<String>) -> Result<(), StoreError>;

    /// Insert `new_line` under `header`, creating the header (separated
    /// from existing content by a blank line) if absent. Shared by every
    /// relocation write; see [`insert_under_header_in`] for the rules.
    fn insert_under_header(
        &mut self,
        id: &NoteId,
        header: &str,
        new_line: &str,
        blank_line_after_header: bool,
    ) -> Result<(), StoreError> {
        let mut lines = self.read_lines(id)?;
        insert_under_header_in(&mut lines, header, new_line, blank_line_after_header);
        self.write_lines(id, lines)
    }
}

/// Pure header-insertion logic, shared by the trait's provided method and
/// by callers that batch several edits into one write.
///
/// If `header` exists verbatim (modulo trailing whitespace), the new line
/// goes immediately after it — after one blank line when
/// `blank_line_after_header` is set, inserting that blank line if absent.
/// Otherwise the header is appended, separated from any existing content
/// by a single blank line. Returns the index the line landed on.
pub fn insert_under_header_in(
    lines: &mut Vec<String>,
    header: &str,
    new_line: &str,
    blank_line_after_header: bool,
) -> usize {
    if let Some(h) = lines.iter().position(|l| l.trim_end() == header) {
        let mut idx = h + 1;
        if blank_line_after_header {
            if lines.get(idx).is_some_and(|l| l.trim().is_empty()) {
                idx += 1;
            } else {
                lines.insert(idx, String::new());
                idx += 1;
            }
        }
        lines.insert(idx, new_line.to_string());
        return idx;
    }

    if lines.last().is_some_and(|l| !l.trim().is_empty()) {
        lines.push(String::new());
    }
    lines.push(header.to_string());
    if blank_line_after_header {
        lines.push(String::new());
    }
    lines.push(new_line.to_string());
    lines.len() - 1
}
