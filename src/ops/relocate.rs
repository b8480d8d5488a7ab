use chrono::NaiveDate;

use crate::model::config::Config;
use crate::model::repeat::{RepeatRule, next_occurrence};
use crate::model::task::{Backlink, NoteId, Task, TaskStatus};
use crate::parse::{parse_line, serialize_line};
use crate::store::{NoteStore, StoreError, insert_under_header_in};

/// Error type for relocation operations
#[derive(Debug, thiserror::Error)]
pub enum RelocateError {
    #[error("{note}:{line} is not a task line")]
    NotATask { note: NoteId, line: usize },
    #[error("{note} has no line {line}")]
    LineOutOfRange { note: NoteId, line: usize },
    #[error("could not resolve destination note for {date}: {source}")]
    DestinationUnavailable {
        date: NaiveDate,
        #[source]
        source: StoreError,
    },
    #[error("task at {note}:{line} changed since it was read; rerun against current content")]
    Conflict { note: NoteId, line: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a committed relocation.
#[derive(Debug, Clone)]
pub struct RelocationOutcome {
    pub destination: NoteId,
    /// The serialized task line inserted at the destination.
    pub new_line: String,
    /// Whether the origin was rewritten to a moved stub (true) or
    /// deleted outright (false).
    pub origin_preserved: bool,
}

/// Orchestrates cross-note task moves against a [`NoteStore`].
///
/// Every operation is two-phase: plan against fresh reads (the addressed
/// line must still parse to the task being acted on, the destination must
/// resolve), then apply, writing the destination before rewriting the
/// origin. A crash between the two writes duplicates the task instead of
/// losing it.
pub struct Relocator<'a, S: NoteStore> {
    store: &'a mut S,
    config: &'a Config,
}

impl<'a, S: NoteStore> Relocator<'a, S> {
    pub fn new(store: &'a mut S, config: &'a Config) -> Self {
        Relocator { store, config }
    }

    /// Locate and parse the task at `note`:`line`.
    pub fn task_at(&self, note: &NoteId, line: usize) -> Result<Task, RelocateError> {
        let lines = self.store.read_lines(note)?;
        let raw = lines.get(line).ok_or(RelocateError::LineOutOfRange {
            note: note.clone(),
            line,
        })?;
        parse_line(raw, line, note).ok_or(RelocateError::NotATask {
            note: note.clone(),
            line,
        })
    }

    /// Transplant `expected` (previously parsed from `origin`:`line`) to
    /// the note for `dest_date`.
    ///
    /// The destination copy is reset to todo with its due date set to
    /// `dest_date`; the repeat rule carries over so future occurrences
    /// keep firing. The origin line becomes a moved stub or is deleted,
    /// per `preserve_moved_tasks`.
    pub fn relocate(
        &mut self,
        origin: &NoteId,
        line: usize,
        expected: &Task,
        dest_date: NaiveDate,
    ) -> Result<RelocationOutcome, RelocateError> {
        // Plan: both ends must read cleanly before anything is written.
        let origin_lines = self.store.read_lines(origin)?;
        verify_unchanged(&origin_lines, origin, line, expected)?;

        let dest = self
            .store
            .resolve_note(dest_date)
            .map_err(|source| RelocateError::DestinationUnavailable {
                date: dest_date,
                source,
            })?;

        let new_line = serialize_line(&self.destination_task(expected, origin, line, dest_date));

        if dest == *origin {
            // Same-note move: one read-modify-write, no crash window.
            let mut lines = origin_lines;
            let len_before = lines.len();
            let inserted = insert_under_header_in(
                &mut lines,
                &self.config.tasks_header,
                &new_line,
                self.config.blank_line_after_header,
            );
            // The insert may add a blank line along with the task; shift
            // the origin index by however many lines landed above it.
            let shift = lines.len() - len_before;
            let first_inserted = inserted + 1 - shift;
            let line_now = if first_inserted <= line {
                line + shift
            } else {
                line
            };
            self.rewrite_origin_line(&mut lines, line_now, expected, &dest);
            self.store.write_lines(&dest, lines)?;
        } else {
            let mut dest_lines = self.store.read_lines(&dest)?;
            insert_under_header_in(
                &mut dest_lines,
                &self.config.tasks_header,
                &new_line,
                self.config.blank_line_after_header,
            );
            // Apply: destination first, so an interruption duplicates
            // rather than loses.
            self.store.write_lines(&dest, dest_lines)?;

            // Re-read the origin for the rewrite; the destination write
            // was a suspension point.
            let mut origin_now = self.store.read_lines(origin)?;
            if let Err(e) = verify_unchanged(&origin_now, origin, line, expected) {
                log::warn!(
                    "origin {}:{} changed after destination write; task is duplicated in {}",
                    origin,
                    line,
                    dest
                );
                return Err(e);
            }
            self.rewrite_origin_line(&mut origin_now, line, expected, &dest);
            self.store.write_lines(origin, origin_now)?;
        }

        log::info!("relocated {}:{} -> {}", origin, line, dest);
        Ok(RelocationOutcome {
            destination: dest,
            new_line,
            origin_preserved: self.config.preserve_moved_tasks,
        })
    }

    /// Write (or replace) the repeat rule tag on the task at
    /// `note`:`line`, without relocating anything. Returns the rewritten
    /// line.
    pub fn set_repeat(
        &mut self,
        note: &NoteId,
        line: usize,
        rule: RepeatRule,
    ) -> Result<String, RelocateError> {
        let mut lines = self.store.read_lines(note)?;
        let raw = lines.get(line).ok_or(RelocateError::LineOutOfRange {
            note: note.clone(),
            line,
        })?;
        let mut task = parse_line(raw, line, note).ok_or(RelocateError::NotATask {
            note: note.clone(),
            line,
        })?;
        if task.due.is_none() {
            // A rule with no anchor date never fires; keep it anyway, the
            // user may add a due date later.
            log::warn!("{}:{} has a repeat rule but no @due date", note, line);
        }
        task.repeat = Some(rule);
        let new_line = serialize_line(&task);
        if *raw != new_line {
            lines[line] = new_line.clone();
            self.store.write_lines(note, lines)?;
        }
        Ok(new_line)
    }

    /// Mark the task at `note`:`line` done. If it carries a repeat rule
    /// and a due date, immediately fire the repetition: the next
    /// occurrence is created and the done line is archived or removed.
    pub fn complete(
        &mut self,
        note: &NoteId,
        line: usize,
    ) -> Result<Option<RelocationOutcome>, RelocateError> {
        let mut lines = self.store.read_lines(note)?;
        let raw = lines.get(line).ok_or(RelocateError::LineOutOfRange {
            note: note.clone(),
            line,
        })?;
        let mut task = parse_line(raw, line, note).ok_or(RelocateError::NotATask {
            note: note.clone(),
            line,
        })?;

        if task.status != TaskStatus::Done {
            task.status = TaskStatus::Done;
            lines[line] = serialize_line(&task);
            self.store.write_lines(note, lines)?;
        }

        match (task.repeat.clone(), task.due) {
            (Some(rule), Some(due)) => {
                let dest_date = next_occurrence(&rule, due);
                let outcome = self.relocate(note, line, &task, dest_date)?;
                Ok(Some(outcome))
            }
            _ => Ok(None),
        }
    }

    /// The task as it will appear at the destination.
    fn destination_task(
        &self,
        expected: &Task,
        origin: &NoteId,
        line: usize,
        dest_date: NaiveDate,
    ) -> Task {
        let mut next = expected.clone();
        next.status = TaskStatus::Todo;
        next.due = Some(dest_date);
        next.indent = 0;
        next.location = None;
        next.origin = if self.config.preserve_moved_tasks {
            Some(Backlink {
                note: origin.clone(),
                line: Some(line),
                alias: self.alias(),
            })
        } else {
            None
        };
        next
    }

    fn alias(&self) -> Option<String> {
        if self.config.alias_links {
            Some("Origin".to_string())
        } else {
            None
        }
    }

    /// Step 4 of the transition: stub or delete the origin line.
    fn rewrite_origin_line(
        &self,
        lines: &mut Vec<String>,
        line: usize,
        expected: &Task,
        dest: &NoteId,
    ) {
        if self.config.preserve_moved_tasks {
            let stub = expected.moved_stub(Backlink::to_note(dest.clone()));
            lines[line] = serialize_line(&stub);
        } else {
            lines.remove(line);
        }
    }
}

/// Conflict gate: the line must still parse to the very task the caller
/// is holding. Compares parsed form, not raw bytes, so cosmetic
/// whitespace edits do not abort the move.
fn verify_unchanged(
    lines: &[String],
    note: &NoteId,
    line: usize,
    expected: &Task,
) -> Result<(), RelocateError> {
    let current = lines
        .get(line)
        .and_then(|raw| parse_line(raw, line, note));
    match current {
        Some(ref task) if task == expected => Ok(()),
        _ => Err(RelocateError::Conflict {
            note: note.clone(),
            line,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn origin_note() -> String {
        "\
# 2026-03-02

## Tasks

- [ ] Buy milk @due(2026-03-02) @ctx(errands)
- [x] Water plants @due(2026-03-02) @repeat(1w mon,thu)
"
        .to_string()
    }

    fn setup() -> (MemStore, Config) {
        let store = MemStore::new().with_note("2026-03-02", &origin_note());
        (store, Config::default())
    }

    #[test]
    fn test_relocate_preserves_text_and_tags() {
        let (mut store, config) = setup();
        let note = NoteId::new("2026-03-02");
        let task = Relocator::new(&mut store, &config)
            .task_at(&note, 4)
            .unwrap();
        let outcome = Relocator::new(&mut store, &config)
            .relocate(&note, 4, &task, date("2026-03-05"))
            .unwrap();

        assert_eq!(outcome.destination.as_str(), "2026-03-05");
        assert_eq!(
            outcome.new_line,
            "- [ ] Buy milk @due(2026-03-05) @from([[2026-03-02#L4]]) @ctx(errands)"
        );
        assert_eq!(
            store.text("2026-03-05").unwrap(),
            "## Tasks\n\n- [ ] Buy milk @due(2026-03-05) @from([[2026-03-02#L4]]) @ctx(errands)"
        );
    }

    #[test]
    fn test_relocate_leaves_moved_stub() {
        let (mut store, config) = setup();
        let note = NoteId::new("2026-03-02");
        let task = Relocator::new(&mut store, &config)
            .task_at(&note, 4)
            .unwrap();
        Relocator::new(&mut store, &config)
            .relocate(&note, 4, &task, date("2026-03-05"))
            .unwrap();

        let origin = store.text("2026-03-02").unwrap();
        assert!(origin.contains("- [>] [[2026-03-05]]"));
        assert!(!origin.contains("- [ ] Buy milk"));
    }

    #[test]
    fn test_relocate_delete_origin_when_not_preserving() {
        let (mut store, mut config) = setup();
        config.preserve_moved_tasks = false;
        let note = NoteId::new("2026-03-02");
        let task = Relocator::new(&mut store, &config)
            .task_at(&note, 4)
            .unwrap();
        let outcome = Relocator::new(&mut store, &config)
            .relocate(&note, 4, &task, date("2026-03-05"))
            .unwrap();

        assert!(!outcome.origin_preserved);
        let origin = store.text("2026-03-02").unwrap();
        assert!(!origin.contains("Buy milk"));
        assert!(!origin.contains("[>]"));
        // no @from backlink without preservation, but the repeat rule on
        // the other task is untouched
        assert!(!store.text("2026-03-05").unwrap().contains("@from"));
    }

    #[test]
    fn test_relocate_carries_repeat_rule_forward() {
        let (mut store, config) = setup();
        let note = NoteId::new("2026-03-02");
        let task = Relocator::new(&mut store, &config)
            .task_at(&note, 5)
            .unwrap();
        Relocator::new(&mut store, &config)
            .relocate(&note, 5, &task, date("2026-03-05"))
            .unwrap();

        let dest = store.text("2026-03-05").unwrap();
        assert!(dest.contains("@repeat(1w mon,thu)"));
        assert!(dest.contains("- [ ] Water plants @due(2026-03-05)"));
    }

    #[test]
    fn test_relocate_alias_links() {
        let (mut store, mut config) = setup();
        config.alias_links = true;
        let note = NoteId::new("2026-03-02");
        let task = Relocator::new(&mut store, &config)
            .task_at(&note, 4)
            .unwrap();
        Relocator::new(&mut store, &config)
            .relocate(&note, 4, &task, date("2026-03-05"))
            .unwrap();

        assert!(
            store
                .text("2026-03-05")
                .unwrap()
                .contains("@from([[2026-03-02#L4|Origin]])")
        );
    }

    #[test]
    fn test_relocate_conflict_aborts_before_any_write() {
        let (mut store, config) = setup();
        let note = NoteId::new("2026-03-02");
        let task = Relocator::new(&mut store, &config)
            .task_at(&note, 4)
            .unwrap();

        // Concurrent edit between parse and relocate
        let mut lines = store.read_lines(&note).unwrap();
        lines[4] = "- [ ] Buy oat milk @due(2026-03-02)".to_string();
        store.write_lines(&note, lines).unwrap();
        store.write_log.clear();

        let err = Relocator::new(&mut store, &config)
            .relocate(&note, 4, &task, date("2026-03-05"))
            .unwrap_err();
        assert!(matches!(err, RelocateError::Conflict { .. }));
        // no destination note, no writes at all
        assert!(!store.contains("2026-03-05"));
        assert!(store.write_log.is_empty());
    }

    #[test]
    fn test_relocate_destination_unavailable_aborts_clean() {
        let (mut store, config) = setup();
        store.fail_resolve = true;
        let note = NoteId::new("2026-03-02");
        let before = store.text("2026-03-02").unwrap();
        let task = Relocator::new(&mut store, &config)
            .task_at(&note, 4)
            .unwrap();

        let err = Relocator::new(&mut store, &config)
            .relocate(&note, 4, &task, date("2026-03-05"))
            .unwrap_err();
        assert!(matches!(err, RelocateError::DestinationUnavailable { .. }));
        assert_eq!(store.text("2026-03-02").unwrap(), before);
    }

    #[test]
    fn test_relocate_within_same_note() {
        let config = Config::default();
        let mut store = MemStore::new().with_note(
            "2026-03-05",
            "## Tasks\n\n- [ ] Call dentist @due(2026-03-02)\n",
        );
        let note = NoteId::new("2026-03-05");
        let task = Relocator::new(&mut store, &config)
            .task_at(&note, 2)
            .unwrap();
        Relocator::new(&mut store, &config)
            .relocate(&note, 2, &task, date("2026-03-05"))
            .unwrap();

        assert_eq!(
            store.text("2026-03-05").unwrap(),
            "## Tasks\n\n- [ ] Call dentist @due(2026-03-05) @from([[2026-03-05#L2]])\n- [>] [[2026-03-05]]"
        );
    }

    #[test]
    fn test_relocate_within_same_note_adds_missing_blank_line() {
        let config = Config::default();
        let mut store = MemStore::new().with_note(
            "2026-03-05",
            "## Tasks\n- [ ] Call dentist @due(2026-03-02)\n",
        );
        let note = NoteId::new("2026-03-05");
        let task = Relocator::new(&mut store, &config)
            .task_at(&note, 1)
            .unwrap();
        Relocator::new(&mut store, &config)
            .relocate(&note, 1, &task, date("2026-03-05"))
            .unwrap();

        // Two lines land above the origin (blank + task); the stub must
        // replace the original line, not the inserted blank.
        assert_eq!(
            store.text("2026-03-05").unwrap(),
            "## Tasks\n\n- [ ] Call dentist @due(2026-03-05) @from([[2026-03-05#L1]])\n- [>] [[2026-03-05]]"
        );
    }

    #[test]
    fn test_set_repeat_rewrites_line_only() {
        let (mut store, config) = setup();
        let note = NoteId::new("2026-03-02");
        let new_line = Relocator::new(&mut store, &config)
            .set_repeat(&note, 4, "3d".parse().unwrap())
            .unwrap();

        assert_eq!(
            new_line,
            "- [ ] Buy milk @due(2026-03-02) @repeat(3d) @ctx(errands)"
        );
        assert!(store.text("2026-03-02").unwrap().contains(&new_line));
        assert!(!store.contains("2026-03-05"));
    }

    #[test]
    fn test_set_repeat_on_non_task_line() {
        let (mut store, config) = setup();
        let note = NoteId::new("2026-03-02");
        let err = Relocator::new(&mut store, &config)
            .set_repeat(&note, 0, "3d".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, RelocateError::NotATask { .. }));
    }

    #[test]
    fn test_complete_without_rule_just_marks_done() {
        let (mut store, config) = setup();
        let note = NoteId::new("2026-03-02");
        let outcome = Relocator::new(&mut store, &config)
            .complete(&note, 4)
            .unwrap();

        assert!(outcome.is_none());
        assert!(
            store
                .text("2026-03-02")
                .unwrap()
                .contains("- [x] Buy milk @due(2026-03-02) @ctx(errands)")
        );
    }

    #[test]
    fn test_complete_repeating_task_fires_next_occurrence() {
        let config = Config::default();
        let mut store = MemStore::new().with_note(
            "2026-03-02",
            "## Tasks\n\n- [ ] Water plants @due(2026-03-02) @repeat(3d)\n",
        );
        let note = NoteId::new("2026-03-02");
        let outcome = Relocator::new(&mut store, &config)
            .complete(&note, 2)
            .unwrap()
            .unwrap();

        assert_eq!(outcome.destination.as_str(), "2026-03-05");
        let dest = store.text("2026-03-05").unwrap();
        assert!(dest.contains("- [ ] Water plants @due(2026-03-05) @repeat(3d)"));
        assert!(
            store
                .text("2026-03-02")
                .unwrap()
                .contains("- [>] [[2026-03-05]]")
        );
    }
}
