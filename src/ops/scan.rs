use std::collections::VecDeque;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::config::Config;
use crate::model::repeat::next_occurrence;
use crate::model::task::{NoteId, Task, TaskStatus};
use crate::ops::relocate::Relocator;
use crate::parse::parse_line;
use crate::store::NoteStore;

/// One repetition fired during a scan.
#[derive(Debug, Clone, Serialize)]
pub struct FiredRepeat {
    /// 0-based line the done task occupied when the scan read the note.
    pub line: usize,
    pub text: String,
    pub destination: NoteId,
    pub date: NaiveDate,
}

/// What a single note scan did.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub note: NoteId,
    pub fired: Vec<FiredRepeat>,
    pub errors: Vec<String>,
}

impl ScanReport {
    fn empty(note: NoteId) -> Self {
        ScanReport {
            note,
            fired: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Reacts to note-focus changes: when focus leaves a note, every done
/// task carrying a repeat rule and a due date gets its next occurrence
/// created via the relocation engine. The newly focused note is scanned
/// too, so externally edited notes settle into a consistent state.
///
/// Scans are strictly serialized: one note at a time, focus events that
/// arrive while a drain is in progress are queued behind it, never
/// interleaved.
pub struct ScanController {
    config: Config,
    prev_focus: Option<NoteId>,
    queue: VecDeque<NoteId>,
    draining: bool,
}

impl ScanController {
    pub fn new(config: Config) -> Self {
        ScanController {
            config,
            prev_focus: None,
            queue: VecDeque::new(),
            draining: false,
        }
    }

    /// Handle a focus-change notification. The departed note (if any)
    /// is scanned first, then the entered note. Returns the reports of
    /// every scan this call performed, which includes queued notes from
    /// events that landed mid-drain.
    pub fn focus_changed<S: NoteStore>(
        &mut self,
        store: &mut S,
        entered: Option<NoteId>,
    ) -> Vec<ScanReport> {
        if let Some(departed) = self.prev_focus.take()
            && !self.queue.contains(&departed)
        {
            self.queue.push_back(departed);
        }
        if let Some(ref note) = entered
            && !self.queue.contains(note)
        {
            self.queue.push_back(note.clone());
        }
        self.prev_focus = entered;

        if self.draining {
            // A scan is already in flight further up the stack; the
            // notes stay queued for it.
            return Vec::new();
        }
        self.drain(store)
    }

    fn drain<S: NoteStore>(&mut self, store: &mut S) -> Vec<ScanReport> {
        self.draining = true;
        let mut reports = Vec::new();
        while let Some(note) = self.queue.pop_front() {
            reports.push(self.scan(store, &note));
        }
        self.draining = false;
        reports
    }

    /// Scan one note for due repetitions and fire each through the
    /// relocation engine. Per-task failures are logged and reported; they
    /// never abort the rest of the scan.
    pub fn scan<S: NoteStore>(&self, store: &mut S, note: &NoteId) -> ScanReport {
        let mut report = ScanReport::empty(note.clone());

        let lines = match store.read_lines(note) {
            Ok(lines) => lines,
            Err(e) => {
                log::warn!("scan of {} failed: {}", note, e);
                report.errors.push(e.to_string());
                return report;
            }
        };

        // Candidates in reverse line order: archiving or deleting a later
        // line never shifts an earlier one.
        let mut candidates: Vec<(usize, Task)> = lines
            .iter()
            .enumerate()
            .filter_map(|(idx, raw)| parse_line(raw, idx, note).map(|t| (idx, t)))
            .filter(|(_, t)| due_for_repeat(t))
            .rev()
            .collect();

        for i in 0..candidates.len() {
            let (idx, task) = candidates[i].clone();
            let (Some(rule), Some(due)) = (task.repeat.as_ref(), task.due) else {
                continue;
            };
            let dest_date = next_occurrence(rule, due);

            let mut relocator = Relocator::new(store, &self.config);
            match relocator.relocate(note, idx, &task, dest_date) {
                Ok(outcome) => {
                    log::info!(
                        "repeated {}:{} -> {} ({})",
                        note,
                        idx,
                        outcome.destination,
                        dest_date
                    );
                    let same_note = outcome.destination == *note;
                    report.fired.push(FiredRepeat {
                        line: idx,
                        text: task.text.clone(),
                        destination: outcome.destination,
                        date: dest_date,
                    });
                    if same_note {
                        // The insertion shifted the remaining (earlier)
                        // candidates' lines.
                        resync_candidates(store, note, &mut candidates[i + 1..]);
                    }
                }
                Err(e) => {
                    log::warn!("repeat of {}:{} failed: {}", note, idx, e);
                    report.errors.push(e.to_string());
                }
            }
        }

        report
    }
}

/// Find each remaining candidate's current line after a relocation landed
/// in the scanned note itself. Candidates are held in descending line
/// order; matches are reassigned top-down from below the previous one so
/// identical tasks stay distinct. A candidate with no matching line keeps
/// its stale index and surfaces as a conflict when fired.
fn resync_candidates<S: NoteStore>(
    store: &S,
    note: &NoteId,
    remaining: &mut [(usize, Task)],
) {
    let Ok(lines) = store.read_lines(note) else {
        return;
    };
    let mut below = lines.len();
    for (idx, task) in remaining.iter_mut() {
        if let Some(found) = (0..below)
            .rev()
            .find(|&j| parse_line(&lines[j], j, note).is_some_and(|t| t == *task))
        {
            *idx = found;
            below = found;
        }
    }
}

/// A repetition is due when the task is done and carries both a rule and
/// an anchor date. A rule without a due date is inert.
fn due_for_repeat(task: &Task) -> bool {
    task.status == TaskStatus::Done && task.repeat.is_some() && task.due.is_some()
}
