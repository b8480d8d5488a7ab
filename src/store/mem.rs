use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::task::NoteId;
use crate::store::{NoteStore, StoreError};

/// In-memory note store used by the test suites and by embedders that
/// supply their own persistence.
#[derive(Debug, Default)]
pub struct MemStore {
    notes: BTreeMap<NoteId, Vec<String>>,
    /// When set, `resolve_note` fails. Lets tests exercise the
    /// destination-unavailable path.
    pub fail_resolve: bool,
    /// Every note id passed to `write_lines`, in order.
    pub write_log: Vec<NoteId>,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore::default()
    }

    /// Seed a note from a text blob. Builder-style for test setup.
    pub fn with_note(mut self, id: &str, text: &str) -> Self {
        self.notes.insert(
            NoteId::new(id),
            text.lines().map(|l| l.to_string()).collect(),
        );
        self
    }

    /// Current content of a note as one string, or `None` if absent.
    pub fn text(&self, id: &str) -> Option<String> {
        self.notes.get(&NoteId::new(id)).map(|lines| lines.join("\n"))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.notes.contains_key(&NoteId::new(id))
    }
}

impl NoteStore for MemStore {
    fn resolve_note(&mut self, date: NaiveDate) -> Result<NoteId, StoreError> {
        if self.fail_resolve {
            return Err(StoreError::Unavailable("resolve disabled".to_string()));
        }
        let id = NoteId::from_date(date);
        self.notes.entry(id.clone()).or_default();
        Ok(id)
    }

    fn read_lines(&self, id: &NoteId) -> Result<Vec<String>, StoreError> {
        self.notes
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::Missing(id.clone()))
    }

    fn write_lines(&mut self, id: &NoteId, lines: Vec<String>) -> Result<(), StoreError> {
        if !self.notes.contains_key(id) {
            return Err(StoreError::Missing(id.clone()));
        }
        self.write_log.push(id.clone());
        self.notes.insert(id.clone(), lines);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_resolve_get_or_create() {
        let mut store = MemStore::new();
        let id = store.resolve_note(date("2026-03-02")).unwrap();
        assert_eq!(id.as_str(), "2026-03-02");
        assert_eq!(store.read_lines(&id).unwrap(), Vec::<String>::new());

        // Existing content survives a second resolve
        store
            .write_lines(&id, vec!["- [ ] a".to_string()])
            .unwrap();
        store.resolve_note(date("2026-03-02")).unwrap();
        assert_eq!(store.text("2026-03-02").unwrap(), "- [ ] a");
    }

    #[test]
    fn test_fail_resolve_knob() {
        let mut store = MemStore::new();
        store.fail_resolve = true;
        assert!(matches!(
            store.resolve_note(date("2026-03-02")),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn test_write_log_records_writes() {
        let mut store = MemStore::new().with_note("a", "x");
        store
            .write_lines(&NoteId::new("a"), vec!["y".to_string()])
            .unwrap();
        assert_eq!(store.write_log, vec![NoteId::new("a")]);
    }

    #[test]
    fn test_write_to_unknown_note_is_missing() {
        let mut store = MemStore::new();
        let err = store
            .write_lines(&NoteId::new("nope"), Vec::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::Missing(_)));
    }
}
