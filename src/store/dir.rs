use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use crate::model::task::NoteId;
use crate::store::{NoteStore, StoreError};

/// A note store over a flat directory of markdown files: the note for a
/// date lives in `<root>/YYYY-MM-DD.md`, created empty on first resolve.
/// Notes with arbitrary titles are readable and writable but never
/// created by the store itself.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn note_path(&self, id: &NoteId) -> Result<PathBuf, StoreError> {
        let name = id.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(StoreError::InvalidNoteId(name.to_string()));
        }
        Ok(self.root.join(format!("{}.md", name)))
    }
}

impl NoteStore for DirStore {
    fn resolve_note(&mut self, date: NaiveDate) -> Result<NoteId, StoreError> {
        let id = NoteId::from_date(date);
        let path = self.note_path(&id)?;
        if !path.exists() {
            atomic_write(&path, b"").map_err(|e| StoreError::Write {
                path: path.clone(),
                source: e,
            })?;
            log::info!("created note {}", id);
        }
        Ok(id)
    }

    fn read_lines(&self, id: &NoteId) -> Result<Vec<String>, StoreError> {
        let path = self.note_path(id)?;
        if !path.exists() {
            return Err(StoreError::Missing(id.clone()));
        }
        let text = fs::read_to_string(&path).map_err(|e| StoreError::Read {
            path: path.clone(),
            source: e,
        })?;
        Ok(text.lines().map(|l| l.to_string()).collect())
    }

    fn write_lines(&mut self, id: &NoteId, lines: Vec<String>) -> Result<(), StoreError> {
        let path = self.note_path(id)?;
        let mut content = lines.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        atomic_write(&path, content.as_bytes()).map_err(|e| StoreError::Write {
            path,
            source: e,
        })
    }
}

/// Write via a temp file in the same directory, then rename into place.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_resolve_creates_empty_note() {
        let tmp = TempDir::new().unwrap();
        let mut store = DirStore::new(tmp.path());

        let id = store.resolve_note(date("2026-03-02")).unwrap();
        assert_eq!(id.as_str(), "2026-03-02");
        assert!(tmp.path().join("2026-03-02.md").exists());
        assert_eq!(store.read_lines(&id).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_resolve_is_get_or_create() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("2026-03-02.md"), "existing\n").unwrap();
        let mut store = DirStore::new(tmp.path());

        let id = store.resolve_note(date("2026-03-02")).unwrap();
        assert_eq!(store.read_lines(&id).unwrap(), vec!["existing"]);
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut store = DirStore::new(tmp.path());
        let id = store.resolve_note(date("2026-03-02")).unwrap();

        let lines = vec!["## Tasks".to_string(), String::new(), "- [ ] a".to_string()];
        store.write_lines(&id, lines.clone()).unwrap();
        assert_eq!(store.read_lines(&id).unwrap(), lines);
        assert_eq!(
            fs::read_to_string(tmp.path().join("2026-03-02.md")).unwrap(),
            "## Tasks\n\n- [ ] a\n"
        );
    }

    #[test]
    fn test_missing_note_errors() {
        let tmp = TempDir::new().unwrap();
        let store = DirStore::new(tmp.path());
        let err = store.read_lines(&NoteId::new("2026-03-02")).unwrap_err();
        assert!(matches!(err, StoreError::Missing(_)));
    }

    #[test]
    fn test_rejects_path_traversal_ids() {
        let tmp = TempDir::new().unwrap();
        let store = DirStore::new(tmp.path());
        for bad in ["../evil", "a/b", ".hidden", ""] {
            let err = store.read_lines(&NoteId::new(bad)).unwrap_err();
            assert!(matches!(err, StoreError::InvalidNoteId(_)), "{bad}");
        }
    }

    #[test]
    fn test_insert_under_header_provided_method() {
        let tmp = TempDir::new().unwrap();
        let mut store = DirStore::new(tmp.path());
        let id = store.resolve_note(date("2026-03-02")).unwrap();

        store
            .insert_under_header(&id, "## Tasks", "- [ ] a", true)
            .unwrap();
        assert_eq!(
            store.read_lines(&id).unwrap(),
            vec!["## Tasks", "", "- [ ] a"]
        );
    }
}
