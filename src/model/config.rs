use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine settings, loaded from `daymark.toml` in the notes directory.
///
/// Supplied to every engine operation as an immutable snapshot; the
/// engine never writes settings back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Header line under which relocated tasks are inserted.
    #[serde(default = "default_tasks_header")]
    pub tasks_header: String,
    /// Keep one blank line between the header and the first task.
    #[serde(default = "default_true")]
    pub blank_line_after_header: bool,
    /// Leave a moved-status stub with a backlink at the origin instead of
    /// deleting the line.
    #[serde(default = "default_true")]
    pub preserve_moved_tasks: bool,
    /// Render backlinks with an `Origin` display alias instead of the
    /// literal target.
    #[serde(default)]
    pub alias_links: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tasks_header: default_tasks_header(),
            blank_line_after_header: true,
            preserve_moved_tasks: true,
            alias_links: false,
        }
    }
}

fn default_tasks_header() -> String {
    "## Tasks".to_string()
}

fn default_true() -> bool {
    true
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse daymark.toml: {0}")]
    ParseError(#[from] toml::de::Error),
}

impl Config {
    /// Load `daymark.toml` from the given notes directory. A missing file
    /// is not an error; defaults apply.
    pub fn load(notes_dir: &Path) -> Result<Config, ConfigError> {
        let path = notes_dir.join("daymark.toml");
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        Ok(toml::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tasks_header, "## Tasks");
        assert!(config.blank_line_after_header);
        assert!(config.preserve_moved_tasks);
        assert!(!config.alias_links);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_partial_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("daymark.toml"),
            "tasks_header = \"# Todo\"\npreserve_moved_tasks = false\n",
        )
        .unwrap();
        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.tasks_header, "# Todo");
        assert!(!config.preserve_moved_tasks);
        // untouched fields keep their defaults
        assert!(config.blank_line_after_header);
    }
}
