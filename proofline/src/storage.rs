use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const SAVED_TEXT_KEY: &str = "savedText";
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access store {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("store {path} is corrupted: {message}")]
    Corrupted { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    #[default]
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    /// Label of the control that switches away from this theme.
    pub fn toggle_label(self) -> &'static str {
        match self {
            Self::Dark => "☀️ Light Mode",
            Self::Light => "🌙 Dark Mode",
        }
    }
}

/// String key-value store persisted as one JSON object.
#[derive(Debug, Clone)]
pub struct KeyValueStore {
    path: PathBuf,
}

impl KeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("proofline")
            .join("store.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(key)
            .and_then(|value| value.as_str())
            .map(str::to_string))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), Value::String(value.to_string()));
        self.write_entries(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }

    pub fn saved_text(&self) -> Result<Option<String>, StorageError> {
        self.get(SAVED_TEXT_KEY)
    }

    pub fn theme(&self) -> Result<Theme, StorageError> {
        Ok(match self.get(THEME_KEY)?.as_deref() {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        })
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), StorageError> {
        self.set(THEME_KEY, theme.as_str())
    }

    fn read_entries(&self) -> Result<Map<String, Value>, StorageError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|err| self.io_error(err))?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str::<Map<String, Value>>(&content).map_err(|err| {
            StorageError::Corrupted {
                path: self.path.clone(),
                message: err.to_string(),
            }
        })
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let serialized = serde_json::to_string_pretty(entries).map_err(|err| {
            StorageError::Corrupted {
                path: self.path.clone(),
                message: err.to_string(),
            }
        })?;
        fs::write(&self.path, serialized).map_err(|err| self.io_error(err))
    }

    fn io_error(&self, err: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, KeyValueStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = KeyValueStore::new(dir.path().join("store.json"));
        (dir, store)
    }

    #[test]
    fn missing_store_reads_as_empty() {
        let (_dir, store) = store();
        assert_eq!(store.saved_text().expect("read"), None);
        assert_eq!(store.theme().expect("read"), Theme::Light);
    }

    #[test]
    fn values_survive_a_new_handle() {
        let (_dir, store) = store();
        store.set(SAVED_TEXT_KEY, "draft <b>text</b>").expect("write");
        store.set_theme(Theme::Dark).expect("write");

        let reopened = KeyValueStore::new(store.path().to_path_buf());
        assert_eq!(
            reopened.saved_text().expect("read").as_deref(),
            Some("draft <b>text</b>")
        );
        assert_eq!(reopened.theme().expect("read"), Theme::Dark);
    }

    #[test]
    fn remove_only_touches_the_given_key() {
        let (_dir, store) = store();
        store.set(SAVED_TEXT_KEY, "draft").expect("write");
        store.set_theme(Theme::Dark).expect("write");

        store.remove(SAVED_TEXT_KEY).expect("remove");

        assert_eq!(store.saved_text().expect("read"), None);
        assert_eq!(store.theme().expect("read"), Theme::Dark);
    }

    #[test]
    fn corrupted_store_is_reported() {
        let (_dir, store) = store();
        fs::write(store.path(), "{not json").expect("write");
        assert!(matches!(store.get(THEME_KEY), Err(StorageError::Corrupted { .. })));
    }

    #[test]
    fn theme_toggles_and_serialises_lowercase() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(
            serde_json::to_string(&Theme::Dark).expect("serialise"),
            "\"dark\""
        );
    }
}
