//! JSON file persistence. Every save rewrites the whole file.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Errors reading or writing a persisted collection.
#[derive(Debug)]
pub enum PersistenceError {
    /// Failed to read the file.
    Read { path: PathBuf, source: std::io::Error },
    /// File content is not valid JSON for the collection.
    Parse { path: PathBuf, source: serde_json::Error },
    /// Failed to serialize the collection.
    Serialize { path: PathBuf, source: serde_json::Error },
    /// Failed to write the file (or create its directory).
    Write { path: PathBuf, source: std::io::Error },
}

impl PersistenceError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. }
            | Self::Parse { path, .. }
            | Self::Serialize { path, .. }
            | Self::Write { path, .. } => path,
        }
    }

    /// True when the file exists but its content can't be used.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read '{}': {}", path.display(), source)
            }
            Self::Parse { path, source } => {
                write!(f, "corrupted data in '{}': {}", path.display(), source)
            }
            Self::Serialize { path, source } => {
                write!(f, "failed to serialize data for '{}': {}", path.display(), source)
            }
            Self::Write { path, source } => {
                write!(f, "failed to write '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } | Self::Write { source, .. } => Some(source),
            Self::Parse { source, .. } | Self::Serialize { source, .. } => Some(source),
        }
    }
}

/// A JSON array of `T` stored in one file.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the collection. A missing or blank file is an empty collection.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Vec<T>, PersistenceError> {
        if !self.path.exists() {
            debug!("No file at {:?}, starting empty", self.path);
            return Ok(Vec::new());
        }

        let json = std::fs::read_to_string(&self.path)
            .map_err(|e| PersistenceError::Read { path: self.path.clone(), source: e })?;
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&json)
            .map_err(|e| PersistenceError::Parse { path: self.path.clone(), source: e })
    }

    /// Overwrite the file with `items`.
    pub fn save<T: Serialize>(&self, items: &[T]) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(items)
            .map_err(|e| PersistenceError::Serialize { path: self.path.clone(), source: e })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| PersistenceError::Write { path: self.path.clone(), source: e })?;
        }

        std::fs::write(&self.path, json)
            .map_err(|e| PersistenceError::Write { path: self.path.clone(), source: e })?;

        debug!("💾 Saved {} record(s) to {:?}", items.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let file = JsonFile::new(dir.path().join("nothing.json"));
        let items: Vec<String> = file.load().unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_blank_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blank.json");
        std::fs::write(&path, "  \n").unwrap();
        let items: Vec<String> = JsonFile::new(&path).load().unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_save_creates_directory_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let file = JsonFile::new(dir.path().join("nested/data/items.json"));
        file.save(&["a".to_string(), "b".to_string()]).unwrap();
        file.save(&["c".to_string()]).unwrap();
        let items: Vec<String> = file.load().unwrap();
        assert_eq!(items, vec!["c".to_string()]);
    }

    #[test]
    fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = JsonFile::new(&path).load::<String>().unwrap_err();
        assert!(err.is_corrupt());
        assert_eq!(err.path(), path.as_path());
        assert!(err.to_string().contains("corrupted"));
    }

    #[test]
    fn test_write_into_file_path_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let file = JsonFile::new(blocker.join("items.json"));
        let err = file.save(&["a".to_string()]).unwrap_err();
        assert!(matches!(err, PersistenceError::Write { .. }));
    }
}
