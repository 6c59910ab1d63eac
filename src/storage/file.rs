//! Single-file storage engine

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use super::StorageEngine;
use crate::error::StorageError;

/// Stores the envelope as the full contents of one file.
///
/// Writes go to a temporary file in the same directory which is then
/// renamed over the target, so a crash mid-write leaves the previous
/// contents intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_contents(path: &Path) -> Result<Option<String>, StorageError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::Io(e)),
    }
}

fn write_atomically(path: &Path, content: &str) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl StorageEngine for FileStorage {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        let path = self.path.clone();
        let contents = tokio::task::spawn_blocking(move || read_contents(&path))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        tracing::debug!(
            path = %self.path.display(),
            bytes = contents.as_ref().map_or(0, String::len),
            "Read persisted state"
        );
        Ok(contents)
    }

    async fn save(&self, content: &str) -> Result<(), StorageError> {
        let path = self.path.clone();
        let content = content.to_string();
        let bytes = content.len();
        tokio::task::spawn_blocking(move || write_atomically(&path, &content))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        tracing::debug!(path = %self.path.display(), bytes, "Wrote persisted state");
        Ok(())
    }
}
