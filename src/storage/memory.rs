//! In-memory storage engine for tests and ephemeral stores
//!
//! Clones share the same underlying cell, so a test can hand one clone to a
//! [`Persistor`](crate::Persistor) and inspect writes through another.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::StorageEngine;
use crate::error::StorageError;

#[derive(Debug, Default)]
struct MemoryCell {
    content: Option<String>,
    writes: Vec<String>,
    load_error: Option<String>,
    save_error: Option<String>,
}

/// Storage engine holding the envelope in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    cell: Arc<Mutex<MemoryCell>>,
}

impl MemoryStorage {
    /// Create an empty store (loads return `None`)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `content`
    pub fn with_content(content: impl Into<String>) -> Self {
        let storage = Self::new();
        storage.set_content(content);
        storage
    }

    /// Make every subsequent load fail with `message`
    pub fn failing_load(self, message: impl Into<String>) -> Self {
        self.cell.lock().load_error = Some(message.into());
        self
    }

    /// Make every subsequent save fail with `message`
    pub fn failing_save(self, message: impl Into<String>) -> Self {
        self.cell.lock().save_error = Some(message.into());
        self
    }

    /// Replace the stored content without recording a write
    pub fn set_content(&self, content: impl Into<String>) {
        self.cell.lock().content = Some(content.into());
    }

    /// Current stored content
    pub fn content(&self) -> Option<String> {
        self.cell.lock().content.clone()
    }

    /// Every successful save, oldest first
    pub fn writes(&self) -> Vec<String> {
        self.cell.lock().writes.clone()
    }

    /// Clear content, recorded writes and injected failures
    pub fn reset(&self) {
        *self.cell.lock() = MemoryCell::default();
    }
}

#[async_trait]
impl StorageEngine for MemoryStorage {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        let cell = self.cell.lock();
        if let Some(message) = &cell.load_error {
            return Err(StorageError::Unavailable(message.clone()));
        }
        Ok(cell.content.clone())
    }

    async fn save(&self, content: &str) -> Result<(), StorageError> {
        let mut cell = self.cell.lock();
        if let Some(message) = &cell.save_error {
            return Err(StorageError::Unavailable(message.clone()));
        }
        cell.content = Some(content.to_string());
        cell.writes.push(content.to_string());
        Ok(())
    }
}
