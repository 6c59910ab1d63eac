//! Storage backends
//!
//! The core only needs whole-string reads and writes. Engines do not
//! serialize concurrent writes; callers that issue overlapping saves must
//! order them themselves or use an engine with its own write queue.

mod file;
mod memory;

use async_trait::async_trait;

use crate::error::StorageError;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Durable byte-string storage for one persisted envelope.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Read the stored content, or `None` if nothing has been written yet
    async fn load(&self) -> Result<Option<String>, StorageError>;

    /// Replace the stored content
    async fn save(&self, content: &str) -> Result<(), StorageError>;
}
