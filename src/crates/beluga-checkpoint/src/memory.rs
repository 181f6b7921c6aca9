//! In-memory checkpoint storage
//!
//! [`MemorySaver`] keeps every thread's checkpoint history in a
//! `HashMap` behind an async `RwLock`. It is the reference backend: tests
//! and single-process deployments use it directly, and its behavior defines
//! what durable backends must reproduce.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::checkpoint::Checkpoint;
use crate::error::{CheckpointError, Result};
use crate::traits::CheckpointSaver;

/// Thread-safe in-memory checkpoint store.
///
/// Cloning a `MemorySaver` is cheap and shares the underlying storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySaver {
    threads: Arc<RwLock<HashMap<String, Vec<Checkpoint>>>>,
}

impl MemorySaver {
    /// Create an empty saver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads with at least one checkpoint.
    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.len()
    }

    /// Total number of stored checkpoints across all threads.
    pub async fn checkpoint_count(&self) -> usize {
        self.threads.read().await.values().map(Vec::len).sum()
    }

    /// Drop all stored checkpoints.
    pub async fn clear(&self) {
        self.threads.write().await.clear();
    }
}

#[async_trait]
impl CheckpointSaver for MemorySaver {
    async fn append(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut threads = self.threads.write().await;
        let history = threads.entry(checkpoint.thread_id.clone()).or_default();
        if let Some(last) = history.last() {
            if checkpoint.step <= last.step {
                return Err(CheckpointError::Invalid(format!(
                    "step {} does not advance thread '{}' past step {}",
                    checkpoint.step, checkpoint.thread_id, last.step
                )));
            }
        }
        history.push(checkpoint);
        Ok(())
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).and_then(|h| h.last().cloned()))
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<Checkpoint>> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).cloned().unwrap_or_default())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.threads.write().await.remove(thread_id);
        Ok(())
    }
}
