//! Storage backend trait for checkpoint persistence
//!
//! [`CheckpointSaver`] is the seam between the graph executor and durable
//! storage. The executor only ever appends snapshots and reads the latest
//! one back; backends are free to store them however they like as long as
//! the per-thread ordering contract holds.

use async_trait::async_trait;

use crate::checkpoint::Checkpoint;
use crate::error::Result;

/// Persistence backend for checkpoints.
///
/// Implementations must be `Send + Sync` so a single saver can be shared
/// behind an `Arc` across concurrently executing threads.
///
/// # Contract
///
/// - `append` must be atomic per thread id: two concurrent appends for the
///   same thread must not interleave partially.
/// - `latest` returns the checkpoint with the highest `step` for a thread.
/// - `list` returns a thread's checkpoints ordered by ascending `step`.
#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    /// Persist a checkpoint at the end of the thread's history.
    async fn append(&self, checkpoint: Checkpoint) -> Result<()>;

    /// Fetch the most recent checkpoint for a thread, if any.
    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// Fetch a thread's full checkpoint history, oldest first.
    async fn list(&self, thread_id: &str) -> Result<Vec<Checkpoint>>;

    /// Remove all checkpoints for a thread.
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;
}
