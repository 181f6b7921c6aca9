//! # beluga-checkpoint - Durable State Snapshots
//!
//! Checkpoint persistence for the beluga graph executor. Every execution
//! step produces a [`Checkpoint`]: a snapshot of the thread's state plus the
//! node that should run next. Checkpoints are append-only and keyed by
//! thread id; the most recent checkpoint for a thread is the sole source of
//! truth when a conversation is resumed after a pause, a crash, or a
//! process restart.
//!
//! # Core Types
//!
//! - [`Checkpoint`] - One snapshot: thread id, step sequence, state, next node
//! - [`CheckpointSaver`] - Storage backend trait (implement for Postgres,
//!   SQLite, Redis, ...)
//! - [`MemorySaver`] - Thread-safe in-memory reference backend
//! - [`SerializerProtocol`] - Pluggable snapshot encoding (JSON, bincode)
//!
//! # Quick Start
//!
//! ```rust
//! use beluga_checkpoint::{Checkpoint, CheckpointSaver, MemorySaver};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> beluga_checkpoint::Result<()> {
//!     let saver = MemorySaver::new();
//!
//!     let cp = Checkpoint::new("thread-1", 0, json!({"messages": []}))
//!         .with_next_node("reason");
//!     saver.append(cp).await?;
//!
//!     let latest = saver.latest("thread-1").await?.unwrap();
//!     assert_eq!(latest.next_node.as_deref(), Some("reason"));
//!     Ok(())
//! }
//! ```
//!
//! # Guarantees
//!
//! - **Append-only**: checkpoints are never mutated in place; the history of
//!   a thread is a total order by `step`, which doubles as an audit trail.
//! - **Per-thread atomicity**: `append` and `latest` are atomic with respect
//!   to one thread id. Different threads never contend.
//! - **Thread safety**: savers are `Send + Sync` and safe to share behind an
//!   `Arc` across concurrently executing threads.

pub mod checkpoint;
pub mod error;
pub mod memory;
pub mod serializer;
pub mod traits;

pub use checkpoint::Checkpoint;
pub use error::{CheckpointError, Result};
pub use memory::MemorySaver;
pub use serializer::{BincodeSerializer, JsonSerializer, SerializerProtocol};
pub use traits::CheckpointSaver;
