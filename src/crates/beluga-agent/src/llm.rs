//! Language model collaborator boundary
//!
//! The executor only needs one thing from a model: given a system prompt
//! and a sanitized history, produce the next assistant message (text,
//! tool calls, or both). [`ChatModel`] is that seam; providers implement
//! it out-of-crate, and tests drive the engine with [`ScriptedModel`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::message::Message;

/// Side channel for incremental text tokens during a reasoning call.
///
/// Streaming is observational only: state transitions and checkpoints key
/// off the completed message, never off tokens.
pub type TokenSender = mpsc::UnboundedSender<String>;

/// Create a token side channel as a sender plus a consumable stream.
pub fn token_channel() -> (TokenSender, UnboundedReceiverStream<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, UnboundedReceiverStream::new(rx))
}

/// Errors from the model collaborator.
///
/// All of these are fatal to the current turn: no checkpoint is written
/// for the failed step, and the thread stays resumable from its last good
/// snapshot.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Network or timeout failure reaching the provider
    #[error("Model transport error: {0}")]
    Transport(String),

    /// The provider answered but the payload could not be interpreted
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    /// The provider rejected the request
    #[error("Model provider error: {0}")]
    Provider(String),
}

/// A remote text / tool-call generation service.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the next assistant message for the given history.
    async fn generate(&self, system: &str, history: &[Message]) -> Result<Message, ModelError>;

    /// As [`generate`](Self::generate), emitting text tokens on a side
    /// channel as they arrive. The default forwards the completed text as
    /// a single token; providers with native streaming override this.
    async fn generate_streamed(
        &self,
        system: &str,
        history: &[Message],
        tokens: &TokenSender,
    ) -> Result<Message, ModelError> {
        let message = self.generate(system, history).await?;
        if !message.content.is_empty() {
            // Receiver may have hung up; streaming is best-effort.
            let _ = tokens.send(message.content.clone());
        }
        Ok(message)
    }
}

/// A model that replays a fixed list of responses, in order.
///
/// Used throughout the test suites to drive the engine deterministically.
/// Fails with [`ModelError::InvalidResponse`] once the script runs out,
/// which makes an unexpected extra reasoning call a loud test failure.
pub struct ScriptedModel {
    responses: tokio::sync::Mutex<VecDeque<Message>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: tokio::sync::Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `generate` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn generate(&self, _system: &str, _history: &[Message]) -> Result<Message, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| ModelError::InvalidResponse("scripted responses exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_scripted_model_replays_in_order() {
        let model = ScriptedModel::new(vec![
            Message::assistant("first"),
            Message::assistant("second"),
        ]);
        assert_eq!(model.generate("", &[]).await.unwrap().content, "first");
        assert_eq!(model.generate("", &[]).await.unwrap().content, "second");
        assert_eq!(model.calls(), 2);
        assert!(model.generate("", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_default_streaming_forwards_content() {
        let model = ScriptedModel::new(vec![Message::assistant("hello")]);
        let (tx, mut rx) = token_channel();
        let message = model.generate_streamed("", &[], &tx).await.unwrap();
        drop(tx);
        assert_eq!(message.content, "hello");
        assert_eq!(rx.next().await.as_deref(), Some("hello"));
        assert!(rx.next().await.is_none());
    }
}
