//! Queue message type and consumer contract.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the queue side. The relay treats every one of them as fatal.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("failed to connect to queue: {0}")]
    Connect(#[source] lapin::Error),

    #[error("failed to set up consumer: {0}")]
    Setup(#[source] lapin::Error),

    #[error("error receiving messages: {0}")]
    Receive(#[source] lapin::Error),

    #[error("error completing message {delivery_tag}: {source}")]
    Acknowledge {
        delivery_tag: u64,
        #[source]
        source: lapin::Error,
    },

    #[error("queue consumer closed")]
    Closed,
}

/// A message received from the queue.
///
/// `body` is opaque; `delivery_tag` is the handle used to acknowledge it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub body: Vec<u8>,
    pub delivery_tag: u64,
    pub message_id: Option<String>,
}

/// Pull-based queue client consumed by the relay loop.
///
/// No ordering is assumed within or across batches.
#[async_trait]
pub trait QueueConsumer: Send {
    /// Wait for messages and return at most `max_count` of them.
    ///
    /// An empty batch means the long-poll window elapsed without traffic.
    async fn receive_batch(&mut self, max_count: usize) -> Result<Vec<QueueMessage>, QueueError>;

    /// Remove `message` from the queue permanently.
    ///
    /// Acknowledging the same message twice is not supported.
    async fn acknowledge(&mut self, message: &QueueMessage) -> Result<(), QueueError>;
}
