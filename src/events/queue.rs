use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::messages::QueueMessage;

/// Errors raised by queue adapters
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue backend error: {0}")]
    Backend(String),

    #[error("Message could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Unknown receipt: {0}")]
    UnknownReceipt(String),
}

/// One delivery of a message
///
/// The same message may be delivered again (with a higher
/// `delivery_count`) until it is deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Opaque handle used to delete the message
    pub receipt: String,
    /// Raw body as published
    pub body: String,
    /// How many times this message has been handed out, this one included
    pub delivery_count: u32,
}

/// At-least-once message queue
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn publish(&self, message: &QueueMessage) -> Result<(), QueueError>;

    /// Receive up to `max` visible messages, hiding each for `visibility`
    async fn receive(&self, max: usize, visibility: Duration) -> Result<Vec<Delivery>, QueueError>;

    /// Acknowledge a delivery; the message will not be redelivered
    async fn delete(&self, receipt: &str) -> Result<(), QueueError>;
}
