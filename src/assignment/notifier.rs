use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::ticket::Priority;

/// Failure delivering a notification; always logged, never propagated
#[derive(Debug, Error)]
#[error("Notification via {channel} failed: {message}")]
pub struct NotifyError {
    pub channel: String,
    pub message: String,
}

/// In-app / real-time notification for an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub agent_id: Uuid,
    pub ticket_id: Uuid,
    pub title: String,
    pub message: String,
    pub priority: Priority,
}

/// Fire-and-forget side-effect channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Fans a notification out to several channels
///
/// Every channel is attempted; the first failure is reported after all
/// channels ran.
pub struct CompositeNotifier {
    channels: Vec<Arc<dyn Notifier>>,
}

impl CompositeNotifier {
    pub fn new(channels: Vec<Arc<dyn Notifier>>) -> Self {
        Self { channels }
    }
}

#[async_trait]
impl Notifier for CompositeNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut first_error = None;
        for channel in &self.channels {
            if let Err(e) = channel.notify(notification).await {
                tracing::warn!(agent_id = %notification.agent_id, error = %e, "Notification channel failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
