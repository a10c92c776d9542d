use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::assignment::notifier::{Notification, Notifier, NotifyError};

/// Writes notifications to the application log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            agent_id = %notification.agent_id,
            ticket_id = %notification.ticket_id,
            priority = %notification.priority,
            title = %notification.title,
            "{}",
            notification.message
        );
        Ok(())
    }
}

/// Real-time channel for connected agent sessions
///
/// Having nobody subscribed is not a failure: the notification is simply
/// not observed by anyone.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.sender.receiver_count() == 0 {
            return Ok(());
        }
        self.sender
            .send(notification.clone())
            .map(|_| ())
            .map_err(|e| NotifyError {
                channel: "broadcast".to_string(),
                message: e.to_string(),
            })
    }
}
