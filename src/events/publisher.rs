use std::sync::Arc;

use super::messages::QueueMessage;
use super::queue::{MessageQueue, QueueError};
use crate::domain::ticket::TicketEvent;

/// Publishes ticket domain events onto the reassignment queue
///
/// `ticket.created` is optional and follows `publish_created`;
/// `ticket.resolved` always goes out, since the worker's pickup of waiting
/// tickets depends on it.
#[derive(Clone)]
pub struct EventPublisher {
    queue: Arc<dyn MessageQueue>,
    publish_created: bool,
}

impl EventPublisher {
    pub fn new(queue: Arc<dyn MessageQueue>, publish_created: bool) -> Self {
        Self { queue, publish_created }
    }

    /// Publishes the event if it is one the worker consumes
    ///
    /// Returns whether a message was sent.
    pub async fn publish(&self, event: &TicketEvent) -> Result<bool, QueueError> {
        if matches!(event, TicketEvent::Created { .. }) && !self.publish_created {
            return Ok(false);
        }
        let Some(message) = QueueMessage::from_event(event) else {
            return Ok(false);
        };

        self.queue.publish(&message).await?;
        tracing::debug!(ticket_id = %event.ticket_id(), event_type = %message.event_type, "Published ticket event");
        Ok(true)
    }
}
