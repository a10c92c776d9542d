// Event pipeline
//
// Queue contract, publisher and the reassignment worker that consumes
// ticket.created / ticket.resolved events with at-least-once delivery.

pub mod messages;
pub mod publisher;
pub mod queue;
pub mod worker;

pub use messages::{QueueMessage, RoutedEvent, TICKET_CREATED, TICKET_RESOLVED};
pub use publisher::EventPublisher;
pub use queue::{Delivery, MessageQueue, QueueError};
pub use worker::{Handled, PollStats, ReassignmentWorker, WorkerConfig};
