use super::value_objects::TicketStatus;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Domain events that occur within the Ticket aggregate
///
/// `Created` and `Resolved` are the ones published to the reassignment
/// queue; the others are informational.
#[derive(Debug, Clone, PartialEq)]
pub enum TicketEvent {
    /// Fired when a ticket is opened
    Created {
        ticket_id: Uuid,
        /// Set when the ticket was assigned synchronously at creation time
        assigned_to: Option<Uuid>,
    },
    /// Fired when an agent is attached to a ticket
    Assigned {
        ticket_id: Uuid,
        agent_id: Uuid,
        /// Present for manual reassignments
        previous_agent_id: Option<Uuid>,
    },
    /// Fired on non-terminal status changes
    StatusChanged {
        ticket_id: Uuid,
        from: TicketStatus,
        to: TicketStatus,
    },
    /// Fired when a ticket enters Resolved or Closed
    Resolved {
        ticket_id: Uuid,
        agent_id: Option<Uuid>,
        resolved_at: DateTime<Utc>,
    },
}

impl TicketEvent {
    /// Returns the ticket_id for this event
    pub fn ticket_id(&self) -> Uuid {
        match self {
            TicketEvent::Created { ticket_id, .. } => *ticket_id,
            TicketEvent::Assigned { ticket_id, .. } => *ticket_id,
            TicketEvent::StatusChanged { ticket_id, .. } => *ticket_id,
            TicketEvent::Resolved { ticket_id, .. } => *ticket_id,
        }
    }
}
