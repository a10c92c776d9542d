use thiserror::Error;
use uuid::Uuid;

use crate::domain::repositories::RepositoryError;
use crate::events::queue::QueueError;

/// Errors that can occur in the assignment engine
///
/// Expected outcomes (already assigned, nobody free) are not errors; they are
/// reported through `AssignOutcome`.
#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("Ticket not found: {0}")]
    TicketNotFound(Uuid),

    #[error("Agent not found: {0}")]
    AgentNotFound(Uuid),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] RepositoryError),

    #[error("Event publishing failed: {0}")]
    Queue(#[from] QueueError),
}

impl AssignmentError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AssignmentError::TicketNotFound(_) | AssignmentError::AgentNotFound(_))
    }
}

pub type AssignmentResult<T> = Result<T, AssignmentError>;
