// Repository ports
// Persistence contracts implemented by the infrastructure adapters

pub mod agent_repository;
pub mod ticket_repository;

pub use agent_repository::{AgentRepository, AvailabilityRecompute};
pub use ticket_repository::TicketRepository;

use thiserror::Error;

/// Errors raised by repository implementations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
