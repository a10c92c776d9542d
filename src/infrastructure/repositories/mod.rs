// Repository implementations (data access layer)
// Adapters that implement domain repository interfaces

pub mod in_memory;
pub mod postgres_agent_repository;
pub mod postgres_ticket_repository;

pub use in_memory::{InMemoryAgentRepository, InMemoryTicketRepository};
pub use postgres_agent_repository::PostgresAgentRepository;
pub use postgres_ticket_repository::PostgresTicketRepository;

use crate::domain::repositories::RepositoryError;

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                RepositoryError::Duplicate(db.message().to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => RepositoryError::Corrupt(err.to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}
