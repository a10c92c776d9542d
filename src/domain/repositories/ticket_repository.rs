use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryResult;
use crate::domain::ticket::{Ticket, TicketStatus, Update};

/// Repository trait for the Ticket aggregate
///
/// Every write to a ticket's assignment fields is a conditional update: it
/// only applies when the row still matches what the caller observed, so two
/// racing writers can never both win.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Insert a freshly created ticket
    async fn insert(&self, ticket: &Ticket) -> RepositoryResult<()>;

    /// Find a ticket (with its update log) by ID
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Ticket>>;

    /// Attach `agent_id` only if the ticket is currently unassigned
    ///
    /// Open tickets move to In Progress; other statuses are kept. `update`
    /// is appended in the same write. Returns the updated ticket when this
    /// call won, `None` when the ticket was already assigned (or is gone).
    async fn assign_if_unassigned(
        &self,
        ticket_id: Uuid,
        agent_id: Uuid,
        update: &Update,
    ) -> RepositoryResult<Option<Ticket>>;

    /// Replace the assignee only if it is still `expected_previous`
    async fn reassign(
        &self,
        ticket_id: Uuid,
        expected_previous: Option<Uuid>,
        agent_id: Uuid,
        update: &Update,
    ) -> RepositoryResult<Option<Ticket>>;

    /// Move the ticket to `next` only if its status is still `expected`
    async fn update_status(
        &self,
        ticket_id: Uuid,
        expected: TicketStatus,
        next: TicketStatus,
        update: &Update,
    ) -> RepositoryResult<Option<Ticket>>;

    /// Number of tickets assigned to the agent that are not Resolved/Closed
    async fn count_active_for_agent(&self, agent_id: Uuid) -> RepositoryResult<u64>;

    /// The oldest Open ticket with no assignee, if any
    async fn oldest_unassigned_open(&self) -> RepositoryResult<Option<Ticket>>;

    /// All unassigned, non-terminal tickets, oldest first
    async fn list_unassigned(&self) -> RepositoryResult<Vec<Ticket>>;

    /// Distinct categories of tickets the agent has handled, most frequent first
    async fn category_history(&self, agent_id: Uuid, limit: usize) -> RepositoryResult<Vec<String>>;
}
