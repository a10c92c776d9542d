use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryResult;
use crate::domain::agent::{Agent, Availability};

/// Repository trait for the Agent aggregate
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Insert a new agent
    async fn insert(&self, agent: &Agent) -> RepositoryResult<()>;

    /// Find an agent by ID
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Agent>>;

    /// All agents, ordered by ID
    async fn list(&self) -> RepositoryResult<Vec<Agent>>;

    /// Administrator write; may set any state including offline.
    /// Returns false when the agent does not exist.
    async fn set_availability(&self, id: Uuid, availability: Availability) -> RepositoryResult<bool>;

    /// Re-derives an agent's availability from its active ticket count
    ///
    /// The count and the write happen inside one consistency boundary, and
    /// recomputes for the same agent are serialized, so the last one to
    /// finish always reflects the latest committed workload. An offline
    /// agent is left untouched. Returns `None` when the agent does not exist.
    async fn recompute_availability(&self, id: Uuid) -> RepositoryResult<Option<AvailabilityRecompute>>;
}

/// Outcome of an availability recompute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityRecompute {
    pub previous: Availability,
    pub current: Availability,
    pub active_tickets: u64,
}

impl AvailabilityRecompute {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}
