use std::sync::Arc;
use uuid::Uuid;

use super::errors::{AssignmentError, AssignmentResult};
use super::types::AgentProfile;
use crate::domain::agent::{Agent, Availability};
use crate::domain::repositories::{AgentRepository, RepositoryResult, TicketRepository};

/// Number of past categories reported as an agent's expertise
const EXPERTISE_DEPTH: usize = 5;

/// Read-only view over agents and their current workload
///
/// Ticket counts are recomputed on every call so that a profile always
/// reflects the ticket store at the time it was built.
#[derive(Clone)]
pub struct AgentRegistry {
    agents: Arc<dyn AgentRepository>,
    tickets: Arc<dyn TicketRepository>,
}

impl AgentRegistry {
    pub fn new(agents: Arc<dyn AgentRepository>, tickets: Arc<dyn TicketRepository>) -> Self {
        Self { agents, tickets }
    }

    /// Agents that are not offline, each with a freshly computed load
    pub async fn list_candidate_agents(&self) -> RepositoryResult<Vec<AgentProfile>> {
        let agents = self.agents.list().await?;
        let mut profiles = Vec::with_capacity(agents.len());

        for agent in agents.iter().filter(|a| !a.is_offline()) {
            profiles.push(self.profile(agent).await?);
        }

        Ok(profiles)
    }

    /// Every agent with its load, offline ones included
    pub async fn list_all(&self) -> RepositoryResult<Vec<AgentProfile>> {
        let agents = self.agents.list().await?;
        let mut profiles = Vec::with_capacity(agents.len());
        for agent in &agents {
            profiles.push(self.profile(agent).await?);
        }
        Ok(profiles)
    }

    pub async fn get_agent(&self, id: Uuid) -> AssignmentResult<Agent> {
        self.agents
            .find_by_id(id)
            .await?
            .ok_or(AssignmentError::AgentNotFound(id))
    }

    pub async fn active_ticket_count(&self, agent_id: Uuid) -> RepositoryResult<u64> {
        self.tickets.count_active_for_agent(agent_id).await
    }

    /// A fully idle agent: marked available and carrying zero active tickets
    ///
    /// Stricter than the policy's least-loaded fallback. Ties go to the
    /// lowest agent id.
    pub async fn find_free_agent(&self) -> RepositoryResult<Option<AgentProfile>> {
        let agents = self.agents.list().await?;
        let mut free: Option<AgentProfile> = None;

        for agent in agents.iter().filter(|a| a.availability() == Availability::Available) {
            if self.tickets.count_active_for_agent(agent.id()).await? > 0 {
                continue;
            }
            let profile = self.profile(agent).await?;
            if free.as_ref().map_or(true, |f| profile.id < f.id) {
                free = Some(profile);
            }
        }

        Ok(free)
    }

    async fn profile(&self, agent: &Agent) -> RepositoryResult<AgentProfile> {
        let active_tickets = self.tickets.count_active_for_agent(agent.id()).await?;
        let expertise = match self.tickets.category_history(agent.id(), EXPERTISE_DEPTH).await {
            Ok(categories) => categories,
            Err(e) => {
                tracing::warn!(agent_id = %agent.id(), error = %e, "Could not load category history");
                Vec::new()
            }
        };

        Ok(AgentProfile {
            id: agent.id(),
            name: agent.name().to_string(),
            availability: agent.availability(),
            active_tickets,
            expertise,
        })
    }
}
