use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::agent::availability::override_from_stored;
use crate::domain::agent::{compute_availability, Agent, Availability};
use crate::domain::repositories::{
    AgentRepository, AvailabilityRecompute, RepositoryError, RepositoryResult, TicketRepository,
};
use crate::domain::ticket::{Ticket, TicketStatus, Update};

/// In-memory TicketRepository
///
/// Conditional writes run while holding the entry's shard lock, which gives
/// the same check-then-set atomicity as the SQL `WHERE` guards.
#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: DashMap<Uuid, Ticket>,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Vec<Ticket> {
        self.tickets.iter().map(|entry| entry.value().clone()).collect()
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn insert(&self, ticket: &Ticket) -> RepositoryResult<()> {
        if self.tickets.contains_key(&ticket.id()) {
            return Err(RepositoryError::Duplicate(format!("ticket {}", ticket.id())));
        }
        self.tickets.insert(ticket.id(), ticket.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Ticket>> {
        Ok(self.tickets.get(&id).map(|t| t.value().clone()))
    }

    async fn assign_if_unassigned(
        &self,
        ticket_id: Uuid,
        agent_id: Uuid,
        update: &Update,
    ) -> RepositoryResult<Option<Ticket>> {
        let Some(mut ticket) = self.tickets.get_mut(&ticket_id) else {
            return Ok(None);
        };
        if ticket.is_assigned() {
            return Ok(None);
        }
        ticket
            .assign(agent_id, update.clone())
            .map_err(RepositoryError::Corrupt)?;
        Ok(Some(ticket.clone()))
    }

    async fn reassign(
        &self,
        ticket_id: Uuid,
        expected_previous: Option<Uuid>,
        agent_id: Uuid,
        update: &Update,
    ) -> RepositoryResult<Option<Ticket>> {
        let Some(mut ticket) = self.tickets.get_mut(&ticket_id) else {
            return Ok(None);
        };
        if ticket.assigned_to() != expected_previous {
            return Ok(None);
        }
        ticket
            .reassign(expected_previous, agent_id, update.clone())
            .map_err(RepositoryError::Corrupt)?;
        Ok(Some(ticket.clone()))
    }

    async fn update_status(
        &self,
        ticket_id: Uuid,
        expected: TicketStatus,
        next: TicketStatus,
        update: &Update,
    ) -> RepositoryResult<Option<Ticket>> {
        let Some(mut ticket) = self.tickets.get_mut(&ticket_id) else {
            return Ok(None);
        };
        if ticket.status() != expected {
            return Ok(None);
        }
        ticket
            .apply_status_change(next, update.clone())
            .map_err(RepositoryError::Corrupt)?;
        Ok(Some(ticket.clone()))
    }

    async fn count_active_for_agent(&self, agent_id: Uuid) -> RepositoryResult<u64> {
        Ok(self
            .tickets
            .iter()
            .filter(|t| t.assigned_to() == Some(agent_id) && t.is_active())
            .count() as u64)
    }

    async fn oldest_unassigned_open(&self) -> RepositoryResult<Option<Ticket>> {
        Ok(self
            .tickets
            .iter()
            .filter(|t| t.status() == TicketStatus::Open && !t.is_assigned())
            .min_by(|a, b| a.created_at().cmp(&b.created_at()).then_with(|| a.id().cmp(&b.id())))
            .map(|t| t.value().clone()))
    }

    async fn list_unassigned(&self) -> RepositoryResult<Vec<Ticket>> {
        let mut waiting: Vec<Ticket> = self
            .snapshot()
            .into_iter()
            .filter(|t| !t.is_assigned() && t.is_active())
            .collect();
        waiting.sort_by(|a, b| a.created_at().cmp(&b.created_at()).then_with(|| a.id().cmp(&b.id())));
        Ok(waiting)
    }

    async fn category_history(&self, agent_id: Uuid, limit: usize) -> RepositoryResult<Vec<String>> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for ticket in self.tickets.iter().filter(|t| t.assigned_to() == Some(agent_id)) {
            *counts.entry(ticket.category().to_string()).or_default() += 1;
        }

        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(ranked.into_iter().take(limit).map(|(category, _)| category).collect())
    }
}

/// In-memory AgentRepository
///
/// Availability is derived from the ticket store handed in at construction.
/// Recomputes for one agent run under that agent's async lock, so they
/// cannot interleave.
pub struct InMemoryAgentRepository {
    agents: DashMap<Uuid, Agent>,
    tickets: Arc<dyn TicketRepository>,
    recompute_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl InMemoryAgentRepository {
    pub fn new(tickets: Arc<dyn TicketRepository>) -> Self {
        Self {
            agents: DashMap::new(),
            tickets,
            recompute_locks: DashMap::new(),
        }
    }

    fn recompute_lock(&self, id: Uuid) -> Arc<Mutex<()>> {
        self.recompute_locks.entry(id).or_default().clone()
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn insert(&self, agent: &Agent) -> RepositoryResult<()> {
        let duplicate_email = self.agents.iter().any(|a| a.email() == agent.email());
        if duplicate_email || self.agents.contains_key(&agent.id()) {
            return Err(RepositoryError::Duplicate(format!("agent {}", agent.email())));
        }
        self.agents.insert(agent.id(), agent.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Agent>> {
        Ok(self.agents.get(&id).map(|a| a.value().clone()))
    }

    async fn list(&self) -> RepositoryResult<Vec<Agent>> {
        let mut agents: Vec<Agent> = self.agents.iter().map(|a| a.value().clone()).collect();
        agents.sort_by_key(|a| a.id());
        Ok(agents)
    }

    async fn set_availability(&self, id: Uuid, availability: Availability) -> RepositoryResult<bool> {
        match self.agents.get_mut(&id) {
            Some(mut agent) => {
                agent.set_availability(availability);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn recompute_availability(&self, id: Uuid) -> RepositoryResult<Option<AvailabilityRecompute>> {
        if !self.agents.contains_key(&id) {
            return Ok(None);
        }

        let lock = self.recompute_lock(id);
        let _guard = lock.lock().await;

        let active = self.tickets.count_active_for_agent(id).await?;

        // Shard guard is taken only after the await and held for the write
        let Some(mut agent) = self.agents.get_mut(&id) else {
            return Ok(None);
        };
        let previous = agent.availability();
        let current = compute_availability(active, override_from_stored(previous));
        agent.set_availability(current);

        Ok(Some(AvailabilityRecompute {
            previous,
            current,
            active_tickets: active,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::Email;
    use crate::domain::ticket::{Actor, NewTicket, Priority, UpdateType};
    use chrono::{Duration, Utc};

    fn ticket(category: &str) -> Ticket {
        Ticket::new(NewTicket {
            title: "t".to_string(),
            description: String::new(),
            category: category.to_string(),
            priority: Priority::Low,
            organization: None,
            created_by: None,
        })
        .unwrap()
        .0
    }

    fn aged(minutes_ago: i64) -> Ticket {
        let created = Utc::now() - Duration::minutes(minutes_ago);
        Ticket::from_persistence(
            Uuid::new_v4(),
            format!("{} minutes old", minutes_ago),
            String::new(),
            "general".to_string(),
            Priority::Low,
            None,
            None,
            TicketStatus::Open,
            None,
            created,
            created,
            None,
            Vec::new(),
        )
    }

    fn note() -> Update {
        Update::new(UpdateType::Assignment, Actor::System, "assigned")
    }

    #[tokio::test]
    async fn conditional_assign_only_wins_once() {
        let repo = InMemoryTicketRepository::new();
        let t = ticket("billing");
        repo.insert(&t).await.unwrap();

        let first = repo.assign_if_unassigned(t.id(), Uuid::new_v4(), &note()).await.unwrap();
        let second = repo.assign_if_unassigned(t.id(), Uuid::new_v4(), &note()).await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(repo.find_by_id(t.id()).await.unwrap().unwrap().updates().len(), 1);
    }

    #[tokio::test]
    async fn oldest_unassigned_is_fifo() {
        let repo = InMemoryTicketRepository::new();
        let newest = aged(1);
        let oldest = aged(30);
        let middle = aged(10);
        for t in [&newest, &oldest, &middle] {
            repo.insert(t).await.unwrap();
        }

        let found = repo.oldest_unassigned_open().await.unwrap().unwrap();
        assert_eq!(found.id(), oldest.id());

        let waiting = repo.list_unassigned().await.unwrap();
        let order: Vec<Uuid> = waiting.iter().map(|t| t.id()).collect();
        assert_eq!(order, vec![oldest.id(), middle.id(), newest.id()]);
    }

    #[tokio::test]
    async fn oldest_unassigned_skips_assigned_tickets() {
        let repo = InMemoryTicketRepository::new();
        let taken = aged(60);
        let waiting = aged(5);
        repo.insert(&taken).await.unwrap();
        repo.insert(&waiting).await.unwrap();
        repo.assign_if_unassigned(taken.id(), Uuid::new_v4(), &note()).await.unwrap();

        let found = repo.oldest_unassigned_open().await.unwrap().unwrap();

        assert_eq!(found.id(), waiting.id());
        assert!(found.updates().is_empty());
    }

    #[tokio::test]
    async fn active_count_ignores_resolved() {
        let repo = InMemoryTicketRepository::new();
        let agent = Uuid::new_v4();
        let a = ticket("billing");
        let b = ticket("billing");
        repo.insert(&a).await.unwrap();
        repo.insert(&b).await.unwrap();
        repo.assign_if_unassigned(a.id(), agent, &note()).await.unwrap();
        repo.assign_if_unassigned(b.id(), agent, &note()).await.unwrap();
        assert_eq!(repo.count_active_for_agent(agent).await.unwrap(), 2);

        let resolve = Update::status_change(Actor::System, TicketStatus::InProgress, TicketStatus::Resolved, None);
        repo.update_status(a.id(), TicketStatus::InProgress, TicketStatus::Resolved, &resolve)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(repo.count_active_for_agent(agent).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stale_status_update_is_rejected() {
        let repo = InMemoryTicketRepository::new();
        let t = ticket("billing");
        repo.insert(&t).await.unwrap();
        let update = Update::status_change(Actor::System, TicketStatus::InProgress, TicketStatus::Closed, None);

        let result = repo
            .update_status(t.id(), TicketStatus::InProgress, TicketStatus::Closed, &update)
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn category_history_ranks_by_frequency() {
        let repo = InMemoryTicketRepository::new();
        let agent = Uuid::new_v4();
        for category in ["network", "billing", "billing", "account", "billing", "network"] {
            let t = ticket(category);
            repo.insert(&t).await.unwrap();
            repo.assign_if_unassigned(t.id(), agent, &note()).await.unwrap();
        }

        let history = repo.category_history(agent, 2).await.unwrap();
        assert_eq!(history, vec!["billing".to_string(), "network".to_string()]);
    }

    #[tokio::test]
    async fn recompute_follows_workload_but_never_offline() {
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let repo = InMemoryAgentRepository::new(tickets.clone());
        let agent = Agent::new("Ola", Email::new("ola@example.com").unwrap()).unwrap();
        repo.insert(&agent).await.unwrap();

        let t = ticket("billing");
        tickets.insert(&t).await.unwrap();
        tickets.assign_if_unassigned(t.id(), agent.id(), &note()).await.unwrap();

        let first = repo.recompute_availability(agent.id()).await.unwrap().unwrap();
        assert_eq!(first.current, Availability::Busy);
        assert_eq!(first.active_tickets, 1);
        assert!(first.changed());

        let again = repo.recompute_availability(agent.id()).await.unwrap().unwrap();
        assert!(!again.changed());

        repo.set_availability(agent.id(), Availability::Offline).await.unwrap();
        let resolve = Update::status_change(Actor::System, TicketStatus::InProgress, TicketStatus::Resolved, None);
        tickets
            .update_status(t.id(), TicketStatus::InProgress, TicketStatus::Resolved, &resolve)
            .await
            .unwrap()
            .unwrap();

        let offline = repo.recompute_availability(agent.id()).await.unwrap().unwrap();
        assert_eq!(offline.current, Availability::Offline);
        let stored = repo.find_by_id(agent.id()).await.unwrap().unwrap();
        assert_eq!(stored.availability(), Availability::Offline);
    }

    #[tokio::test]
    async fn recompute_unknown_agent_is_none() {
        let repo = InMemoryAgentRepository::new(Arc::new(InMemoryTicketRepository::new()));
        assert!(repo.recompute_availability(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_agent_email_rejected() {
        let repo = InMemoryAgentRepository::new(Arc::new(InMemoryTicketRepository::new()));
        let email = Email::new("dup@example.com").unwrap();
        repo.insert(&Agent::new("A", email.clone()).unwrap()).await.unwrap();

        let result = repo.insert(&Agent::new("B", email).unwrap()).await;

        assert!(matches!(result, Err(RepositoryError::Duplicate(_))));
    }
}
