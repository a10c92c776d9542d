use std::sync::Arc;
use uuid::Uuid;

use super::errors::{AssignmentError, AssignmentResult};
use super::executor::AssignmentExecutor;
use super::types::{AgentProfile, AssignOutcome, DecisionSource};
use crate::domain::agent::{Agent, Availability, Email};
use crate::domain::repositories::{AgentRepository, TicketRepository};
use crate::domain::ticket::{Actor, NewTicket, Ticket, TicketEvent, TicketStatus};
use crate::events::publisher::EventPublisher;

/// Result of opening a ticket
#[derive(Debug, Clone)]
pub struct CreatedTicket {
    pub ticket: Ticket,
    pub outcome: AssignOutcome,
}

/// Result of an administrator availability change
#[derive(Debug, Clone)]
pub struct AvailabilityChange {
    pub agent_id: Uuid,
    pub availability: Availability,
    /// Ticket the agent picked up on coming back online, if any
    pub picked_up: Option<Ticket>,
}

/// Entry points used by the request path: ticket creation, status updates,
/// manual assignment and availability overrides
#[derive(Clone)]
pub struct TicketWorkflow {
    tickets: Arc<dyn TicketRepository>,
    agents: Arc<dyn AgentRepository>,
    executor: AssignmentExecutor,
    publisher: EventPublisher,
}

impl TicketWorkflow {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        agents: Arc<dyn AgentRepository>,
        executor: AssignmentExecutor,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            tickets,
            agents,
            executor,
            publisher,
        }
    }

    pub fn executor(&self) -> &AssignmentExecutor {
        &self.executor
    }

    /// Opens a ticket and tries to assign it immediately
    ///
    /// Failing to find an agent is not an error: the ticket is simply
    /// created Open and unassigned.
    pub async fn create_ticket(&self, input: NewTicket) -> AssignmentResult<CreatedTicket> {
        let (ticket, _) = Ticket::new(input).map_err(AssignmentError::Validation)?;
        self.tickets.insert(&ticket).await?;
        tracing::info!(ticket_id = %ticket.id(), category = %ticket.category(), priority = %ticket.priority(), "Ticket created");

        let outcome = match self.executor.assign(ticket.id(), DecisionSource::Auto).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(ticket_id = %ticket.id(), error = %e, "Immediate assignment failed, deferring to worker");
                AssignOutcome::NoAgent {
                    reason: format!("assignment deferred: {}", e),
                }
            }
        };

        let created = TicketEvent::Created {
            ticket_id: ticket.id(),
            assigned_to: outcome.assigned_agent(),
        };
        if let Err(e) = self.publisher.publish(&created).await {
            tracing::warn!(ticket_id = %ticket.id(), error = %e, "Failed to publish ticket.created");
        }

        let ticket = match &outcome {
            AssignOutcome::Assigned { ticket, .. } => ticket.clone(),
            _ => ticket,
        };
        Ok(CreatedTicket { ticket, outcome })
    }

    /// Moves a ticket to a new status and keeps the assignee's availability in step
    pub async fn update_status(
        &self,
        ticket_id: Uuid,
        next: TicketStatus,
        actor: Actor,
        note: Option<&str>,
    ) -> AssignmentResult<Ticket> {
        let ticket = self.executor.ticket(ticket_id).await?;
        let update = ticket
            .plan_status_change(next, actor, note)
            .map_err(AssignmentError::InvalidTransition)?;

        let updated = self
            .tickets
            .update_status(ticket_id, ticket.status(), next, &update)
            .await?
            .ok_or_else(|| {
                AssignmentError::InvalidTransition(format!("ticket {} changed concurrently, retry the update", ticket_id))
            })?;

        tracing::info!(%ticket_id, from = %ticket.status(), to = %next, "Ticket status updated");

        if let Some(agent_id) = updated.assigned_to() {
            if let Err(e) = self.executor.refresh_availability(agent_id).await {
                tracing::warn!(%agent_id, error = %e, "Failed to refresh availability after status change");
            }

            if next.is_terminal() {
                let resolved = TicketEvent::Resolved {
                    ticket_id,
                    agent_id: Some(agent_id),
                    resolved_at: updated.resolved_at().unwrap_or_else(|| updated.updated_at()),
                };
                if let Err(e) = self.publisher.publish(&resolved).await {
                    tracing::warn!(%ticket_id, error = %e, "Failed to publish ticket.resolved");
                }
            }
        }

        Ok(updated)
    }

    /// Administrator assignment; replaces an existing assignee
    pub async fn assign_manually(&self, ticket_id: Uuid, agent_id: Uuid, actor: Actor) -> AssignmentResult<AssignOutcome> {
        self.executor.reassign(ticket_id, agent_id, actor).await
    }

    /// Administrator availability override
    ///
    /// `Offline` is stored as-is. Any other request re-runs the state
    /// machine against the agent's real load, and an agent that comes out
    /// available immediately takes the oldest waiting ticket.
    pub async fn set_agent_availability(&self, agent_id: Uuid, requested: Availability) -> AssignmentResult<AvailabilityChange> {
        if !self.agents.set_availability(agent_id, requested).await? {
            return Err(AssignmentError::AgentNotFound(agent_id));
        }
        tracing::info!(%agent_id, availability = %requested, "Administrator set agent availability");

        if requested == Availability::Offline {
            return Ok(AvailabilityChange {
                agent_id,
                availability: Availability::Offline,
                picked_up: None,
            });
        }

        let mut availability = self.executor.refresh_availability(agent_id).await?;
        let mut picked_up = None;
        if availability == Availability::Available {
            picked_up = self.executor.assign_oldest_waiting(agent_id).await?;
            if picked_up.is_some() {
                availability = Availability::Busy;
            }
        }

        Ok(AvailabilityChange {
            agent_id,
            availability,
            picked_up,
        })
    }

    /// Adds an agent to the roster
    ///
    /// A new agent starts available, so it immediately takes the oldest
    /// waiting ticket if there is one.
    pub async fn register_agent(&self, name: &str, email: &str) -> AssignmentResult<AvailabilityChange> {
        let email = Email::new(email).map_err(AssignmentError::Validation)?;
        let agent = Agent::new(name, email).map_err(AssignmentError::Validation)?;
        self.agents.insert(&agent).await?;
        tracing::info!(agent_id = %agent.id(), name = %agent.name(), "Agent registered");

        let picked_up = self.executor.assign_oldest_waiting(agent.id()).await?;
        Ok(AvailabilityChange {
            agent_id: agent.id(),
            availability: if picked_up.is_some() {
                Availability::Busy
            } else {
                Availability::Available
            },
            picked_up,
        })
    }

    pub async fn get_ticket(&self, ticket_id: Uuid) -> AssignmentResult<Ticket> {
        self.executor.ticket(ticket_id).await
    }

    /// The administrator's "unassigned tickets" view
    pub async fn unassigned_tickets(&self) -> AssignmentResult<Vec<Ticket>> {
        Ok(self.tickets.list_unassigned().await?)
    }

    pub async fn agents(&self) -> AssignmentResult<Vec<AgentProfile>> {
        Ok(self.executor.registry().list_all().await?)
    }
}
