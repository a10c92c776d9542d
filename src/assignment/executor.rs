use std::sync::Arc;
use uuid::Uuid;

use super::errors::{AssignmentError, AssignmentResult};
use super::notifier::{Notification, Notifier};
use super::policy::AssignmentPolicy;
use super::registry::AgentRegistry;
use super::types::{AssignOutcome, AssignmentDecision, DecisionSource, Selection, FALLBACK_CONFIDENCE};
use crate::domain::agent::Availability;
use crate::domain::repositories::{AgentRepository, TicketRepository};
use crate::domain::ticket::{Actor, AssignmentMethod, Ticket, Update};

/// How many waiting tickets a freed agent tries before giving up on a
/// round where other callers keep winning the race
const MAX_PICKUP_ATTEMPTS: usize = 3;

/// Applies assignment decisions to tickets
///
/// Phase 1 is a single conditional write (assignee + status + audit entry).
/// Phase 2 (availability refresh, notifications) only runs after phase 1
/// succeeded, and its failures are logged without undoing phase 1.
#[derive(Clone)]
pub struct AssignmentExecutor {
    tickets: Arc<dyn TicketRepository>,
    agents: Arc<dyn AgentRepository>,
    registry: AgentRegistry,
    policy: AssignmentPolicy,
    notifier: Arc<dyn Notifier>,
}

impl AssignmentExecutor {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        agents: Arc<dyn AgentRepository>,
        policy: AssignmentPolicy,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry: AgentRegistry::new(agents.clone(), tickets.clone()),
            tickets,
            agents,
            policy,
            notifier,
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Assigns an unassigned ticket
    ///
    /// Concurrent calls for the same ticket converge on one winner; the
    /// others observe `AlreadyAssigned`.
    pub async fn assign(&self, ticket_id: Uuid, source: DecisionSource) -> AssignmentResult<AssignOutcome> {
        let ticket = self.ticket(ticket_id).await?;

        if let Some(agent_id) = ticket.assigned_to() {
            tracing::debug!(%ticket_id, %agent_id, "Ticket already assigned, nothing to do");
            return Ok(AssignOutcome::AlreadyAssigned { agent_id: Some(agent_id) });
        }

        let (decision, actor) = match source {
            DecisionSource::Auto => {
                let candidates = match self.registry.list_candidate_agents().await {
                    Ok(candidates) => candidates,
                    Err(e) => {
                        tracing::warn!(%ticket_id, error = %e, "Agent registry unavailable, treating as no candidates");
                        Vec::new()
                    }
                };
                match self.policy.select_agent(&ticket, &candidates).await {
                    Selection::Selected(decision) => (decision, Actor::System),
                    Selection::NoneAvailable { reason } => {
                        tracing::info!(%ticket_id, %reason, "No agent available, ticket stays unassigned");
                        return Ok(AssignOutcome::NoAgent { reason });
                    }
                }
            }
            DecisionSource::Manual { agent_id, actor } => {
                let agent = self.registry.get_agent(agent_id).await?;
                (manual_decision(&ticket, agent_id, agent.name()), actor)
            }
            DecisionSource::Worker { agent_id } => {
                let agent = self.registry.get_agent(agent_id).await?;
                let decision = AssignmentDecision {
                    agent_id,
                    agent_name: agent.name().to_string(),
                    method: AssignmentMethod::WorkloadFallback,
                    confidence: FALLBACK_CONFIDENCE,
                    reasoning: format!("{} is free and picked up a waiting ticket", agent.name()),
                    estimated_response_time: ticket.priority().default_response_time().to_string(),
                };
                (decision, Actor::System)
            }
        };

        let update = Update::assignment(actor, &decision.agent_name, decision.to_metadata(None));
        let Some(assigned) = self
            .tickets
            .assign_if_unassigned(ticket_id, decision.agent_id, &update)
            .await?
        else {
            let holder = self.tickets.find_by_id(ticket_id).await?.and_then(|t| t.assigned_to());
            tracing::info!(%ticket_id, agent_id = ?holder, "Lost assignment race");
            return Ok(AssignOutcome::AlreadyAssigned { agent_id: holder });
        };

        tracing::info!(
            %ticket_id,
            agent_id = %decision.agent_id,
            method = %decision.method,
            confidence = decision.confidence,
            "Ticket assigned"
        );

        self.after_assignment(&assigned, &decision).await;

        Ok(AssignOutcome::Assigned {
            ticket: assigned,
            decision,
        })
    }

    /// Manual administrator assignment, replacing any current assignee
    pub async fn reassign(&self, ticket_id: Uuid, agent_id: Uuid, actor: Actor) -> AssignmentResult<AssignOutcome> {
        let ticket = self.ticket(ticket_id).await?;
        let previous = match ticket.assigned_to() {
            None => return self.assign(ticket_id, DecisionSource::Manual { agent_id, actor }).await,
            Some(current) if current == agent_id => {
                return Ok(AssignOutcome::AlreadyAssigned { agent_id: Some(current) });
            }
            Some(current) => current,
        };

        let agent = self.registry.get_agent(agent_id).await?;
        let decision = manual_decision(&ticket, agent_id, agent.name());
        let update = Update::assignment(actor, agent.name(), decision.to_metadata(Some(previous)));

        let Some(reassigned) = self
            .tickets
            .reassign(ticket_id, Some(previous), agent_id, &update)
            .await?
        else {
            let holder = self.tickets.find_by_id(ticket_id).await?.and_then(|t| t.assigned_to());
            tracing::info!(%ticket_id, agent_id = ?holder, "Assignee changed concurrently, reassignment skipped");
            return Ok(AssignOutcome::AlreadyAssigned { agent_id: holder });
        };

        tracing::info!(%ticket_id, %agent_id, previous_agent_id = %previous, "Ticket manually reassigned");

        if let Err(e) = self.refresh_availability(previous).await {
            tracing::warn!(agent_id = %previous, error = %e, "Failed to refresh availability of previous assignee");
        }
        self.after_assignment(&reassigned, &decision).await;

        Ok(AssignOutcome::Assigned {
            ticket: reassigned,
            decision,
        })
    }

    /// Re-runs the availability state machine for one agent
    ///
    /// The count and the write happen atomically in the agent store, and an
    /// administrator's offline setting is never overwritten.
    pub async fn refresh_availability(&self, agent_id: Uuid) -> AssignmentResult<Availability> {
        let recompute = self
            .agents
            .recompute_availability(agent_id)
            .await?
            .ok_or(AssignmentError::AgentNotFound(agent_id))?;

        if recompute.changed() {
            tracing::info!(
                %agent_id,
                from = %recompute.previous,
                to = %recompute.current,
                active_tickets = recompute.active_tickets,
                "Agent availability changed"
            );
        }

        Ok(recompute.current)
    }

    /// Gives the oldest waiting Open ticket to `agent_id`
    ///
    /// Returns the ticket that was assigned, or `None` when nothing is
    /// waiting. The caller decides whether the agent is free enough.
    pub async fn assign_oldest_waiting(&self, agent_id: Uuid) -> AssignmentResult<Option<Ticket>> {
        for _ in 0..MAX_PICKUP_ATTEMPTS {
            let Some(waiting) = self.tickets.oldest_unassigned_open().await? else {
                tracing::debug!(%agent_id, "No unassigned tickets waiting");
                return Ok(None);
            };

            match self.assign(waiting.id(), DecisionSource::Worker { agent_id }).await? {
                AssignOutcome::Assigned { ticket, .. } => return Ok(Some(ticket)),
                AssignOutcome::AlreadyAssigned { .. } => {
                    tracing::debug!(ticket_id = %waiting.id(), "Waiting ticket taken by another caller, trying next");
                }
                AssignOutcome::NoAgent { .. } => return Ok(None),
            }
        }

        Ok(None)
    }

    pub async fn ticket(&self, ticket_id: Uuid) -> AssignmentResult<Ticket> {
        self.tickets
            .find_by_id(ticket_id)
            .await?
            .ok_or(AssignmentError::TicketNotFound(ticket_id))
    }

    async fn after_assignment(&self, ticket: &Ticket, decision: &AssignmentDecision) {
        if let Err(e) = self.refresh_availability(decision.agent_id).await {
            tracing::warn!(agent_id = %decision.agent_id, error = %e, "Failed to refresh availability after assignment");
        }

        let notification = Notification {
            agent_id: decision.agent_id,
            ticket_id: ticket.id(),
            title: "New ticket assigned".to_string(),
            message: format!(
                "{} ({} priority, expected response within {})",
                ticket.title(),
                ticket.priority(),
                decision.estimated_response_time
            ),
            priority: ticket.priority(),
        };
        if let Err(e) = self.notifier.notify(&notification).await {
            tracing::warn!(ticket_id = %ticket.id(), agent_id = %decision.agent_id, error = %e, "Assignment notification failed");
        }
    }
}

fn manual_decision(ticket: &Ticket, agent_id: Uuid, agent_name: &str) -> AssignmentDecision {
    AssignmentDecision {
        agent_id,
        agent_name: agent_name.to_string(),
        method: AssignmentMethod::Manual,
        confidence: 1.0,
        reasoning: "Assigned by administrator".to_string(),
        estimated_response_time: ticket.priority().default_response_time().to_string(),
    }
}
