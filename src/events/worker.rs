use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use super::messages::{QueueMessage, RouteError, RoutedEvent};
use super::queue::{Delivery, MessageQueue, QueueError};
use crate::assignment::errors::AssignmentError;
use crate::assignment::executor::AssignmentExecutor;
use crate::assignment::types::{AssignOutcome, DecisionSource};
use crate::domain::agent::Availability;

/// `tokio::time::interval` panics on a zero period
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Reassignment worker settings
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    pub batch_size: usize,
    pub visibility_timeout: Duration,
    /// Deliveries after which a message is dropped instead of retried
    pub max_deliveries: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 10,
            visibility_timeout: Duration::from_secs(30),
            max_deliveries: 10,
        }
    }
}

/// Handler failures that warrant redelivery
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
}

/// What a handler did with a message that may be deleted
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    /// A ticket was assigned as a result of the event
    Assigned { ticket_id: Uuid, agent_id: Uuid },
    /// The event required no change (already assigned, nobody free, nothing waiting)
    NoChange,
    /// The message was dropped without processing
    Skipped(String),
}

/// Counters for one polling round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub received: usize,
    pub deleted: usize,
    pub retained: usize,
}

/// Consumes `ticket.created` / `ticket.resolved` events and hands freed
/// agents their next ticket
///
/// Every handler is idempotent, so a message that is redelivered after a
/// crash or a failed delete converges on the same state.
pub struct ReassignmentWorker {
    queue: Arc<dyn MessageQueue>,
    executor: AssignmentExecutor,
    config: WorkerConfig,
}

impl ReassignmentWorker {
    pub fn new(queue: Arc<dyn MessageQueue>, executor: AssignmentExecutor, config: WorkerConfig) -> Self {
        Self {
            queue,
            executor,
            config,
        }
    }

    /// Polls until `shutdown` flips to true
    ///
    /// A round in progress always finishes before the loop exits.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "Reassignment worker started"
        );
        let mut ticker = tokio::time::interval(self.config.poll_interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        tracing::error!(error = %e, "Queue poll failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Reassignment worker stopped");
    }

    /// Receives one batch and processes it message by message
    pub async fn poll_once(&self) -> Result<PollStats, QueueError> {
        let deliveries = self
            .queue
            .receive(self.config.batch_size, self.config.visibility_timeout)
            .await?;

        let mut stats = PollStats {
            received: deliveries.len(),
            ..Default::default()
        };
        for delivery in deliveries {
            if self.process(&delivery).await {
                stats.deleted += 1;
            } else {
                stats.retained += 1;
            }
        }

        Ok(stats)
    }

    /// Handles one delivery; returns whether it was deleted
    async fn process(&self, delivery: &Delivery) -> bool {
        if delivery.delivery_count > self.config.max_deliveries {
            tracing::error!(
                receipt = %delivery.receipt,
                delivery_count = delivery.delivery_count,
                body = %delivery.body,
                "Message exceeded delivery limit, dropping"
            );
            return self.ack(delivery).await;
        }

        match self.handle(&delivery.body).await {
            Ok(outcome) => {
                tracing::debug!(receipt = %delivery.receipt, ?outcome, "Message handled");
                self.ack(delivery).await
            }
            Err(e) => {
                tracing::error!(
                    receipt = %delivery.receipt,
                    delivery_count = delivery.delivery_count,
                    error = %e,
                    "Handler failed, message left for redelivery"
                );
                false
            }
        }
    }

    async fn ack(&self, delivery: &Delivery) -> bool {
        match self.queue.delete(&delivery.receipt).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(receipt = %delivery.receipt, error = %e, "Failed to delete handled message");
                false
            }
        }
    }

    /// Routes a raw message body to its handler
    ///
    /// Unroutable messages and references to missing tickets/agents are
    /// reported as `Skipped` so they are deleted rather than retried.
    pub async fn handle(&self, body: &str) -> Result<Handled, WorkerError> {
        let event = match QueueMessage::route(body) {
            Ok(event) => event,
            Err(RouteError::UnknownEventType(event_type)) => {
                tracing::warn!(%event_type, "Unknown event type, dropping message");
                return Ok(Handled::Skipped(format!("unknown event type {}", event_type)));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unroutable message, dropping");
                return Ok(Handled::Skipped(e.to_string()));
            }
        };

        let result = match event {
            RoutedEvent::TicketCreated { ticket_id, assigned_to } => {
                self.on_ticket_created(ticket_id, assigned_to).await
            }
            RoutedEvent::TicketResolved { ticket_id, agent_id } => self.on_ticket_resolved(ticket_id, agent_id).await,
        };

        match result {
            Err(WorkerError::Assignment(e)) if e.is_not_found() => {
                tracing::warn!(?event, error = %e, "Event references a missing record, dropping");
                Ok(Handled::Skipped(e.to_string()))
            }
            other => other,
        }
    }

    /// A new ticket nobody picked up synchronously goes to a fully idle agent
    async fn on_ticket_created(&self, ticket_id: Uuid, assigned_to: Option<Uuid>) -> Result<Handled, WorkerError> {
        if assigned_to.is_some() {
            return Ok(Handled::NoChange);
        }

        let Some(agent) = self
            .executor
            .registry()
            .find_free_agent()
            .await
            .map_err(AssignmentError::from)?
        else {
            tracing::info!(%ticket_id, "No idle agent for new ticket, waiting for a resolution");
            return Ok(Handled::NoChange);
        };

        match self
            .executor
            .assign(ticket_id, DecisionSource::Worker { agent_id: agent.id })
            .await?
        {
            AssignOutcome::Assigned { ticket, decision } => Ok(Handled::Assigned {
                ticket_id: ticket.id(),
                agent_id: decision.agent_id,
            }),
            AssignOutcome::AlreadyAssigned { .. } | AssignOutcome::NoAgent { .. } => Ok(Handled::NoChange),
        }
    }

    /// A resolution may free the agent; a free agent takes the oldest waiting ticket
    async fn on_ticket_resolved(&self, ticket_id: Option<Uuid>, agent_id: Option<Uuid>) -> Result<Handled, WorkerError> {
        let agent_id = match (agent_id, ticket_id) {
            (Some(agent_id), _) => agent_id,
            (None, Some(ticket_id)) => {
                let ticket = self.executor.ticket(ticket_id).await?;
                match ticket.assigned_to() {
                    Some(agent_id) => agent_id,
                    None => return Ok(Handled::Skipped(format!("ticket {} has no assignee", ticket_id))),
                }
            }
            (None, None) => return Ok(Handled::Skipped("no agent to recompute".to_string())),
        };

        let availability = self.executor.refresh_availability(agent_id).await?;
        if availability != Availability::Available {
            tracing::debug!(%agent_id, %availability, "Agent still not free after resolution");
            return Ok(Handled::NoChange);
        }

        match self.executor.assign_oldest_waiting(agent_id).await? {
            Some(ticket) => {
                tracing::info!(ticket_id = %ticket.id(), %agent_id, "Freed agent picked up waiting ticket");
                Ok(Handled::Assigned {
                    ticket_id: ticket.id(),
                    agent_id,
                })
            }
            None => Ok(Handled::NoChange),
        }
    }
}
