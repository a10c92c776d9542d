use std::sync::Arc;
use std::time::Duration;

use super::scorer::{AgentScorer, ScoreOutcome};
use super::types::{AgentProfile, AssignmentDecision, Selection, FALLBACK_CONFIDENCE};
use crate::domain::agent::Availability;
use crate::domain::ticket::{AssignmentMethod, Ticket};

/// Default upper bound on a scorer call
pub const DEFAULT_SCORING_TIMEOUT: Duration = Duration::from_secs(5);

/// Chooses one agent for a ticket
///
/// Tries the scoring collaborator first (when one is configured) and falls
/// back to a deterministic least-loaded pick on any scorer failure. The
/// policy never looks at whether the ticket is already assigned; that guard
/// lives in the executor.
#[derive(Clone)]
pub struct AssignmentPolicy {
    scorer: Option<Arc<dyn AgentScorer>>,
    scoring_timeout: Duration,
}

impl AssignmentPolicy {
    pub fn new(scorer: Option<Arc<dyn AgentScorer>>, scoring_timeout: Duration) -> Self {
        Self {
            scorer,
            scoring_timeout,
        }
    }

    /// Policy with no scoring collaborator
    pub fn workload_only() -> Self {
        Self::new(None, DEFAULT_SCORING_TIMEOUT)
    }

    pub async fn select_agent(&self, ticket: &Ticket, candidates: &[AgentProfile]) -> Selection {
        if candidates.is_empty() {
            return Selection::NoneAvailable {
                reason: "no agents found".to_string(),
            };
        }

        let online: Vec<AgentProfile> = candidates
            .iter()
            .filter(|c| c.availability != Availability::Offline)
            .cloned()
            .collect();
        if online.is_empty() {
            return Selection::NoneAvailable {
                reason: "all agents offline".to_string(),
            };
        }

        if let Some(scorer) = &self.scorer {
            match tokio::time::timeout(self.scoring_timeout, scorer.score(ticket, &online)).await {
                Ok(ScoreOutcome::Scored {
                    agent_id,
                    confidence,
                    reasoning,
                    estimated_response_time,
                }) => {
                    if let Some(agent) = online.iter().find(|c| c.id == agent_id) {
                        tracing::info!(
                            ticket_id = %ticket.id(),
                            agent_id = %agent_id,
                            confidence,
                            scorer = scorer.name(),
                            "Scorer selected agent"
                        );
                        return Selection::Selected(AssignmentDecision {
                            agent_id,
                            agent_name: agent.name.clone(),
                            method: AssignmentMethod::Ai,
                            confidence,
                            reasoning,
                            estimated_response_time: estimated_response_time
                                .unwrap_or_else(|| ticket.priority().default_response_time().to_string()),
                        });
                    }
                    tracing::warn!(
                        ticket_id = %ticket.id(),
                        agent_id = %agent_id,
                        "Scorer picked an agent outside the candidate set, falling back"
                    );
                }
                Ok(ScoreOutcome::Unavailable { reason }) => {
                    tracing::warn!(ticket_id = %ticket.id(), %reason, "Scorer unavailable, falling back to workload policy");
                }
                Err(_) => {
                    tracing::warn!(
                        ticket_id = %ticket.id(),
                        timeout_ms = self.scoring_timeout.as_millis() as u64,
                        "Scorer timed out, falling back to workload policy"
                    );
                }
            }
        }

        match workload_fallback(ticket, &online) {
            Some(decision) => {
                tracing::info!(
                    ticket_id = %ticket.id(),
                    agent_id = %decision.agent_id,
                    method = %decision.method,
                    "Workload policy selected agent"
                );
                Selection::Selected(decision)
            }
            None => Selection::NoneAvailable {
                reason: "all agents offline".to_string(),
            },
        }
    }
}

/// Deterministic least-loaded selection
///
/// Picks the minimum `active_tickets`; ties go to the lowest agent id. An
/// agent with zero tickets is preferred naturally, but a loaded agent is
/// still returned when nobody is idle.
pub fn workload_fallback(ticket: &Ticket, candidates: &[AgentProfile]) -> Option<AssignmentDecision> {
    let chosen = candidates
        .iter()
        .filter(|c| c.availability != Availability::Offline)
        .min_by(|a, b| a.active_tickets.cmp(&b.active_tickets).then_with(|| a.id.cmp(&b.id)))?;

    let reasoning = if chosen.active_tickets == 0 {
        format!("{} has no active tickets", chosen.name)
    } else {
        format!(
            "{} has the lightest workload ({} active tickets)",
            chosen.name, chosen.active_tickets
        )
    };

    Some(AssignmentDecision {
        agent_id: chosen.id,
        agent_name: chosen.name.clone(),
        method: AssignmentMethod::WorkloadFallback,
        confidence: FALLBACK_CONFIDENCE,
        reasoning,
        estimated_response_time: ticket.priority().default_response_time().to_string(),
    })
}
