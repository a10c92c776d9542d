use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::agent::Availability;
use crate::domain::ticket::{Actor, AssignmentMetadata, AssignmentMethod, Ticket};

/// Confidence recorded for every workload-fallback decision
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Lowest confidence an accepted scorer decision is recorded with
pub const AI_CONFIDENCE_FLOOR: f64 = 0.4;

/// Candidate agent as seen by the assignment policy
///
/// `active_tickets` is computed when the profile is built, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub id: Uuid,
    pub name: String,
    pub availability: Availability,
    pub active_tickets: u64,
    pub expertise: Vec<String>,
}

/// Ephemeral result of the assignment policy
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentDecision {
    pub agent_id: Uuid,
    pub agent_name: String,
    pub method: AssignmentMethod,
    pub confidence: f64,
    pub reasoning: String,
    pub estimated_response_time: String,
}

impl AssignmentDecision {
    /// Folds the decision into the metadata of an assignment update
    pub fn to_metadata(&self, previous_agent_id: Option<Uuid>) -> AssignmentMetadata {
        AssignmentMetadata {
            agent_id: self.agent_id,
            method: self.method,
            confidence: self.confidence,
            reasoning: self.reasoning.clone(),
            estimated_response_time: Some(self.estimated_response_time.clone()),
            previous_agent_id,
        }
    }
}

/// Outcome of `AssignmentPolicy::select_agent`
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Selected(AssignmentDecision),
    NoneAvailable { reason: String },
}

/// Where the agent for an assignment comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// Registry + policy pick the agent
    Auto,
    /// An administrator named the agent
    Manual { agent_id: Uuid, actor: Actor },
    /// The reassignment worker already picked a free agent
    Worker { agent_id: Uuid },
}

/// Non-error results of `AssignmentExecutor::assign`
#[derive(Debug, Clone)]
pub enum AssignOutcome {
    /// This call won the assignment
    Assigned { ticket: Ticket, decision: AssignmentDecision },
    /// Somebody already holds the ticket; nothing changed
    AlreadyAssigned { agent_id: Option<Uuid> },
    /// No eligible agent; the ticket stays unassigned
    NoAgent { reason: String },
}

impl AssignOutcome {
    pub fn assigned_agent(&self) -> Option<Uuid> {
        match self {
            AssignOutcome::Assigned { ticket, .. } => ticket.assigned_to(),
            AssignOutcome::AlreadyAssigned { agent_id } => *agent_id,
            AssignOutcome::NoAgent { .. } => None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, AssignOutcome::Assigned { .. })
    }
}
