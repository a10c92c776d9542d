use super::value_objects::{AssignmentMethod, TicketStatus, UpdateType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Who caused an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// Automatic processes (assignment engine, queue worker)
    System,
    /// An authenticated person (agent, admin or customer)
    User(Uuid),
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::System => write!(f, "system"),
            Actor::User(id) => write!(f, "user:{}", id),
        }
    }
}

/// Structured payload carried by `assignment` updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentMetadata {
    pub agent_id: Uuid,
    pub method: AssignmentMethod,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_response_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_agent_id: Option<Uuid>,
}

/// Append-only audit entry on a ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub id: Uuid,
    pub message: String,
    pub actor: Actor,
    pub update_type: UpdateType,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AssignmentMetadata>,
}

impl Update {
    pub fn new(update_type: UpdateType, actor: Actor, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            actor,
            update_type,
            created_at: Utc::now(),
            metadata: None,
        }
    }

    /// Audit entry for an assignment, automatic or manual
    pub fn assignment(actor: Actor, agent_name: &str, metadata: AssignmentMetadata) -> Self {
        let message = match (metadata.method, metadata.previous_agent_id) {
            (AssignmentMethod::Manual, Some(_)) => format!("Ticket manually reassigned to {}", agent_name),
            (AssignmentMethod::Manual, None) => format!("Ticket manually assigned to {}", agent_name),
            (method, _) => format!("Ticket automatically assigned to {} ({})", agent_name, method),
        };

        Self {
            metadata: Some(metadata),
            ..Self::new(UpdateType::Assignment, actor, message)
        }
    }

    /// Audit entry for a status change; escalations get their own type
    pub fn status_change(actor: Actor, from: TicketStatus, to: TicketStatus, note: Option<&str>) -> Self {
        let update_type = if to == TicketStatus::Escalated {
            UpdateType::Escalation
        } else {
            UpdateType::StatusChange
        };
        let mut message = format!("Status changed from {} to {}", from, to);
        if let Some(note) = note.filter(|n| !n.trim().is_empty()) {
            message.push_str(": ");
            message.push_str(note.trim());
        }

        Self::new(update_type, actor, message)
    }

    pub fn method(&self) -> Option<AssignmentMethod> {
        self.metadata.as_ref().map(|m| m.method)
    }
}
