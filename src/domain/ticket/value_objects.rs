use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a ticket
///
/// # Status Transitions
/// ```text
/// Open -> In Progress -> Under Review -> Resolved -> Closed
///   |          |  ^            |           |
///   |          v  |            v           v
///   +-----> Escalated ------> Resolved   In Progress (reopen)
///   +-----> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
pub enum TicketStatus {
    #[serde(rename = "Open")]
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Under Review")]
    UnderReview,
    #[serde(rename = "Resolved")]
    Resolved,
    #[serde(rename = "Closed")]
    Closed,
    #[serde(rename = "Escalated")]
    Escalated,
}

impl TicketStatus {
    /// Checks if a transition from the current status to `next` is valid
    ///
    /// Assignment-dependent rules (no Open while assigned, no In Progress
    /// while unassigned) are enforced by the Ticket aggregate.
    ///
    /// # Example
    /// ```
    /// use ticketdesk_api::domain::ticket::value_objects::TicketStatus;
    ///
    /// assert!(TicketStatus::Open.can_transition_to(TicketStatus::InProgress));
    /// assert!(!TicketStatus::Closed.can_transition_to(TicketStatus::Open));
    /// ```
    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, next),
            (Open, InProgress)
                | (Open, Escalated)
                | (Open, Closed)
                | (InProgress, UnderReview)
                | (InProgress, Escalated)
                | (InProgress, Resolved)
                | (InProgress, Closed)
                | (UnderReview, InProgress)
                | (UnderReview, Escalated)
                | (UnderReview, Resolved)
                | (UnderReview, Closed)
                | (Escalated, InProgress)
                | (Escalated, UnderReview)
                | (Escalated, Resolved)
                | (Escalated, Closed)
                | (Resolved, Closed)
                | (Resolved, InProgress)
        )
    }

    /// Resolved and Closed tickets no longer count toward an agent's load
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "Open",
            TicketStatus::InProgress => "In Progress",
            TicketStatus::UnderReview => "Under Review",
            TicketStatus::Resolved => "Resolved",
            TicketStatus::Closed => "Closed",
            TicketStatus::Escalated => "Escalated",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "open" => Ok(TicketStatus::Open),
            "inprogress" => Ok(TicketStatus::InProgress),
            "underreview" => Ok(TicketStatus::UnderReview),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            "escalated" => Ok(TicketStatus::Escalated),
            _ => Err(format!("Unknown ticket status: {}", s)),
        }
    }
}

/// Ticket priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Response time promised when no scorer estimate is available
    pub fn default_response_time(&self) -> &'static str {
        match self {
            Priority::Urgent => "1 hour",
            Priority::High => "4 hours",
            Priority::Medium => "24 hours",
            Priority::Low => "48 hours",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of audit entry appended to a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "update_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    StatusChange,
    Assignment,
    Comment,
    Escalation,
    InternalNote,
    AgentReply,
}

/// How an assignment decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentMethod {
    #[serde(rename = "ai")]
    Ai,
    #[serde(rename = "workload-fallback")]
    WorkloadFallback,
    #[serde(rename = "manual")]
    Manual,
}

impl AssignmentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentMethod::Ai => "ai",
            AssignmentMethod::WorkloadFallback => "workload-fallback",
            AssignmentMethod::Manual => "manual",
        }
    }
}

impl fmt::Display for AssignmentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
