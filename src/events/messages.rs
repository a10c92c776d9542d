// Queue message contract
//
// Wire format: { "eventType": "...", "data": { ... }, "timestamp": "..." }.
// Messages are parsed in two steps so that an unknown event type or a bad
// identifier can be reported precisely instead of failing as opaque JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::ticket::TicketEvent;

pub const TICKET_CREATED: &str = "ticket.created";
pub const TICKET_RESOLVED: &str = "ticket.resolved";

/// Envelope published to and consumed from the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    pub event_type: String,
    #[serde(default)]
    pub data: TicketEventData,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Loose payload; identifiers stay strings until routing validates them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketEventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complaint_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
}

/// Why a message could not be routed to a handler
#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    #[error("Malformed message body: {0}")]
    Malformed(String),

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// A message validated for dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutedEvent {
    TicketCreated {
        ticket_id: Uuid,
        assigned_to: Option<Uuid>,
    },
    TicketResolved {
        ticket_id: Option<Uuid>,
        agent_id: Option<Uuid>,
    },
}

impl QueueMessage {
    /// Queue message for a domain event; only Created and Resolved are published
    pub fn from_event(event: &TicketEvent) -> Option<Self> {
        match event {
            TicketEvent::Created { ticket_id, assigned_to } => Some(Self {
                event_type: TICKET_CREATED.to_string(),
                data: TicketEventData {
                    ticket_id: Some(ticket_id.to_string()),
                    assigned_to: assigned_to.map(|a| a.to_string()),
                    ..Default::default()
                },
                timestamp: Utc::now(),
            }),
            TicketEvent::Resolved {
                ticket_id,
                agent_id,
                resolved_at,
            } => Some(Self {
                event_type: TICKET_RESOLVED.to_string(),
                data: TicketEventData {
                    ticket_id: Some(ticket_id.to_string()),
                    agent_id: agent_id.map(|a| a.to_string()),
                    resolved_at: Some(resolved_at.to_rfc3339()),
                    ..Default::default()
                },
                timestamp: Utc::now(),
            }),
            TicketEvent::Assigned { .. } | TicketEvent::StatusChanged { .. } => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses and validates a raw queue body
    pub fn route(body: &str) -> Result<RoutedEvent, RouteError> {
        let message: QueueMessage = serde_json::from_str(body).map_err(|e| RouteError::Malformed(e.to_string()))?;
        message.routed()
    }

    pub fn routed(&self) -> Result<RoutedEvent, RouteError> {
        match self.event_type.as_str() {
            TICKET_CREATED => {
                let ticket_id = self
                    .data
                    .ticket_ref()
                    .ok_or_else(|| RouteError::InvalidPayload("ticket.created without ticketId".to_string()))?;
                Ok(RoutedEvent::TicketCreated {
                    ticket_id: parse_id("ticketId", ticket_id)?,
                    assigned_to: parse_optional_id("assignedTo", self.data.assigned_to.as_deref())?,
                })
            }
            TICKET_RESOLVED => {
                let ticket_id = parse_optional_id("ticketId", self.data.ticket_ref())?;
                let agent_id = parse_optional_id("agentId", self.data.agent_id.as_deref())?;
                if ticket_id.is_none() && agent_id.is_none() {
                    return Err(RouteError::InvalidPayload(
                        "ticket.resolved needs an agentId or a ticketId".to_string(),
                    ));
                }
                Ok(RoutedEvent::TicketResolved { ticket_id, agent_id })
            }
            other => Err(RouteError::UnknownEventType(other.to_string())),
        }
    }
}

impl TicketEventData {
    /// `ticketId`, or the legacy `complaintId` alias
    fn ticket_ref(&self) -> Option<&str> {
        self.ticket_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.complaint_id.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

fn parse_id(field: &str, raw: &str) -> Result<Uuid, RouteError> {
    Uuid::parse_str(raw.trim()).map_err(|_| RouteError::InvalidPayload(format!("{} '{}' is not a valid id", field, raw)))
}

fn parse_optional_id(field: &str, raw: Option<&str>) -> Result<Option<Uuid>, RouteError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_id(field, raw).map(Some),
        None => Ok(None),
    }
}
