use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::middleware::{AdminAuth, MaybeAuth};
use crate::api::state::AppState;
use crate::assignment::types::AssignOutcome;
use crate::domain::ticket::{AssignmentMethod, NewTicket, Priority, Ticket, TicketStatus, Update};

/// Request body for opening a ticket
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub organization: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTicketRequest {
    pub agent_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub organization: Option<String>,
    pub created_by: Option<Uuid>,
    pub status: TicketStatus,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub updates: Vec<Update>,
}

impl From<&Ticket> for TicketResponse {
    fn from(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id(),
            title: ticket.title().to_string(),
            description: ticket.description().to_string(),
            category: ticket.category().to_string(),
            priority: ticket.priority(),
            organization: ticket.organization().map(str::to_string),
            created_by: ticket.created_by(),
            status: ticket.status(),
            assigned_to: ticket.assigned_to(),
            created_at: ticket.created_at(),
            updated_at: ticket.updated_at(),
            resolved_at: ticket.resolved_at(),
            updates: ticket.updates().to_vec(),
        }
    }
}

/// How an assignment attempt ended, as reported to API callers
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSummary {
    pub result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<AssignmentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_response_time: Option<String>,
}

impl From<&AssignOutcome> for AssignmentSummary {
    fn from(outcome: &AssignOutcome) -> Self {
        let empty = Self {
            result: "",
            agent_id: None,
            agent_name: None,
            method: None,
            confidence: None,
            reasoning: None,
            estimated_response_time: None,
        };

        match outcome {
            AssignOutcome::Assigned { decision, .. } => Self {
                result: "assigned",
                agent_id: Some(decision.agent_id),
                agent_name: Some(decision.agent_name.clone()),
                method: Some(decision.method),
                confidence: Some(decision.confidence),
                reasoning: Some(decision.reasoning.clone()),
                estimated_response_time: Some(decision.estimated_response_time.clone()),
            },
            AssignOutcome::AlreadyAssigned { agent_id } => Self {
                result: "already_assigned",
                agent_id: *agent_id,
                ..empty
            },
            AssignOutcome::NoAgent { reason } => Self {
                result: "unassigned",
                reasoning: Some(reason.clone()),
                ..empty
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub ticket: TicketResponse,
    pub assignment: AssignmentSummary,
}

/// Open a ticket and try to assign it right away
///
/// POST /api/tickets
pub async fn create_ticket(
    State(state): State<AppState>,
    caller: MaybeAuth,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    let created = state
        .workflow
        .create_ticket(NewTicket {
            title: req.title,
            description: req.description,
            category: req.category.unwrap_or_default(),
            priority: req.priority.unwrap_or_default(),
            organization: req.organization,
            created_by: caller.0.map(|claims| claims.sub),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AssignmentResponse {
            ticket: TicketResponse::from(&created.ticket),
            assignment: AssignmentSummary::from(&created.outcome),
        }),
    ))
}

/// Get a ticket with its update log
///
/// GET /api/tickets/:id
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketResponse>, ApiError> {
    let ticket = state.workflow.get_ticket(id).await?;
    Ok(Json(TicketResponse::from(&ticket)))
}

/// Non-terminal tickets nobody holds, oldest first
///
/// GET /api/tickets/unassigned
pub async fn list_unassigned(State(state): State<AppState>) -> Result<Json<Vec<TicketResponse>>, ApiError> {
    let tickets = state.workflow.unassigned_tickets().await?;
    Ok(Json(tickets.iter().map(TicketResponse::from).collect()))
}

/// Move a ticket to a new status
///
/// PATCH /api/tickets/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    caller: MaybeAuth,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<TicketResponse>, ApiError> {
    let next: TicketStatus = req.status.parse().map_err(ApiError::bad_request)?;

    let ticket = state
        .workflow
        .update_status(id, next, caller.actor(), req.note.as_deref())
        .await?;

    Ok(Json(TicketResponse::from(&ticket)))
}

/// Assign or reassign a ticket to a specific agent
///
/// POST /api/tickets/:id/assign
pub async fn assign_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    admin: AdminAuth,
    Json(req): Json<AssignTicketRequest>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let outcome = state.workflow.assign_manually(id, req.agent_id, admin.actor()).await?;

    let ticket = match &outcome {
        AssignOutcome::Assigned { ticket, .. } => ticket.clone(),
        _ => state.workflow.get_ticket(id).await?,
    };

    Ok(Json(AssignmentResponse {
        ticket: TicketResponse::from(&ticket),
        assignment: AssignmentSummary::from(&outcome),
    }))
}
