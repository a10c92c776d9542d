use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::middleware::AdminAuth;
use crate::api::state::AppState;
use crate::assignment::types::AgentProfile;
use crate::assignment::workflow::AvailabilityChange;
use crate::domain::agent::Availability;

#[derive(Debug, Deserialize)]
pub struct RegisterAgentRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SetAvailabilityRequest {
    pub availability: Availability,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub agent_id: Uuid,
    pub availability: Availability,
    /// Ticket assigned to the agent as a consequence of the change
    pub picked_up_ticket: Option<Uuid>,
}

impl From<&AvailabilityChange> for AvailabilityResponse {
    fn from(change: &AvailabilityChange) -> Self {
        Self {
            agent_id: change.agent_id,
            availability: change.availability,
            picked_up_ticket: change.picked_up.as_ref().map(|t| t.id()),
        }
    }
}

/// Every agent with current load and availability
///
/// GET /api/agents
pub async fn list_agents(State(state): State<AppState>) -> Result<Json<Vec<AgentProfile>>, ApiError> {
    Ok(Json(state.workflow.agents().await?))
}

/// Add an agent to the roster
///
/// POST /api/agents
pub async fn register_agent(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Json(req): Json<RegisterAgentRequest>,
) -> Result<(StatusCode, Json<AvailabilityResponse>), ApiError> {
    let change = state.workflow.register_agent(&req.name, &req.email).await?;
    Ok((StatusCode::CREATED, Json(AvailabilityResponse::from(&change))))
}

/// Administrator availability override
///
/// PUT /api/agents/:id/availability
pub async fn set_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _admin: AdminAuth,
    Json(req): Json<SetAvailabilityRequest>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let change = state.workflow.set_agent_availability(id, req.availability).await?;
    Ok(Json(AvailabilityResponse::from(&change)))
}
