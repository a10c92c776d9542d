//! End-to-end API integration tests
//!
//! These tests drive the HTTP router over in-memory adapters:
//! - Ticket creation with immediate assignment
//! - Status transitions and their validation
//! - Admin-only assignment and availability routes (JWT role checks)

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for oneshot
use uuid::Uuid;

use ticketdesk_api::api::{self, AppState};
use ticketdesk_api::assignment::{AssignmentExecutor, AssignmentPolicy, TicketWorkflow};
use ticketdesk_api::auth::jwt::{create_token, Role};
use ticketdesk_api::events::EventPublisher;
use ticketdesk_api::infrastructure::notifications::LogNotifier;
use ticketdesk_api::infrastructure::queue::InMemoryQueue;
use ticketdesk_api::infrastructure::repositories::{InMemoryAgentRepository, InMemoryTicketRepository};

const SECRET: &str = "api-test-secret";

/// Setup test application over fresh in-memory stores
fn setup_app() -> Router {
    let tickets = Arc::new(InMemoryTicketRepository::new());
    let agents = Arc::new(InMemoryAgentRepository::new(tickets.clone()));
    let queue = Arc::new(InMemoryQueue::new());

    let executor = AssignmentExecutor::new(
        tickets.clone(),
        agents.clone(),
        AssignmentPolicy::workload_only(),
        Arc::new(LogNotifier),
    );
    let workflow = TicketWorkflow::new(tickets, agents, executor, EventPublisher::new(queue, true));

    api::router(AppState::new(workflow, SECRET))
}

fn admin_token() -> String {
    create_token(Uuid::new_v4(), Role::Admin, SECRET).unwrap()
}

fn agent_token() -> String {
    create_token(Uuid::new_v4(), Role::Agent, SECRET).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };

    (status, json)
}

async fn register_agent(app: &Router, name: &str) -> Uuid {
    let (status, json) = send(
        app,
        "POST",
        "/api/agents",
        Some(&admin_token()),
        Some(json!({ "name": name, "email": format!("{}@example.com", name.to_lowercase()) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["agentId"].as_str().unwrap().parse().unwrap()
}

async fn create_ticket(app: &Router, title: &str) -> Value {
    let (status, json) = send(
        app,
        "POST",
        "/api/tickets",
        None,
        Some(json!({ "title": title, "description": "details", "category": "Billing", "priority": "high" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json
}

#[tokio::test]
async fn test_health_check() {
    let app = setup_app();

    let (status, json) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_ticket_without_agents_stays_open() {
    let app = setup_app();

    let json = create_ticket(&app, "Invoice missing").await;

    assert_eq!(json["ticket"]["status"], "Open");
    assert!(json["ticket"]["assignedTo"].is_null());
    assert_eq!(json["ticket"]["category"], "billing");
    assert_eq!(json["assignment"]["result"], "unassigned");
    assert_eq!(json["assignment"]["reasoning"], "no agents found");

    let (status, waiting) = send(&app, "GET", "/api/tickets/unassigned", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(waiting.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ticket_is_assigned_to_available_agent() {
    let app = setup_app();
    let agent_id = register_agent(&app, "Amara").await;

    let json = create_ticket(&app, "Card declined").await;

    assert_eq!(json["ticket"]["status"], "In Progress");
    assert_eq!(json["ticket"]["assignedTo"], agent_id.to_string());
    assert_eq!(json["assignment"]["method"], "workload-fallback");
    assert_eq!(json["assignment"]["confidence"], 0.3);
    assert_eq!(json["assignment"]["estimatedResponseTime"], "4 hours");

    let updates = json["ticket"]["updates"].as_array().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["updateType"], "assignment");
    assert_eq!(updates[0]["metadata"]["method"], "workload-fallback");

    let (_, agents) = send(&app, "GET", "/api/agents", None, None).await;
    assert_eq!(agents[0]["availability"], "busy");
    assert_eq!(agents[0]["activeTickets"], 1);
}

#[tokio::test]
async fn test_get_missing_ticket_is_404() {
    let app = setup_app();

    let (status, json) = send(&app, "GET", &format!("/api/tickets/{}", Uuid::new_v4()), None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_blank_title_is_rejected() {
    let app = setup_app();

    let (status, _) = send(&app, "POST", "/api/tickets", None, Some(json!({ "title": "   " }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_resolving_frees_agent() {
    let app = setup_app();
    let agent_id = register_agent(&app, "Bo").await;
    let ticket = create_ticket(&app, "Reset password").await;
    let ticket_id = ticket["ticket"]["id"].as_str().unwrap();

    let (status, json) = send(
        &app,
        "PATCH",
        &format!("/api/tickets/{}/status", ticket_id),
        Some(&agent_token()),
        Some(json!({ "status": "resolved", "note": "Sent reset link" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Resolved");
    assert!(json["resolvedAt"].is_string());

    let (_, agents) = send(&app, "GET", "/api/agents", None, None).await;
    assert_eq!(agents[0]["id"], agent_id.to_string());
    assert_eq!(agents[0]["availability"], "available");
    assert_eq!(agents[0]["activeTickets"], 0);
}

#[tokio::test]
async fn test_invalid_transition_is_400() {
    let app = setup_app();
    let ticket = create_ticket(&app, "Wrong charge").await;
    let ticket_id = ticket["ticket"]["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/tickets/{}/status", ticket_id),
        None,
        Some(json!({ "status": "Resolved" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/tickets/{}/status", ticket_id),
        None,
        Some(json!({ "status": "sideways" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let app = setup_app();
    let body = json!({ "availability": "offline" });
    let uri = format!("/api/agents/{}/availability", Uuid::new_v4());

    let (status, _) = send(&app, "PUT", &uri, None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "PUT", &uri, Some("not-a-token"), Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "PUT", &uri, Some(&agent_token()), Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "PUT", &uri, Some(&admin_token()), Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_reassignment() {
    let app = setup_app();
    let first = register_agent(&app, "Chidi").await;
    let ticket = create_ticket(&app, "Refund request").await;
    let ticket_id = ticket["ticket"]["id"].as_str().unwrap();
    assert_eq!(ticket["ticket"]["assignedTo"], first.to_string());
    let second = register_agent(&app, "Dara").await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/api/tickets/{}/assign", ticket_id),
        Some(&admin_token()),
        Some(json!({ "agentId": second })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["assignment"]["result"], "assigned");
    assert_eq!(json["assignment"]["method"], "manual");
    assert_eq!(json["ticket"]["assignedTo"], second.to_string());
    let updates = json["ticket"]["updates"].as_array().unwrap();
    assert_eq!(updates.last().unwrap()["metadata"]["previousAgentId"], first.to_string());

    let (_, agents) = send(&app, "GET", "/api/agents", None, None).await;
    for agent in agents.as_array().unwrap() {
        let expected = if agent["id"] == second.to_string() { "busy" } else { "available" };
        assert_eq!(agent["availability"], expected);
    }
}

#[tokio::test]
async fn test_duplicate_agent_email_conflicts() {
    let app = setup_app();
    register_agent(&app, "Eve").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/agents",
        Some(&admin_token()),
        Some(json!({ "name": "Other Eve", "email": "EVE@example.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_agent_back_online_picks_up_waiting_ticket() {
    let app = setup_app();
    let agent_id = register_agent(&app, "Femi").await;
    let uri = format!("/api/agents/{}/availability", agent_id);

    let (status, json) = send(&app, "PUT", &uri, Some(&admin_token()), Some(json!({ "availability": "offline" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["availability"], "offline");

    let waiting = create_ticket(&app, "Cannot log in").await;
    assert_eq!(waiting["assignment"]["result"], "unassigned");

    let (status, json) = send(&app, "PUT", &uri, Some(&admin_token()), Some(json!({ "availability": "available" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["availability"], "busy");
    assert_eq!(json["pickedUpTicket"], waiting["ticket"]["id"]);
}
