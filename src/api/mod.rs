// API layer module (adapters for controllers)
// Follows Hexagonal Architecture - API is an adapter

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use handlers::{agents, health, tickets};
pub use state::AppState;

/// Builds the HTTP router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Ticket routes
        .route("/api/tickets", post(tickets::create_ticket))
        .route("/api/tickets/unassigned", get(tickets::list_unassigned))
        .route("/api/tickets/:id", get(tickets::get_ticket))
        .route("/api/tickets/:id/status", patch(tickets::update_status))
        .route("/api/tickets/:id/assign", post(tickets::assign_ticket))
        // Agent routes
        .route("/api/agents", get(agents::list_agents).post(agents::register_agent))
        .route("/api/agents/:id/availability", put(agents::set_availability))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Shared state
        .with_state(state)
}
