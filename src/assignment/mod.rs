// Ticket assignment engine
//
// Decides which agent receives a ticket (registry + policy + scorer),
// applies the decision atomically (executor) and exposes the request-path
// entry points (workflow).

pub mod errors;
pub mod executor;
pub mod notifier;
pub mod policy;
pub mod prompts;
pub mod registry;
pub mod scorer;
pub mod types;
pub mod workflow;

// Re-export main types
pub use errors::{AssignmentError, AssignmentResult};
pub use executor::AssignmentExecutor;
pub use notifier::{Notification, Notifier};
pub use policy::AssignmentPolicy;
pub use registry::AgentRegistry;
pub use scorer::{AgentScorer, ScoreOutcome};
pub use types::{AgentProfile, AssignOutcome, AssignmentDecision, DecisionSource, Selection};
pub use workflow::TicketWorkflow;
