use std::sync::Arc;

use crate::assignment::workflow::TicketWorkflow;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub workflow: TicketWorkflow,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(workflow: TicketWorkflow, jwt_secret: impl Into<Arc<str>>) -> Self {
        Self {
            workflow,
            jwt_secret: jwt_secret.into(),
        }
    }
}
