use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::assignment::scorer::{AgentScorer, ScoreOutcome, ScoringError, ScoringRequest, ScoringResponse};
use crate::assignment::types::AgentProfile;
use crate::domain::ticket::Ticket;

/// Scoring collaborator reached over HTTP
///
/// POSTs a `ScoringRequest` to `endpoint` and validates the JSON answer.
/// Any transport, status or decode failure is reported as
/// `ScoreOutcome::Unavailable`, which sends the policy to its fallback.
pub struct HttpAgentScorer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpAgentScorer {
    /// Create a scorer with a per-request timeout
    ///
    /// # Arguments
    /// * `endpoint` - Full URL of the scoring route
    /// * `api_key` - Sent as a bearer token when present
    /// * `timeout` - Hard limit for one request, connect included
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self, ScoringError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScoringError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            timeout,
        })
    }

    async fn request(&self, body: &ScoringRequest) -> Result<ScoringResponse, ScoringError> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ScoringError::Timeout(self.timeout.as_millis() as u64)
            } else {
                ScoringError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoringError::Status(status.as_u16()));
        }

        response
            .json::<ScoringResponse>()
            .await
            .map_err(|e| ScoringError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AgentScorer for HttpAgentScorer {
    fn name(&self) -> &str {
        "http"
    }

    async fn score(&self, ticket: &Ticket, candidates: &[AgentProfile]) -> ScoreOutcome {
        let body = ScoringRequest::build(ticket, candidates);

        match self.request(&body).await {
            Ok(response) => response.validate(candidates),
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, ticket_id = %ticket.id(), error = %e, "Scoring request failed");
                ScoreOutcome::Unavailable { reason: e.to_string() }
            }
        }
    }
}
