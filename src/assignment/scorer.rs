// Agent scoring collaborator contract
//
// The scorer ranks candidates for a ticket. Its answers are validated once,
// here, into a tagged `ScoreOutcome`; nothing downstream sees raw JSON.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use super::prompts::library;
use super::types::{AgentProfile, AI_CONFIDENCE_FLOOR};
use crate::domain::agent::Availability;
use crate::domain::ticket::Ticket;

/// Failures talking to the scoring collaborator
///
/// Always soft: the policy logs them and falls back to workload selection.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Scorer request failed: {0}")]
    Transport(String),

    #[error("Scorer returned HTTP {0}")]
    Status(u16),

    #[error("Scorer response could not be decoded: {0}")]
    Decode(String),

    #[error("Scorer timed out after {0} ms")]
    Timeout(u64),
}

/// Validated scorer answer
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Scored {
        agent_id: Uuid,
        confidence: f64,
        reasoning: String,
        estimated_response_time: Option<String>,
    },
    Unavailable {
        reason: String,
    },
}

/// Ranks candidate agents for a ticket
#[async_trait]
pub trait AgentScorer: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Score the candidates; transport problems become `Unavailable`
    async fn score(&self, ticket: &Ticket, candidates: &[AgentProfile]) -> ScoreOutcome;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSummary {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSummary {
    pub id: Uuid,
    pub name: String,
    pub active_tickets: u64,
    pub availability: Availability,
    pub expertise: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptPayload {
    pub name: String,
    pub version: String,
    pub system: String,
    pub user: String,
}

/// Body sent to the scoring collaborator
#[derive(Debug, Clone, Serialize)]
pub struct ScoringRequest {
    pub ticket: TicketSummary,
    pub candidates: Vec<CandidateSummary>,
    pub prompt: PromptPayload,
}

impl ScoringRequest {
    pub fn build(ticket: &Ticket, candidates: &[AgentProfile]) -> Self {
        let template = library::agent_selection();
        let roster = candidates
            .iter()
            .map(|c| {
                format!(
                    "{} | {} | {} | {} | {}",
                    c.id,
                    c.name,
                    c.availability,
                    c.active_tickets,
                    if c.expertise.is_empty() { "-".to_string() } else { c.expertise.join(", ") }
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let variables = HashMap::from([
            ("title".to_string(), ticket.title().to_string()),
            ("category".to_string(), ticket.category().to_string()),
            ("priority".to_string(), ticket.priority().to_string()),
            ("description".to_string(), ticket.description().to_string()),
            ("candidates".to_string(), roster),
        ]);

        Self {
            ticket: TicketSummary {
                title: ticket.title().to_string(),
                description: ticket.description().to_string(),
                category: ticket.category().to_string(),
                priority: ticket.priority().to_string(),
            },
            candidates: candidates
                .iter()
                .map(|c| CandidateSummary {
                    id: c.id,
                    name: c.name.clone(),
                    active_tickets: c.active_tickets,
                    availability: c.availability,
                    expertise: c.expertise.clone(),
                })
                .collect(),
            prompt: PromptPayload {
                user: template.render(&variables),
                name: template.name,
                version: template.version,
                system: template.system,
            },
        }
    }
}

/// Raw response as the collaborator sends it; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResponse {
    #[serde(default)]
    pub success: bool,
    pub agent: Option<String>,
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
    pub method: Option<String>,
    pub estimated_response_time: Option<String>,
    pub error: Option<String>,
}

impl ScoringResponse {
    /// Validates the response against the candidates that were offered
    ///
    /// `agent` may be a candidate id or (case-insensitively) a candidate
    /// name. Confidence must be within [0, 1] and is floored so that a
    /// scored decision always ranks above a fallback one.
    pub fn validate(self, candidates: &[AgentProfile]) -> ScoreOutcome {
        if !self.success {
            return ScoreOutcome::Unavailable {
                reason: self.error.unwrap_or_else(|| "scorer reported failure".to_string()),
            };
        }

        let Some(agent) = self.agent.as_deref().map(str::trim).filter(|a| !a.is_empty()) else {
            return ScoreOutcome::Unavailable {
                reason: "response names no agent".to_string(),
            };
        };

        let chosen = candidates.iter().find(|c| {
            Uuid::parse_str(agent).map(|id| id == c.id).unwrap_or(false) || c.name.eq_ignore_ascii_case(agent)
        });
        let Some(chosen) = chosen else {
            return ScoreOutcome::Unavailable {
                reason: format!("agent '{}' is not among the candidates", agent),
            };
        };

        let confidence = match self.confidence {
            Some(c) if c.is_finite() && (0.0..=1.0).contains(&c) => c.max(AI_CONFIDENCE_FLOOR),
            Some(c) => {
                return ScoreOutcome::Unavailable {
                    reason: format!("confidence {} outside [0, 1]", c),
                }
            }
            None => AI_CONFIDENCE_FLOOR,
        };

        ScoreOutcome::Scored {
            agent_id: chosen.id,
            confidence,
            reasoning: self
                .reasoning
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| "Selected by scoring service".to_string()),
            estimated_response_time: self.estimated_response_time.filter(|e| !e.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::{NewTicket, Priority};

    fn candidates() -> Vec<AgentProfile> {
        vec![
            AgentProfile {
                id: Uuid::new_v4(),
                name: "Ada".to_string(),
                availability: Availability::Available,
                active_tickets: 0,
                expertise: vec!["billing".to_string()],
            },
            AgentProfile {
                id: Uuid::new_v4(),
                name: "Lin".to_string(),
                availability: Availability::Busy,
                active_tickets: 2,
                expertise: vec![],
            },
        ]
    }

    fn response(agent: &str, confidence: Option<f64>) -> ScoringResponse {
        ScoringResponse {
            success: true,
            agent: Some(agent.to_string()),
            confidence,
            reasoning: Some("billing expert".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_candidate_by_id() {
        let c = candidates();
        let outcome = response(&c[1].id.to_string(), Some(0.9)).validate(&c);
        assert_eq!(
            outcome,
            ScoreOutcome::Scored {
                agent_id: c[1].id,
                confidence: 0.9,
                reasoning: "billing expert".to_string(),
                estimated_response_time: None,
            }
        );
    }

    #[test]
    fn accepts_candidate_by_name() {
        let c = candidates();
        match response("ada", Some(0.7)).validate(&c) {
            ScoreOutcome::Scored { agent_id, .. } => assert_eq!(agent_id, c[0].id),
            other => panic!("expected Scored, got {:?}", other),
        }
    }

    #[test]
    fn unknown_agent_is_unavailable() {
        let outcome = response("Mallory", Some(0.9)).validate(&candidates());
        assert!(matches!(outcome, ScoreOutcome::Unavailable { .. }));
    }

    #[test]
    fn out_of_range_confidence_is_unavailable() {
        let c = candidates();
        assert!(matches!(response("Ada", Some(1.5)).validate(&c), ScoreOutcome::Unavailable { .. }));
        assert!(matches!(response("Ada", Some(f64::NAN)).validate(&c), ScoreOutcome::Unavailable { .. }));
    }

    #[test]
    fn low_confidence_is_floored_above_fallback() {
        let c = candidates();
        match response("Ada", Some(0.05)).validate(&c) {
            ScoreOutcome::Scored { confidence, .. } => assert_eq!(confidence, AI_CONFIDENCE_FLOOR),
            other => panic!("expected Scored, got {:?}", other),
        }
        assert!(AI_CONFIDENCE_FLOOR > crate::assignment::types::FALLBACK_CONFIDENCE);
    }

    #[test]
    fn unsuccessful_response_carries_error() {
        let raw: ScoringResponse = serde_json::from_str(r#"{"success": false, "error": "quota"}"#).unwrap();
        assert_eq!(
            raw.validate(&candidates()),
            ScoreOutcome::Unavailable {
                reason: "quota".to_string()
            }
        );
    }

    #[test]
    fn request_contains_rendered_roster() {
        let (ticket, _) = Ticket::new(NewTicket {
            title: "Refund".to_string(),
            description: "Charged twice".to_string(),
            category: "billing".to_string(),
            priority: Priority::High,
            organization: None,
            created_by: None,
        })
        .unwrap();
        let c = candidates();

        let request = ScoringRequest::build(&ticket, &c);

        assert_eq!(request.candidates.len(), 2);
        assert!(request.prompt.user.contains("Refund"));
        assert!(request.prompt.user.contains(&c[0].id.to_string()));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["candidates"][1]["activeTickets"], 2);
        assert_eq!(json["ticket"]["priority"], "high");
    }
}
