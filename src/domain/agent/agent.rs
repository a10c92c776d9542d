use super::value_objects::{Availability, Email};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Support agent aggregate
///
/// Holds identity and the persisted availability. The active ticket count is
/// deliberately not stored here: it is always derived from the ticket store
/// at the moment it is needed.
///
/// # Invariants
/// - Name cannot be blank
/// - New agents start `Available`
///
/// # Example
/// ```
/// use ticketdesk_api::domain::agent::Agent;
/// use ticketdesk_api::domain::agent::value_objects::{Availability, Email};
///
/// let agent = Agent::new("Dana", Email::new("dana@example.com").unwrap()).expect("valid agent");
/// assert_eq!(agent.availability(), Availability::Available);
/// ```
#[derive(Debug, Clone)]
pub struct Agent {
    id: Uuid,
    name: String,
    email: Email,
    availability: Availability,
    created_at: DateTime<Utc>,
}

impl Agent {
    /// Creates a new agent in the `Available` state
    pub fn new(name: impl Into<String>, email: Email) -> Result<Self, String> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err("Agent name cannot be empty".to_string());
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            email,
            availability: Availability::default(),
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_offline(&self) -> bool {
        self.availability == Availability::Offline
    }

    /// Applies a persisted availability change
    pub fn set_availability(&mut self, availability: Availability) {
        self.availability = availability;
    }

    /// Reconstructs an Agent from persistence layer data
    ///
    /// # Note
    /// Only to be used by repository implementations.
    pub fn from_persistence(
        id: Uuid,
        name: String,
        email: Email,
        availability: Availability,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            email,
            availability,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::new("agent@example.com").unwrap()
    }

    #[test]
    fn new_agent_is_available() {
        let agent = Agent::new("Sam", email()).unwrap();
        assert_eq!(agent.name(), "Sam");
        assert_eq!(agent.availability(), Availability::Available);
        assert!(!agent.is_offline());
    }

    #[test]
    fn blank_name_rejected() {
        let result = Agent::new("   ", email());
        assert!(result.unwrap_err().contains("cannot be empty"));
    }

    #[test]
    fn from_persistence_keeps_fields() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let agent = Agent::from_persistence(id, "Kim".to_string(), email(), Availability::Offline, now);

        assert_eq!(agent.id(), id);
        assert_eq!(agent.created_at(), now);
        assert!(agent.is_offline());
    }
}
