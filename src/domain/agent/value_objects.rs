use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Availability of a support agent
///
/// # Transitions
/// ```text
/// available <-> busy        (automatic, driven by active ticket count)
/// any       -> offline      (administrator only)
/// offline   -> any          (administrator only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "agent_availability", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// Agent carries no open work and can take a ticket
    Available,
    /// Agent carries at least one open ticket
    Busy,
    /// Taken offline by an administrator
    Offline,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Busy => "busy",
            Availability::Offline => "offline",
        }
    }
}

impl Default for Availability {
    fn default() -> Self {
        Availability::Available
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Availability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(Availability::Available),
            "busy" => Ok(Availability::Busy),
            "offline" => Ok(Availability::Offline),
            other => Err(format!("Unknown availability: {}", other)),
        }
    }
}

/// Email value object for agent contact addresses
///
/// # Invariants
/// - Exactly one '@' with a non-empty local part and domain
/// - Stored lowercased and trimmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Creates a new Email value object
    ///
    /// # Example
    /// ```
    /// use ticketdesk_api::domain::agent::value_objects::Email;
    ///
    /// let email = Email::new(" Agent@Example.com ").expect("valid email");
    /// assert_eq!(email.as_str(), "agent@example.com");
    /// ```
    pub fn new(email: impl Into<String>) -> Result<Self, String> {
        let email = email.into().trim().to_lowercase();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
                Ok(Email(email))
            }
            _ => Err(format!("Invalid email: {}", email)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Email::new(value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
