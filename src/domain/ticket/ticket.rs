use super::events::TicketEvent;
use super::update::{Actor, Update};
use super::value_objects::{Priority, TicketStatus};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Input for opening a new ticket
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub organization: Option<String>,
    pub created_by: Option<Uuid>,
}

/// Ticket aggregate root
///
/// A unit of customer-reported work tracked through a status lifecycle.
///
/// # Invariants
/// - Title cannot be empty
/// - At most one assigned agent at any time
/// - An assigned ticket is never `Open`
/// - The update log is append-only
#[derive(Debug, Clone)]
pub struct Ticket {
    id: Uuid,
    title: String,
    description: String,
    category: String,
    priority: Priority,
    organization: Option<String>,
    created_by: Option<Uuid>,
    status: TicketStatus,
    assigned_to: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    updates: Vec<Update>,
}

impl Ticket {
    /// Opens a new, unassigned ticket
    ///
    /// # Returns
    /// * `Ok((Ticket, Vec<TicketEvent>))` - New ticket and the Created event
    /// * `Err(String)` - If the title is blank
    ///
    /// # Example
    /// ```
    /// use ticketdesk_api::domain::ticket::{NewTicket, Ticket, TicketStatus};
    /// use ticketdesk_api::domain::ticket::value_objects::Priority;
    ///
    /// let (ticket, events) = Ticket::new(NewTicket {
    ///     title: "Printer on fire".to_string(),
    ///     description: "Smoke everywhere".to_string(),
    ///     category: "hardware".to_string(),
    ///     priority: Priority::Urgent,
    ///     organization: None,
    ///     created_by: None,
    /// }).expect("valid ticket");
    ///
    /// assert_eq!(ticket.status(), TicketStatus::Open);
    /// assert!(ticket.assigned_to().is_none());
    /// assert_eq!(events.len(), 1);
    /// ```
    pub fn new(input: NewTicket) -> Result<(Self, Vec<TicketEvent>), String> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err("Title cannot be empty".to_string());
        }

        let category = match input.category.trim() {
            "" => "general".to_string(),
            c => c.to_lowercase(),
        };

        let now = Utc::now();
        let ticket = Self {
            id: Uuid::new_v4(),
            title,
            description: input.description,
            category,
            priority: input.priority,
            organization: input.organization.filter(|o| !o.trim().is_empty()),
            created_by: input.created_by,
            status: TicketStatus::Open,
            assigned_to: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            updates: Vec::new(),
        };

        let events = vec![TicketEvent::Created {
            ticket_id: ticket.id,
            assigned_to: None,
        }];

        Ok((ticket, events))
    }

    /// Status a ticket takes when an agent is attached to it
    ///
    /// Open tickets move to In Progress; anything already past that point
    /// (e.g. Escalated) keeps its status.
    pub fn status_after_assignment(&self) -> TicketStatus {
        match self.status {
            TicketStatus::Open => TicketStatus::InProgress,
            other => other,
        }
    }

    /// Attaches the first agent to an unassigned ticket
    pub fn assign(&mut self, agent_id: Uuid, update: Update) -> Result<TicketEvent, String> {
        if let Some(current) = self.assigned_to {
            return Err(format!("Ticket {} is already assigned to {}", self.id, current));
        }

        self.status = self.status_after_assignment();
        self.assigned_to = Some(agent_id);
        self.touch(update);

        Ok(TicketEvent::Assigned {
            ticket_id: self.id,
            agent_id,
            previous_agent_id: None,
        })
    }

    /// Replaces the assignee, provided it is still `expected_previous`
    pub fn reassign(
        &mut self,
        expected_previous: Option<Uuid>,
        agent_id: Uuid,
        update: Update,
    ) -> Result<TicketEvent, String> {
        if self.assigned_to != expected_previous {
            return Err(format!(
                "Ticket {} assignee changed concurrently (expected {:?}, found {:?})",
                self.id, expected_previous, self.assigned_to
            ));
        }

        self.status = self.status_after_assignment();
        self.assigned_to = Some(agent_id);
        self.touch(update);

        Ok(TicketEvent::Assigned {
            ticket_id: self.id,
            agent_id,
            previous_agent_id: expected_previous,
        })
    }

    /// Validates a status change and builds its audit entry without applying it
    pub fn plan_status_change(&self, next: TicketStatus, actor: Actor, note: Option<&str>) -> Result<Update, String> {
        if !self.status.can_transition_to(next) {
            return Err(format!("Cannot move ticket from {} to {}", self.status, next));
        }
        if next == TicketStatus::Open && self.assigned_to.is_some() {
            return Err("An assigned ticket cannot return to Open".to_string());
        }
        if matches!(next, TicketStatus::InProgress | TicketStatus::UnderReview) && self.assigned_to.is_none() {
            return Err(format!("Ticket must be assigned before moving to {}", next));
        }

        Ok(Update::status_change(actor, self.status, next, note))
    }

    /// Applies a status change previously validated by `plan_status_change`
    pub fn apply_status_change(&mut self, next: TicketStatus, update: Update) -> Result<TicketEvent, String> {
        if !self.status.can_transition_to(next) {
            return Err(format!("Cannot move ticket from {} to {}", self.status, next));
        }

        let from = self.status;
        self.status = next;
        self.resolved_at = if next.is_terminal() {
            self.resolved_at.or(Some(update.created_at))
        } else {
            None
        };
        self.touch(update);

        if next.is_terminal() {
            Ok(TicketEvent::Resolved {
                ticket_id: self.id,
                agent_id: self.assigned_to,
                resolved_at: self.resolved_at.unwrap_or(self.updated_at),
            })
        } else {
            Ok(TicketEvent::StatusChanged {
                ticket_id: self.id,
                from,
                to: next,
            })
        }
    }

    fn touch(&mut self, update: Update) {
        self.updated_at = update.created_at;
        self.updates.push(update);
    }

    // ===== Getters =====

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn organization(&self) -> Option<&str> {
        self.organization.as_deref()
    }

    pub fn created_by(&self) -> Option<Uuid> {
        self.created_by
    }

    pub fn status(&self) -> TicketStatus {
        self.status
    }

    pub fn assigned_to(&self) -> Option<Uuid> {
        self.assigned_to
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_to.is_some()
    }

    /// Counts toward the assignee's active load
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn updates(&self) -> &[Update] {
        &self.updates
    }

    /// Reconstructs a Ticket from persistence layer data
    ///
    /// # Note
    /// Only to be used by repository implementations for data reconstruction.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persistence(
        id: Uuid,
        title: String,
        description: String,
        category: String,
        priority: Priority,
        organization: Option<String>,
        created_by: Option<Uuid>,
        status: TicketStatus,
        assigned_to: Option<Uuid>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        resolved_at: Option<DateTime<Utc>>,
        updates: Vec<Update>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            category,
            priority,
            organization,
            created_by,
            status,
            assigned_to,
            created_at,
            updated_at,
            resolved_at,
            updates,
        }
    }
}
