// Availability state machine
//
// Pure mapping from (active ticket count, manual override) to availability.
// Re-evaluated after every assignment, every transition into Resolved/Closed,
// and every administrator override.

use super::value_objects::Availability;

/// Computes an agent's availability from its current workload
///
/// `manual_override` is the administrator's last explicit setting. Only
/// `Offline` is sticky: an offline agent stays offline whatever its load.
/// Any other override is re-derived from the ticket count.
///
/// # Example
/// ```
/// use ticketdesk_api::domain::agent::availability::compute_availability;
/// use ticketdesk_api::domain::agent::value_objects::Availability;
///
/// assert_eq!(compute_availability(0, None), Availability::Available);
/// assert_eq!(compute_availability(3, None), Availability::Busy);
/// assert_eq!(compute_availability(0, Some(Availability::Offline)), Availability::Offline);
/// ```
pub fn compute_availability(active_ticket_count: u64, manual_override: Option<Availability>) -> Availability {
    if manual_override == Some(Availability::Offline) {
        return Availability::Offline;
    }

    if active_ticket_count == 0 {
        Availability::Available
    } else {
        Availability::Busy
    }
}

/// Override implied by an agent's persisted availability
///
/// Automatic processes only ever write available/busy, so a stored `Offline`
/// can only have come from an administrator.
pub fn override_from_stored(stored: Availability) -> Option<Availability> {
    match stored {
        Availability::Offline => Some(Availability::Offline),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_agent_is_available() {
        assert_eq!(compute_availability(0, None), Availability::Available);
    }

    #[test]
    fn loaded_agent_is_busy() {
        assert_eq!(compute_availability(1, None), Availability::Busy);
        assert_eq!(compute_availability(42, None), Availability::Busy);
    }

    #[test]
    fn offline_override_always_wins() {
        assert_eq!(compute_availability(0, Some(Availability::Offline)), Availability::Offline);
        assert_eq!(compute_availability(5, Some(Availability::Offline)), Availability::Offline);
    }

    #[test]
    fn non_offline_overrides_are_rederived() {
        assert_eq!(compute_availability(2, Some(Availability::Available)), Availability::Busy);
        assert_eq!(compute_availability(0, Some(Availability::Busy)), Availability::Available);
    }

    #[test]
    fn only_stored_offline_is_an_override() {
        assert_eq!(override_from_stored(Availability::Offline), Some(Availability::Offline));
        assert_eq!(override_from_stored(Availability::Busy), None);
        assert_eq!(override_from_stored(Availability::Available), None);
    }
}
