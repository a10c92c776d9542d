// Ticket domain module
// Contains the ticket aggregate root, its audit log entries, value objects and domain events

#![allow(clippy::module_inception)]

pub mod events;
pub mod ticket;
pub mod update;
pub mod value_objects;

pub use events::TicketEvent;
pub use ticket::{NewTicket, Ticket};
pub use update::{Actor, AssignmentMetadata, Update};
pub use value_objects::{AssignmentMethod, Priority, TicketStatus, UpdateType};
