// Agent domain module
// Agent aggregate, availability value objects and the availability state machine

#![allow(clippy::module_inception)]

pub mod agent;
pub mod availability;
pub mod value_objects;

pub use agent::Agent;
pub use availability::compute_availability;
pub use value_objects::{Availability, Email};
