//! Ticket Desk API Library
//!
//! Ticket assignment and agent availability engine: domain model,
//! assignment policy and executor, the reassignment worker, and the
//! Postgres, in-memory and HTTP adapters they run on.

pub mod api;
pub mod assignment;
pub mod auth;
pub mod config;
pub mod domain;
pub mod events;
pub mod infrastructure;
