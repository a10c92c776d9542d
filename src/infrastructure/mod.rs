// Infrastructure layer module
// Contains database adapters and external service integrations
// Follows Hexagonal Architecture

pub mod notifications;
pub mod queue;
pub mod repositories;
pub mod scoring;
