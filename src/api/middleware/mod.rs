pub mod auth;

pub use auth::{AdminAuth, MaybeAuth};
