use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::auth::jwt::{verify_token, Claims};
use crate::domain::ticket::Actor;

/// Administrator-only extractor
///
/// Usage:
/// ```rust,ignore
/// async fn admin_handler(AdminAuth(claims): AdminAuth) -> Result<String, ApiError> {
///     Ok(format!("Hello admin {}", claims.sub))
/// }
/// ```
pub struct AdminAuth(pub Claims);

/// Optional caller identity
///
/// Requests without an Authorization header are anonymous; a header that
/// is present must still carry a valid token.
pub struct MaybeAuth(pub Option<Claims>);

impl AdminAuth {
    pub fn actor(&self) -> Actor {
        Actor::User(self.0.sub)
    }
}

impl MaybeAuth {
    /// Audit actor for the request; anonymous callers are recorded as the system
    pub fn actor(&self) -> Actor {
        self.0.as_ref().map_or(Actor::System, |claims| Actor::User(claims.sub))
    }
}

fn bearer_claims(parts: &Parts, secret: &str) -> Result<Option<Claims>, ApiError> {
    let Some(auth_header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_header = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Invalid authorization format. Use: Bearer <token>"))?;

    verify_token(token, secret)
        .map(Some)
        .map_err(|e| ApiError::unauthorized(format!("Invalid token: {}", e)))
}

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, &state.jwt_secret)?
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

        if !claims.is_admin() {
            return Err(ApiError::forbidden("Administrator role required"));
        }

        Ok(AdminAuth(claims))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        bearer_claims(parts, &state.jwt_secret).map(MaybeAuth)
    }
}
