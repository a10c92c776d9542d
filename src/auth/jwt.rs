// JWT token creation and verification
// Tokens carry the caller's role and expire after 8 hours

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role granted by a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
}

/// JWT claims structure
///
/// # Fields
/// * `sub` - Subject (user or agent id)
/// * `role` - Role used for route authorization
/// * `exp` - Expiry time (seconds since epoch)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Creates a JWT token
///
/// # Token Properties
/// - Expires after 8 hours
/// - Signed with HS256 algorithm
///
/// # Example
/// ```
/// use ticketdesk_api::auth::jwt::{create_token, Role};
/// use uuid::Uuid;
///
/// let token = create_token(Uuid::new_v4(), Role::Admin, "your-secret-key").expect("valid token");
/// assert!(!token.is_empty());
/// ```
pub fn create_token(subject: Uuid, role: Role, secret: &str) -> Result<String, String> {
    let expiry = Utc::now() + Duration::hours(8);
    let claims = Claims {
        sub: subject,
        role,
        exp: expiry.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| e.to_string())
}

/// Verifies and decodes a JWT token
///
/// # Returns
/// * `Ok(Claims)` - The decoded claims if token is valid
/// * `Err(String)` - If token is invalid or expired
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
