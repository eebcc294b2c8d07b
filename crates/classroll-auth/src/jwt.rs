//! Credential verification.
//!
//! The enrollment core never issues or revokes credentials; it only needs
//! to turn a presented bearer token into an [`Actor`]. [`create_access_token`]
//! exists for the session layer that fronts this service and for tests.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use classroll_config::JwtConfig;
use classroll_core::CoreError;
use classroll_models::{Actor, Role, UserId};

use crate::claims::Claims;

/// Mint an access token for `user_id` holding `role`.
pub fn create_access_token(
    user_id: UserId,
    role: Role,
    jwt_config: &JwtConfig,
) -> Result<String, CoreError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp: (now + jwt_config.access_token_expiry).max(0) as usize,
        iat: now as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "failed to encode access token");
        CoreError::Unavailable
    })
}

pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, CoreError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| CoreError::unauthorized("Invalid or expired token"))
}

/// Resolve a presented credential into the acting user and their role.
pub fn authorize(token: &str, jwt_config: &JwtConfig) -> Result<Actor, CoreError> {
    let claims = verify_token(token, jwt_config)?;
    let user_id = claims
        .sub
        .parse::<UserId>()
        .map_err(|_| CoreError::unauthorized("Invalid user ID in token"))?;

    Ok(Actor::new(user_id, claims.role))
}
