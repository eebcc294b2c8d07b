//! JWT claim structure for access credentials.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use classroll_models::Role;

/// Claims carried by an access token.
///
/// - `sub`: user ID (subject)
/// - `role`: the caller's single role
/// - `exp` / `iat`: expiry and issued-at Unix timestamps
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}
