use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use classroll_auth::authorize;
use classroll_core::{AppError, CoreError};
use classroll_models::Actor;

use crate::state::AppState;

/// Extractor that validates the bearer token and yields the calling [`Actor`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Actor);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| CoreError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| CoreError::unauthorized("Invalid authorization header format"))?;

        let actor = authorize(token, &state.jwt_config)?;

        Ok(AuthUser(actor))
    }
}
