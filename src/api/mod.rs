//! API handlers for ELibrary REST endpoints

pub mod account;
pub mod authors;
pub mod books;
pub mod forms;
pub mod health;
pub mod loans;
pub mod members;
pub mod openapi;
pub mod response;
pub mod staffs;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::{error::AppError, models::staff::StaffClaims, AppState};

/// Extractor for the authenticated staff from the bearer token
pub struct AuthenticatedUser(pub StaffClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let auth = &state.config.auth;
        let claims = StaffClaims::from_token(token, &auth.jwt_secret, &auth.jwt_issuer, &auth.jwt_audience)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}
