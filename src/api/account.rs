//! Login and current-account endpoints

use axum::{extract::State, Json};

use super::{response::WebResponse, AuthenticatedUser};
use crate::{
    error::AppResult,
    models::staff::{LoginRequest, LoginResponse, StaffResponse},
};

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/account/login",
    tag = "account",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued (enveloped)", body = LoginResponse),
        (status = 400, description = "Invalid login attempt", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<WebResponse<LoginResponse>>> {
    let response = state.services.accounts.login(request).await?;
    Ok(WebResponse::ok(response))
}

/// Staff record of the token holder
#[utoipa::path(
    get,
    path = "/account/current",
    tag = "account",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current staff (enveloped)", body = StaffResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn current(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<WebResponse<StaffResponse>>> {
    claims.require_staff()?;
    let staff = state.services.accounts.current(&claims).await?;
    Ok(WebResponse::ok(staff))
}
