//! Staff management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use uuid::Uuid;

use super::{
    forms::MultipartForm,
    response::{Created, WebResponse},
    AuthenticatedUser,
};
use crate::{
    error::AppResult,
    models::staff::{CreateStaff, StaffQuery, StaffResponse, UpdateStaff},
    repository::PageRequest,
};

/// List staffs with filters and pagination
#[utoipa::path(
    get,
    path = "/staffs",
    tag = "staffs",
    security(("bearer_auth" = [])),
    params(StaffQuery, PageRequest),
    responses(
        (status = 200, description = "Page of staffs (enveloped, with meta)", body = [StaffResponse]),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_staffs(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<StaffQuery>,
    Query(page): Query<PageRequest>,
) -> AppResult<Json<WebResponse<Vec<StaffResponse>>>> {
    claims.require_staff()?;
    let staffs = state.services.staffs.list(&query, page).await?;
    Ok(WebResponse::paged(staffs))
}

/// Get staff by ID
#[utoipa::path(
    get,
    path = "/staffs/{id}",
    tag = "staffs",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Staff ID")),
    responses(
        (status = 200, description = "Staff (enveloped)", body = StaffResponse),
        (status = 404, description = "Staff not found")
    )
)]
pub async fn get_staff(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<WebResponse<StaffResponse>>> {
    claims.require_staff()?;
    let staff = state.services.staffs.get(id).await?;
    Ok(WebResponse::ok(staff))
}

/// Create a staff account (administrators only)
#[utoipa::path(
    post,
    path = "/staffs",
    tag = "staffs",
    security(("bearer_auth" = [])),
    request_body(content = CreateStaff, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Staff created (enveloped)", body = StaffResponse),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrator role required")
    )
)]
pub async fn create_staff(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<Created<StaffResponse>> {
    claims.require_admin()?;

    let mut form = MultipartForm::collect(multipart).await?;
    let image = form.image();
    let request = form.into_create_staff()?;

    let staff = state.services.staffs.create(request, image).await?;
    Ok(WebResponse::created(format!("/api/staffs/{}", staff.id), staff))
}

/// Replace a staff account (administrators only)
#[utoipa::path(
    put,
    path = "/staffs/{id}",
    tag = "staffs",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Staff ID")),
    request_body(content = UpdateStaff, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Staff updated (enveloped)", body = StaffResponse),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 404, description = "Staff not found")
    )
)]
pub async fn update_staff(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<WebResponse<StaffResponse>>> {
    claims.require_admin()?;

    let mut form = MultipartForm::collect(multipart).await?;
    let image = form.image();
    let request = form.into_update_staff()?;

    let staff = state.services.staffs.update(id, request, image).await?;
    Ok(WebResponse::ok(staff))
}

/// Delete a staff account (administrators only)
#[utoipa::path(
    delete,
    path = "/staffs/{id}",
    tag = "staffs",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Staff ID")),
    responses(
        (status = 204, description = "Staff deleted"),
        (status = 404, description = "Staff not found")
    )
)]
pub async fn delete_staff(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.staffs.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
