//! Member management endpoints

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
    models::member::{MemberQuery, MemberRequest, MemberResponse},
    repository::PageRequest,
};

/// List members with filters and pagination
#[utoipa::path(
    get,
    path = "/members",
    tag = "members",
    security(("bearer_auth" = [])),
    params(MemberQuery, PageRequest),
    responses(
        (status = 200, description = "Page of members (enveloped, with meta)", body = [MemberResponse]),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_members(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<MemberQuery>,
    Query(page): Query<PageRequest>,
) -> AppResult<Json<WebResponse<Vec<MemberResponse>>>> {
    claims.require_staff()?;
    let members = state.services.members.list(&query, page).await?;
    Ok(WebResponse::paged(members))
}

/// Get member by ID
#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member with phones (enveloped)", body = MemberResponse),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<WebResponse<MemberResponse>>> {
    claims.require_staff()?;
    let member = state.services.members.get(id).await?;
    Ok(WebResponse::ok(member))
}

/// Register a member with phones and an optional photo
#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    security(("bearer_auth" = [])),
    request_body(content = MemberRequest, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Member created (enveloped)", body = MemberResponse),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_member(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<Created<MemberResponse>> {
    claims.require_staff()?;

    let mut form = MultipartForm::collect(multipart).await?;
    let image = form.image();
    let request = form.into_member()?;

    let member = state.services.members.create(request, image).await?;
    Ok(WebResponse::created(format!("/api/members/{}", member.id), member))
}

/// Replace a member and its phones
#[utoipa::path(
    put,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Member ID")),
    request_body(content = MemberRequest, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Member updated (enveloped)", body = MemberResponse),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 404, description = "Member not found")
    )
)]
pub async fn update_member(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<WebResponse<MemberResponse>>> {
    claims.require_staff()?;

    let mut form = MultipartForm::collect(multipart).await?;
    let image = form.image();
    let request = form.into_member()?;

    let member = state.services.members.update(id, request, image).await?;
    Ok(WebResponse::ok(member))
}

/// Delete a member, its phones and its loans
#[utoipa::path(
    delete,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Member ID")),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn delete_member(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;
    state.services.members.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
