//! Author endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{
    response::{Created, WebResponse},
    AuthenticatedUser,
};
use crate::{
    error::AppResult,
    models::author::{AuthorQuery, AuthorRequest, AuthorResponse},
    repository::PageRequest,
};

/// List authors with filters and pagination
#[utoipa::path(
    get,
    path = "/authors",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(AuthorQuery, PageRequest),
    responses(
        (status = 200, description = "Page of authors (enveloped, with meta)", body = [AuthorResponse]),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_authors(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AuthorQuery>,
    Query(page): Query<PageRequest>,
) -> AppResult<Json<WebResponse<Vec<AuthorResponse>>>> {
    claims.require_staff()?;
    let authors = state.services.authors.list(&query, page).await?;
    Ok(WebResponse::paged(authors))
}

#[utoipa::path(
    get,
    path = "/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author with book count (enveloped)", body = AuthorResponse),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<WebResponse<AuthorResponse>>> {
    claims.require_staff()?;
    let author = state.services.authors.get(id).await?;
    Ok(WebResponse::ok(author))
}

#[utoipa::path(
    post,
    path = "/authors",
    tag = "authors",
    security(("bearer_auth" = [])),
    request_body = AuthorRequest,
    responses(
        (status = 201, description = "Author created (enveloped)", body = AuthorResponse),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<AuthorRequest>,
) -> AppResult<Created<AuthorResponse>> {
    claims.require_staff()?;
    let author = state.services.authors.create(request).await?;
    Ok(WebResponse::created(format!("/api/authors/{}", author.id), author))
}

#[utoipa::path(
    put,
    path = "/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Author ID")),
    request_body = AuthorRequest,
    responses(
        (status = 200, description = "Author updated (enveloped)", body = AuthorResponse),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AuthorRequest>,
) -> AppResult<Json<WebResponse<AuthorResponse>>> {
    claims.require_staff()?;
    let author = state.services.authors.update(id, request).await?;
    Ok(WebResponse::ok(author))
}

#[utoipa::path(
    delete,
    path = "/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;
    state.services.authors.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
