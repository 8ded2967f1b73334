//! Loan endpoints

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
    models::loan::{CreateLoan, LoanQuery, LoanResponse, UpdateLoan},
    repository::PageRequest,
};

/// List loans with filters and pagination
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery, PageRequest),
    responses(
        (status = 200, description = "Page of loans (enveloped, with meta)", body = [LoanResponse]),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
    Query(page): Query<PageRequest>,
) -> AppResult<Json<WebResponse<Vec<LoanResponse>>>> {
    claims.require_staff()?;
    let loans = state.services.loans.list(&query, page).await?;
    Ok(WebResponse::paged(loans))
}

#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan (enveloped)", body = LoanResponse),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<WebResponse<LoanResponse>>> {
    claims.require_staff()?;
    let loan = state.services.loans.get(id).await?;
    Ok(WebResponse::ok(loan))
}

/// Lend a book to a member; the book's quantity drops by one
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created (enveloped)", body = LoanResponse),
        (status = 400, description = "Validation failed or book unavailable", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLoan>,
) -> AppResult<Created<LoanResponse>> {
    claims.require_staff()?;
    let loan = state.services.loans.create(request).await?;
    Ok(WebResponse::created(format!("/api/loans/{}", loan.id), loan))
}

/// Update a loan; setting a return date gives the copy back
#[utoipa::path(
    put,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Loan ID")),
    request_body = UpdateLoan,
    responses(
        (status = 200, description = "Loan updated (enveloped)", body = LoanResponse),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn update_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateLoan>,
) -> AppResult<Json<WebResponse<LoanResponse>>> {
    claims.require_staff()?;
    let loan = state.services.loans.update(id, request).await?;
    Ok(WebResponse::ok(loan))
}

#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 204, description = "Loan deleted"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn delete_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;
    state.services.loans.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
