//! Book catalog endpoints

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
    models::book::{BookQuery, BookRequest, BookResponse},
    repository::PageRequest,
};

/// List books with filters and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(BookQuery, PageRequest),
    responses(
        (status = 200, description = "Page of books (enveloped, with meta)", body = [BookResponse]),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BookQuery>,
    Query(page): Query<PageRequest>,
) -> AppResult<Json<WebResponse<Vec<BookResponse>>>> {
    claims.require_staff()?;
    let books = state.services.books.list(&query, page).await?;
    Ok(WebResponse::paged(books))
}

/// Get book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book with author names (enveloped)", body = BookResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<WebResponse<BookResponse>>> {
    claims.require_staff()?;
    let book = state.services.books.get(id).await?;
    Ok(WebResponse::ok(book))
}

/// Add a book with its authors and an optional cover
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body(content = BookRequest, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Book created (enveloped)", body = BookResponse),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<Created<BookResponse>> {
    claims.require_staff()?;

    let mut form = MultipartForm::collect(multipart).await?;
    let image = form.image();
    let request = form.into_book()?;

    let book = state.services.books.create(request, image).await?;
    Ok(WebResponse::created(format!("/api/books/{}", book.id), book))
}

/// Replace a book and its author links
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body(content = BookRequest, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Book updated (enveloped)", body = BookResponse),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<WebResponse<BookResponse>>> {
    claims.require_staff()?;

    let mut form = MultipartForm::collect(multipart).await?;
    let image = form.image();
    let request = form.into_book()?;

    let book = state.services.books.update(id, request, image).await?;
    Ok(WebResponse::ok(book))
}

/// Delete a book, its author links and its loans
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;
    state.services.books.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
