//! Success envelope shared by every endpoint

use axum::{
    http::{header::LOCATION, StatusCode},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::repository::Page;

/// Pagination metadata of list responses
#[derive(Debug, Serialize, ToSchema)]
pub struct MetaResponse {
    pub current_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_page: i64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl<T> From<&Page<T>> for MetaResponse {
    fn from(page: &Page<T>) -> Self {
        MetaResponse {
            current_page: page.page,
            per_page: page.size,
            total: page.total,
            total_page: page.total_pages(),
            has_previous_page: page.has_previous_page(),
            has_next_page: page.has_next_page(),
        }
    }
}

/// `{ code, status, data, meta? }`
#[derive(Debug, Serialize)]
pub struct WebResponse<T> {
    pub code: u16,
    pub status: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaResponse>,
}

/// 201 with a `Location` header
pub type Created<T> = (StatusCode, [(axum::http::HeaderName, String); 1], Json<WebResponse<T>>);

/// HTTP reason phrase, e.g. "OK" or "Created"
fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

impl<T> WebResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(WebResponse {
            code: StatusCode::OK.as_u16(),
            status: status_text(StatusCode::OK),
            data,
            meta: None,
        })
    }

    pub fn created(location: String, data: T) -> Created<T> {
        (
            StatusCode::CREATED,
            [(LOCATION, location)],
            Json(WebResponse {
                code: StatusCode::CREATED.as_u16(),
                status: status_text(StatusCode::CREATED),
                data,
                meta: None,
            }),
        )
    }
}

impl<T> WebResponse<Vec<T>> {
    pub fn paged(page: Page<T>) -> Json<Self> {
        let meta = MetaResponse::from(&page);
        Json(WebResponse {
            code: StatusCode::OK.as_u16(),
            status: status_text(StatusCode::OK),
            data: page.items,
            meta: Some(meta),
        })
    }
}
