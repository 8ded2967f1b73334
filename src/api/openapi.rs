//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{account, authors, books, health, loans, members, staffs};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ELibrary API",
        version = "1.0.0",
        description = "Library management REST API: staffs, members, authors, books and loans"
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Account
        account::login,
        account::current,
        // Staffs
        staffs::list_staffs,
        staffs::get_staff,
        staffs::create_staff,
        staffs::update_staff,
        staffs::delete_staff,
        // Members
        members::list_members,
        members::get_member,
        members::create_member,
        members::update_member,
        members::delete_member,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Loans
        loans::list_loans,
        loans::get_loan,
        loans::create_loan,
        loans::update_loan,
        loans::delete_loan,
    ),
    components(
        schemas(
            crate::models::enums::AccessLevel,
            crate::models::enums::Category,
            // Account
            crate::models::staff::LoginRequest,
            crate::models::staff::LoginResponse,
            // Staffs
            crate::models::staff::StaffResponse,
            crate::models::staff::StaffQuery,
            crate::models::staff::CreateStaff,
            crate::models::staff::UpdateStaff,
            // Members
            crate::models::member::MemberResponse,
            crate::models::member::MemberQuery,
            crate::models::member::MemberRequest,
            // Authors
            crate::models::author::AuthorResponse,
            crate::models::author::AuthorQuery,
            crate::models::author::AuthorRequest,
            // Books
            crate::models::book::BookResponse,
            crate::models::book::BookQuery,
            crate::models::book::BookRequest,
            // Loans
            crate::models::loan::LoanResponse,
            crate::models::loan::LoanQuery,
            crate::models::loan::CreateLoan,
            crate::models::loan::UpdateLoan,
            // Envelope and errors
            crate::api::response::MetaResponse,
            crate::error::ErrorResponse,
            crate::error::FieldErrors,
            // Health
            health::HealthResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "account", description = "Login and current account"),
        (name = "staffs", description = "Staff management"),
        (name = "members", description = "Member management"),
        (name = "authors", description = "Author management"),
        (name = "books", description = "Book catalog"),
        (name = "loans", description = "Loan management")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_resource_is_documented() {
        let doc = ApiDoc::openapi();
        for path in ["/staffs", "/members/{id}", "/authors", "/books/{id}", "/loans", "/account/login"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
