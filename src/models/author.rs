//! Author model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Author row, with the number of linked books when loaded for display
#[derive(Debug, Clone, FromRow)]
pub struct Author {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    #[sqlx(default)]
    pub book_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Author {
    pub fn new(name: String, email: Option<String>) -> Self {
        let now = Utc::now();
        Author {
            id: Uuid::new_v4(),
            name,
            email,
            book_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorResponse {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub book_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Author> for AuthorResponse {
    fn from(author: Author) -> Self {
        AuthorResponse {
            id: author.id,
            name: author.name,
            email: author.email,
            book_count: author.book_count,
            created_at: author.created_at,
            updated_at: author.updated_at,
        }
    }
}

/// Author list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AuthorQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Minimum number of linked books
    pub book_count: Option<i64>,
}

/// Create or replace an author
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AuthorRequest {
    #[validate(length(min = 3, max = 100, message = "Name must be between 3 and 100 characters"))]
    pub name: String,
    #[validate(
        length(min = 3, max = 100, message = "Email must be between 3 and 100 characters"),
        email(message = "Invalid email format")
    )]
    pub email: Option<String>,
}

impl AuthorRequest {
    /// Blank emails are treated as absent
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_optional() {
        let request = AuthorRequest {
            name: "Ursula Le Guin".to_string(),
            email: Some("   ".to_string()),
        }
        .normalized();
        assert_eq!(request.email, None);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn invalid_email_and_short_name_are_reported() {
        let request = AuthorRequest {
            name: "Al".to_string(),
            email: Some("not-an-email".to_string()),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
    }
}
