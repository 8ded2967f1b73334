//! Book model and author links

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::enums::Category;

/// Book from database
#[derive(Debug, Clone, FromRow)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub category: Category,
    pub publisher: String,
    pub quantity: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Join row between books and authors
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct BookAuthor {
    pub book_id: Uuid,
    pub author_id: Uuid,
}

/// Linked author as loaded for a book
#[derive(Debug, Clone, FromRow)]
pub struct LinkedAuthor {
    pub book_id: Uuid,
    pub author_id: Uuid,
    pub name: String,
}

/// Book with the names of its authors
#[derive(Debug, Clone)]
pub struct BookWithAuthors {
    pub book: Book,
    pub authors: Vec<LinkedAuthor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub category: Category,
    pub publisher: String,
    pub quantity: i32,
    pub authors: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BookWithAuthors> for BookResponse {
    fn from(value: BookWithAuthors) -> Self {
        let BookWithAuthors { book, authors } = value;
        BookResponse {
            id: book.id,
            title: book.title,
            category: book.category,
            publisher: book.publisher,
            quantity: book.quantity,
            authors: authors.into_iter().map(|a| a.name).collect(),
            image_url: book.image_url,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

/// Book list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    pub title: Option<String>,
    pub category: Option<Category>,
    pub publisher: Option<String>,
    /// Minimum quantity on hand
    pub quantity: Option<i32>,
    /// Matches books having any author whose name contains this value
    pub authors: Option<String>,
}

fn validate_author_ids(ids: &Vec<Uuid>) -> Result<(), ValidationError> {
    if ids.is_empty() {
        return Err(ValidationError::new("required").with_message("At least one author is required".into()));
    }
    let distinct: HashSet<&Uuid> = ids.iter().collect();
    if distinct.len() != ids.len() {
        return Err(ValidationError::new("distinct").with_message("Author ids must be distinct".into()));
    }
    Ok(())
}

/// Create or replace a book (multipart form, image handled separately)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BookRequest {
    #[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters"))]
    pub title: String,
    pub category: Category,
    #[validate(length(min = 3, max = 100, message = "Publisher must be between 3 and 100 characters"))]
    pub publisher: String,
    #[validate(range(min = 1, message = "Quantity must be greater than 0"))]
    pub quantity: i32,
    #[validate(custom(function = "validate_author_ids"))]
    pub author_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BookRequest {
        BookRequest {
            title: "The Dispossessed".to_string(),
            category: Category::Fiction,
            publisher: "Harper & Row".to_string(),
            quantity: 3,
            author_ids: vec![Uuid::new_v4()],
        }
    }

    #[test]
    fn valid_book_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut book = request();
        book.quantity = 0;
        assert!(book.validate().unwrap_err().field_errors().contains_key("quantity"));
    }

    #[test]
    fn author_ids_must_be_present_and_distinct() {
        let mut book = request();
        book.author_ids.clear();
        assert!(book.validate().unwrap_err().field_errors().contains_key("author_ids"));

        let id = Uuid::new_v4();
        let mut book = request();
        book.author_ids = vec![id, id];
        assert!(book.validate().unwrap_err().field_errors().contains_key("author_ids"));
    }
}
