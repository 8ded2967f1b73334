//! Books repository for database operations

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    pagination::{contains_pattern, filter_text, Conditions, Page, PageRequest},
    UnitOfWork,
};
use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, BookWithAuthors, LinkedAuthor},
};

pub struct BooksRepository<'a> {
    uow: &'a mut UnitOfWork,
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BookQuery) {
    let mut conditions = Conditions::new();

    if let Some(title) = filter_text(&query.title) {
        conditions
            .next(builder)
            .push("b.title ILIKE ")
            .push_bind(contains_pattern(title));
    }
    if let Some(category) = query.category {
        conditions.next(builder).push("b.category = ").push_bind(category);
    }
    if let Some(publisher) = filter_text(&query.publisher) {
        conditions
            .next(builder)
            .push("b.publisher ILIKE ")
            .push_bind(contains_pattern(publisher));
    }
    if let Some(quantity) = query.quantity {
        conditions.next(builder).push("b.quantity >= ").push_bind(quantity);
    }
    if let Some(author) = filter_text(&query.authors) {
        conditions
            .next(builder)
            .push(
                "EXISTS (SELECT 1 FROM books_authors ba JOIN authors a ON a.id = ba.author_id \
                 WHERE ba.book_id = b.id AND a.name ILIKE ",
            )
            .push_bind(contains_pattern(author))
            .push(")");
    }
}

fn with_authors(books: Vec<Book>, authors: Vec<LinkedAuthor>) -> Vec<BookWithAuthors> {
    let mut by_book: HashMap<Uuid, Vec<LinkedAuthor>> = HashMap::new();
    for author in authors {
        by_book.entry(author.book_id).or_default().push(author);
    }
    books
        .into_iter()
        .map(|book| {
            let authors = by_book.remove(&book.id).unwrap_or_default();
            BookWithAuthors { book, authors }
        })
        .collect()
}

impl<'a> BooksRepository<'a> {
    pub fn new(uow: &'a mut UnitOfWork) -> Self {
        Self { uow }
    }

    /// Get book by ID, without its authors
    pub async fn find(&mut self, id: Uuid) -> AppResult<Option<Book>> {
        let conn = self.uow.connection().await?;
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(book)
    }

    /// Get book by ID, with author names
    pub async fn get_by_id(&mut self, id: Uuid) -> AppResult<BookWithAuthors> {
        let book = self
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        let authors = self.uow.book_authors().get_by_book_ids(&[id]).await?;
        Ok(BookWithAuthors { book, authors })
    }

    /// Filtered page of books with their authors, newest first
    pub async fn get_paged(&mut self, query: &BookQuery, page: PageRequest) -> AppResult<Page<BookWithAuthors>> {
        let conn = self.uow.connection().await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM books b");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

        let mut select = QueryBuilder::new("SELECT b.* FROM books b");
        push_filters(&mut select, query);
        select.push(" ORDER BY b.created_at DESC");
        page.push_limit(&mut select);
        let books = select.build_query_as::<Book>().fetch_all(&mut *conn).await?;

        let ids: Vec<Uuid> = books.iter().map(|b| b.id).collect();
        let authors = self.uow.book_authors().get_by_book_ids(&ids).await?;

        Ok(Page::new(with_authors(books, authors), total, page))
    }

    pub async fn add(&mut self, book: &Book) -> AppResult<()> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO books (id, title, category, publisher, quantity, image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(book.category)
        .bind(&book.publisher)
        .bind(book.quantity)
        .bind(&book.image_url)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(conn)
        .await?;
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    pub async fn update(&mut self, book: &mut Book) -> AppResult<()> {
        book.updated_at = Utc::now();
        let conn = self.uow.connection().await?;
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $2, category = $3, publisher = $4, quantity = $5, image_url = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(book.category)
        .bind(&book.publisher)
        .bind(book.quantity)
        .bind(&book.image_url)
        .bind(book.updated_at)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", book.id)));
        }
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    /// Delete a book; author links and loans go with it
    pub async fn remove(&mut self, id: Uuid) -> AppResult<()> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    pub async fn exists(&mut self, id: Uuid) -> AppResult<bool> {
        let conn = self.uow.connection().await?;
        let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(conn)
            .await?;
        Ok(exists)
    }

    /// Take one copy out; `false` when the book has none left
    pub async fn decrement_quantity(&mut self, id: Uuid) -> AppResult<bool> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query(
            "UPDATE books SET quantity = quantity - 1, updated_at = NOW() WHERE id = $1 AND quantity > 0",
        )
        .bind(id)
        .execute(conn)
        .await?;
        self.uow.record_written(result.rows_affected());
        Ok(result.rows_affected() == 1)
    }

    /// Put one copy back
    pub async fn increment_quantity(&mut self, id: Uuid) -> AppResult<()> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query("UPDATE books SET quantity = quantity + 1, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        self.uow.record_written(result.rows_affected());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::Category;

    #[test]
    fn filters_cover_every_book_field() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT b.* FROM books b");
        let query = BookQuery {
            title: Some("dune".to_string()),
            category: Some(Category::Fiction),
            publisher: Some("   ".to_string()),
            quantity: Some(2),
            authors: Some("herbert".to_string()),
        };
        push_filters(&mut builder, &query);
        let sql = builder.sql();
        assert!(sql.contains("WHERE b.title ILIKE $1 AND b.category = $2 AND b.quantity >= $3"));
        assert!(sql.contains("a.name ILIKE $4)"));
        assert!(!sql.contains("publisher"));
    }

    #[test]
    fn books_without_links_get_no_authors() {
        let now = Utc::now();
        let book = Book {
            id: Uuid::new_v4(),
            title: "Dune".to_string(),
            category: Category::Fiction,
            publisher: "Chilton".to_string(),
            quantity: 1,
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        let grouped = with_authors(vec![book], Vec::new());
        assert!(grouped[0].authors.is_empty());
    }
}
