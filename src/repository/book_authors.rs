//! Book / author links

use uuid::Uuid;

use super::UnitOfWork;
use crate::{
    error::AppResult,
    models::book::{BookAuthor, LinkedAuthor},
};

pub struct BookAuthorsRepository<'a> {
    uow: &'a mut UnitOfWork,
}

impl<'a> BookAuthorsRepository<'a> {
    pub fn new(uow: &'a mut UnitOfWork) -> Self {
        Self { uow }
    }

    /// Authors linked to the given books, ordered by name
    pub async fn get_by_book_ids(&mut self, book_ids: &[Uuid]) -> AppResult<Vec<LinkedAuthor>> {
        if book_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.uow.connection().await?;
        let authors = sqlx::query_as::<_, LinkedAuthor>(
            r#"
            SELECT ba.book_id, ba.author_id, a.name
            FROM books_authors ba
            JOIN authors a ON a.id = ba.author_id
            WHERE ba.book_id = ANY($1)
            ORDER BY a.name
            "#,
        )
        .bind(book_ids)
        .fetch_all(conn)
        .await?;
        Ok(authors)
    }

    pub async fn add(&mut self, link: BookAuthor) -> AppResult<()> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query("INSERT INTO books_authors (book_id, author_id) VALUES ($1, $2)")
            .bind(link.book_id)
            .bind(link.author_id)
            .execute(conn)
            .await?;
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    /// Drop every author link of a book
    pub async fn remove_by_book(&mut self, book_id: Uuid) -> AppResult<u64> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query("DELETE FROM books_authors WHERE book_id = $1")
            .bind(book_id)
            .execute(conn)
            .await?;
        self.uow.record_written(result.rows_affected());
        Ok(result.rows_affected())
    }
}
