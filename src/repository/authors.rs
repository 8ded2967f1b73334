//! Authors repository for database operations

use chrono::Utc;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    pagination::{contains_pattern, filter_text, Conditions, Page, PageRequest},
    UnitOfWork,
};
use crate::{
    error::{AppError, AppResult},
    models::author::{Author, AuthorQuery},
};

const BOOK_COUNT: &str = "(SELECT COUNT(*) FROM books_authors ba WHERE ba.author_id = a.id)";

pub struct AuthorsRepository<'a> {
    uow: &'a mut UnitOfWork,
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &AuthorQuery) {
    let mut conditions = Conditions::new();

    if let Some(name) = filter_text(&query.name) {
        conditions
            .next(builder)
            .push("a.name ILIKE ")
            .push_bind(contains_pattern(name));
    }
    if let Some(email) = filter_text(&query.email) {
        conditions
            .next(builder)
            .push("a.email ILIKE ")
            .push_bind(contains_pattern(email));
    }
    if let Some(book_count) = query.book_count {
        conditions
            .next(builder)
            .push(BOOK_COUNT)
            .push(" >= ")
            .push_bind(book_count);
    }
}

impl<'a> AuthorsRepository<'a> {
    pub fn new(uow: &'a mut UnitOfWork) -> Self {
        Self { uow }
    }

    /// Get author by ID, with its book count
    pub async fn get_by_id(&mut self, id: Uuid) -> AppResult<Author> {
        let conn = self.uow.connection().await?;
        sqlx::query_as::<_, Author>(&format!(
            "SELECT a.*, {} AS book_count FROM authors a WHERE a.id = $1",
            BOOK_COUNT
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    /// Filtered page of authors, newest first
    pub async fn get_paged(&mut self, query: &AuthorQuery, page: PageRequest) -> AppResult<Page<Author>> {
        let conn = self.uow.connection().await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM authors a");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

        let mut select = QueryBuilder::new(format!("SELECT a.*, {} AS book_count FROM authors a", BOOK_COUNT));
        push_filters(&mut select, query);
        select.push(" ORDER BY a.created_at DESC");
        page.push_limit(&mut select);
        let authors = select.build_query_as::<Author>().fetch_all(&mut *conn).await?;

        Ok(Page::new(authors, total, page))
    }

    pub async fn add(&mut self, author: &Author) -> AppResult<()> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO authors (id, name, email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(author.id)
        .bind(&author.name)
        .bind(&author.email)
        .bind(author.created_at)
        .bind(author.updated_at)
        .execute(conn)
        .await?;
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    pub async fn update(&mut self, author: &mut Author) -> AppResult<()> {
        author.updated_at = Utc::now();
        let conn = self.uow.connection().await?;
        let result = sqlx::query("UPDATE authors SET name = $2, email = $3, updated_at = $4 WHERE id = $1")
            .bind(author.id)
            .bind(&author.name)
            .bind(&author.email)
            .bind(author.updated_at)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Author with id {} not found", author.id)));
        }
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    /// Delete an author; its book links go with it
    pub async fn remove(&mut self, id: Uuid) -> AppResult<()> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    /// Ids from `ids` that match no author
    pub async fn missing_ids(&mut self, ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.uow.connection().await?;
        let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM authors WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(conn)
            .await?;
        Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
    }

    /// True when no other author has this name (case-insensitive)
    pub async fn is_name_unique(&mut self, name: &str, exclude_id: Option<Uuid>) -> AppResult<bool> {
        let conn = self.uow.connection().await?;
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM authors WHERE LOWER(name) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude_id)
        .fetch_one(conn)
        .await?;
        Ok(!exists)
    }
}
