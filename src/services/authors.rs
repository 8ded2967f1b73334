//! Author management service

use sqlx::{Pool, Postgres};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppResult, FieldErrors},
    models::author::{Author, AuthorQuery, AuthorRequest, AuthorResponse},
    repository::{Page, PageRequest, UnitOfWork},
};

#[derive(Clone)]
pub struct AuthorsService {
    pool: Pool<Postgres>,
}

impl AuthorsService {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<AuthorResponse> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        Ok(uow.authors().get_by_id(id).await?.into())
    }

    pub async fn list(&self, query: &AuthorQuery, page: PageRequest) -> AppResult<Page<AuthorResponse>> {
        page.check()?;
        let mut uow = UnitOfWork::new(self.pool.clone());
        let authors = uow.authors().get_paged(query, page).await?.ensure_in_range()?;
        Ok(authors.map(AuthorResponse::from))
    }

    async fn validate(&self, uow: &mut UnitOfWork, request: &AuthorRequest, exclude_id: Option<Uuid>) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if let Err(e) = request.validate() {
            errors.extend_from(&e);
        }
        if !uow.authors().is_name_unique(&request.name, exclude_id).await? {
            errors.add("name", "Author name already exists");
        }
        errors.into_result()
    }

    pub async fn create(&self, request: AuthorRequest) -> AppResult<AuthorResponse> {
        let request = request.normalized();
        let mut uow = UnitOfWork::new(self.pool.clone());
        self.validate(&mut uow, &request, None).await?;

        let author = Author::new(request.name, request.email);
        uow.authors().add(&author).await?;

        tracing::info!("Created author {} ({})", author.name, author.id);
        Ok(author.into())
    }

    pub async fn update(&self, id: Uuid, request: AuthorRequest) -> AppResult<AuthorResponse> {
        let request = request.normalized();
        let mut uow = UnitOfWork::new(self.pool.clone());
        let mut author = uow.authors().get_by_id(id).await?;
        self.validate(&mut uow, &request, Some(id)).await?;

        author.name = request.name;
        author.email = request.email;
        uow.authors().update(&mut author).await?;

        tracing::info!("Updated author {}", author.id);
        Ok(author.into())
    }

    /// Delete an author; books keep their other authors
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        uow.authors().remove(id).await?;
        tracing::info!("Deleted author {}", id);
        Ok(())
    }
}
