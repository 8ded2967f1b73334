//! Book catalog service

use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;
use validator::Validate;

use super::images::{ImageStore, ImageUpload};
use crate::{
    error::{AppResult, FieldErrors},
    models::book::{Book, BookAuthor, BookQuery, BookRequest, BookResponse, BookWithAuthors},
    repository::{Page, PageRequest, UnitOfWork},
};

#[derive(Clone)]
pub struct BooksService {
    pool: Pool<Postgres>,
    images: ImageStore,
}

/// Replace the author links of a book and reload the linked names
async fn replace_authors(uow: &mut UnitOfWork, book_id: Uuid, author_ids: &[Uuid]) -> AppResult<BookWithAuthors> {
    uow.book_authors().remove_by_book(book_id).await?;
    for &author_id in author_ids {
        uow.book_authors().add(BookAuthor { book_id, author_id }).await?;
    }
    uow.books().get_by_id(book_id).await
}

impl BooksService {
    pub fn new(pool: Pool<Postgres>, images: ImageStore) -> Self {
        Self { pool, images }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<BookResponse> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        Ok(uow.books().get_by_id(id).await?.into())
    }

    pub async fn list(&self, query: &BookQuery, page: PageRequest) -> AppResult<Page<BookResponse>> {
        page.check()?;
        let mut uow = UnitOfWork::new(self.pool.clone());
        let books = uow.books().get_paged(query, page).await?.ensure_in_range()?;
        Ok(books.map(BookResponse::from))
    }

    async fn validate(&self, uow: &mut UnitOfWork, request: &BookRequest, image: Option<&ImageUpload>) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if let Err(e) = request.validate() {
            errors.extend_from(&e);
        }
        if let Some(image) = image {
            self.images.check(image, "image", &mut errors);
        }
        for id in uow.authors().missing_ids(&request.author_ids).await? {
            errors.add("author_ids", format!("Author {} does not exist", id));
        }
        errors.into_result()
    }

    /// Create a book and its author links in one transaction
    pub async fn create(&self, request: BookRequest, image: Option<ImageUpload>) -> AppResult<BookResponse> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        self.validate(&mut uow, &request, image.as_ref()).await?;

        let image_url = match image {
            Some(ref image) => Some(self.images.save(image).await?),
            None => None,
        };

        let now = Utc::now();
        let book = Book {
            id: Uuid::new_v4(),
            title: request.title,
            category: request.category,
            publisher: request.publisher,
            quantity: request.quantity,
            image_url,
            created_at: now,
            updated_at: now,
        };

        uow.begin_transaction().await?;
        let result = async {
            uow.books().add(&book).await?;
            replace_authors(&mut uow, book.id, &request.author_ids).await
        }
        .await;

        match uow.finish(result).await {
            Ok(created) => {
                tracing::info!("Created book {} ({})", created.book.title, created.book.id);
                Ok(created.into())
            }
            Err(e) => {
                self.images.remove_opt(book.image_url.as_deref()).await;
                Err(e)
            }
        }
    }

    /// Replace a book's fields and author links; the image is kept when not provided
    pub async fn update(&self, id: Uuid, request: BookRequest, image: Option<ImageUpload>) -> AppResult<BookResponse> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let BookWithAuthors { mut book, .. } = uow.books().get_by_id(id).await?;
        self.validate(&mut uow, &request, image.as_ref()).await?;

        let new_image = match image {
            Some(ref image) => Some(self.images.save(image).await?),
            None => None,
        };
        let old_image = book.image_url.clone();

        book.title = request.title;
        book.category = request.category;
        book.publisher = request.publisher;
        book.quantity = request.quantity;
        if new_image.is_some() {
            book.image_url = new_image.clone();
        }

        uow.begin_transaction().await?;
        let result = async {
            uow.books().update(&mut book).await?;
            replace_authors(&mut uow, book.id, &request.author_ids).await
        }
        .await;

        match uow.finish(result).await {
            Ok(updated) => {
                if new_image.is_some() {
                    self.images.remove_opt(old_image.as_deref()).await;
                }
                tracing::info!("Updated book {}", updated.book.id);
                Ok(updated.into())
            }
            Err(e) => {
                self.images.remove_opt(new_image.as_deref()).await;
                Err(e)
            }
        }
    }

    /// Delete a book with its author links and loans
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let BookWithAuthors { book, .. } = uow.books().get_by_id(id).await?;

        uow.begin_transaction().await?;
        let result = async {
            uow.book_authors().remove_by_book(id).await?;
            uow.books().remove(id).await
        }
        .await;
        uow.finish(result).await?;

        self.images.remove_opt(book.image_url.as_deref()).await;
        tracing::info!("Deleted book {} ({})", book.title, id);
        Ok(())
    }
}
