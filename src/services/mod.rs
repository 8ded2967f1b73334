//! Business logic services

pub mod accounts;
pub mod authors;
pub mod books;
pub mod images;
pub mod loans;
pub mod members;
pub mod staffs;

use sqlx::{Pool, Postgres};

use crate::config::AppConfig;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub accounts: accounts::AccountsService,
    pub staffs: staffs::StaffsService,
    pub members: members::MembersService,
    pub authors: authors::AuthorsService,
    pub books: books::BooksService,
    pub loans: loans::LoansService,
    pub images: images::ImageStore,
}

impl Services {
    /// Create all services over the given pool
    pub fn new(pool: Pool<Postgres>, config: &AppConfig) -> Self {
        let images = images::ImageStore::new(&config.uploads);
        Self {
            accounts: accounts::AccountsService::new(pool.clone(), config.auth.clone()),
            staffs: staffs::StaffsService::new(pool.clone(), images.clone()),
            members: members::MembersService::new(pool.clone(), images.clone()),
            authors: authors::AuthorsService::new(pool.clone()),
            books: books::BooksService::new(pool.clone(), images.clone()),
            loans: loans::LoansService::new(pool),
            images,
        }
    }
}
