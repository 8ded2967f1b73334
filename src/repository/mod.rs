//! Repository layer for database operations
//!
//! Every request works through one [`UnitOfWork`]: a single database session
//! (a pooled connection acquired on first use, or an open transaction) that
//! all repository handles share.

pub mod authors;
pub mod book_authors;
pub mod books;
pub mod loans;
pub mod members;
pub mod pagination;
pub mod phones;
pub mod staffs;

use sqlx::{pool::PoolConnection, PgConnection, Pool, Postgres, Transaction};

use crate::error::{AppError, AppResult};

pub use pagination::{Page, PageRequest};

enum Session {
    Idle,
    Connection(PoolConnection<Postgres>),
    Transaction(Transaction<'static, Postgres>),
}

/// Session-scoped aggregate of repositories sharing one transaction boundary
pub struct UnitOfWork {
    pool: Pool<Postgres>,
    session: Session,
    written: u64,
}

impl UnitOfWork {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            session: Session::Idle,
            written: 0,
        }
    }

    pub fn in_transaction(&self) -> bool {
        matches!(self.session, Session::Transaction(_))
    }

    /// Open a transaction; later repository calls run inside it
    pub async fn begin_transaction(&mut self) -> AppResult<()> {
        if self.in_transaction() {
            return Err(AppError::Internal("A transaction is already open".to_string()));
        }
        // Release the plain connection first so the transaction can reuse it.
        self.session = Session::Idle;
        let tx = self.pool.begin().await?;
        self.session = Session::Transaction(tx);
        tracing::trace!("Transaction opened");
        Ok(())
    }

    pub async fn commit(&mut self) -> AppResult<()> {
        match std::mem::replace(&mut self.session, Session::Idle) {
            Session::Transaction(tx) => {
                tx.commit().await?;
                tracing::trace!("Transaction committed");
                Ok(())
            }
            other => {
                self.session = other;
                Err(AppError::Internal("No open transaction to commit".to_string()))
            }
        }
    }

    pub async fn rollback(&mut self) -> AppResult<()> {
        match std::mem::replace(&mut self.session, Session::Idle) {
            Session::Transaction(tx) => {
                tx.rollback().await?;
                tracing::debug!("Transaction rolled back");
                Ok(())
            }
            other => {
                self.session = other;
                Err(AppError::Internal("No open transaction to roll back".to_string()))
            }
        }
    }

    /// Commit when `result` is `Ok`, roll back and hand the error on otherwise
    pub async fn finish<T>(&mut self, result: AppResult<T>) -> AppResult<T> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_error) = self.rollback().await {
                    tracing::error!("Rollback failed: {}", rollback_error);
                }
                Err(e)
            }
        }
    }

    /// Rows written since the previous call.
    ///
    /// Statements reach the database as they are issued, so there is nothing
    /// left to flush; the transaction stays open.
    pub fn save_changes(&mut self) -> u64 {
        std::mem::take(&mut self.written)
    }

    /// Connection of the current session, acquired from the pool on first use
    pub(crate) async fn connection(&mut self) -> AppResult<&mut PgConnection> {
        if let Session::Idle = self.session {
            self.session = Session::Connection(self.pool.acquire().await?);
        }
        match &mut self.session {
            Session::Connection(conn) => Ok(&mut **conn),
            Session::Transaction(tx) => Ok(&mut **tx),
            Session::Idle => Err(AppError::Internal("Database session unavailable".to_string())),
        }
    }

    pub(crate) fn record_written(&mut self, rows: u64) {
        self.written += rows;
    }

    pub fn staffs(&mut self) -> staffs::StaffsRepository<'_> {
        staffs::StaffsRepository::new(self)
    }

    pub fn members(&mut self) -> members::MembersRepository<'_> {
        members::MembersRepository::new(self)
    }

    pub fn phones(&mut self) -> phones::PhonesRepository<'_> {
        phones::PhonesRepository::new(self)
    }

    pub fn authors(&mut self) -> authors::AuthorsRepository<'_> {
        authors::AuthorsRepository::new(self)
    }

    pub fn books(&mut self) -> books::BooksRepository<'_> {
        books::BooksRepository::new(self)
    }

    pub fn book_authors(&mut self) -> book_authors::BookAuthorsRepository<'_> {
        book_authors::BookAuthorsRepository::new(self)
    }

    pub fn loans(&mut self) -> loans::LoansRepository<'_> {
        loans::LoansRepository::new(self)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sqlx::postgres::PgPoolOptions;

    use super::*;

    /// Needs a reachable database: `DATABASE_URL=... cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn transaction_reuses_the_single_pooled_connection() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&url)
            .await
            .unwrap();

        let mut uow = UnitOfWork::new(pool);
        // Validation reads run on a plain connection before the write begins
        sqlx::query("SELECT 1").execute(uow.connection().await.unwrap()).await.unwrap();

        uow.begin_transaction().await.unwrap();
        assert!(uow.in_transaction());
        sqlx::query("SELECT 1").execute(uow.connection().await.unwrap()).await.unwrap();
        uow.commit().await.unwrap();
        assert!(!uow.in_transaction());
    }

    #[tokio::test]
    async fn commit_without_transaction_is_an_error() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let mut uow = UnitOfWork::new(pool);
        assert!(matches!(uow.commit().await, Err(AppError::Internal(_))));
        assert!(matches!(uow.rollback().await, Err(AppError::Internal(_))));
        assert_eq!(uow.save_changes(), 0);
    }
}
