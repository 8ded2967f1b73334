//! Loans repository for database operations

use chrono::Utc;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    pagination::{contains_pattern, filter_text, Conditions, Page, PageRequest},
    UnitOfWork,
};
use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanDetails, LoanQuery},
};

const DETAILS_SELECT: &str = r#"
    SELECT l.id, l.loan_date, l.return_date, l.member_id, l.book_id,
           b.title AS book_title, m.member_number,
           l.created_at, l.updated_at
    FROM loans l
    JOIN books b ON b.id = l.book_id
    JOIN members m ON m.id = l.member_id
"#;

const DETAILS_COUNT: &str = r#"
    SELECT COUNT(*)
    FROM loans l
    JOIN books b ON b.id = l.book_id
    JOIN members m ON m.id = l.member_id
"#;

pub struct LoansRepository<'a> {
    uow: &'a mut UnitOfWork,
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &LoanQuery) {
    let mut conditions = Conditions::new();

    if let Some(loan_date) = query.loan_date {
        conditions.next(builder).push("l.loan_date >= ").push_bind(loan_date);
    }
    if let Some(return_date) = query.return_date {
        conditions.next(builder).push("l.return_date >= ").push_bind(return_date);
    }
    if let Some(title) = filter_text(&query.book_title) {
        conditions
            .next(builder)
            .push("b.title ILIKE ")
            .push_bind(contains_pattern(title));
    }
    if let Some(member_number) = filter_text(&query.member_number) {
        conditions
            .next(builder)
            .push("m.member_number ILIKE ")
            .push_bind(contains_pattern(member_number));
    }
    match query.is_returned {
        Some(true) => {
            conditions.next(builder).push("l.return_date IS NOT NULL");
        }
        Some(false) => {
            conditions.next(builder).push("l.return_date IS NULL");
        }
        None => {}
    }
}

impl<'a> LoansRepository<'a> {
    pub fn new(uow: &'a mut UnitOfWork) -> Self {
        Self { uow }
    }

    /// Get the bare loan row
    pub async fn find(&mut self, id: Uuid) -> AppResult<Option<Loan>> {
        let conn = self.uow.connection().await?;
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(loan)
    }

    /// Get loan by ID, with book title and member number
    pub async fn get_by_id(&mut self, id: Uuid) -> AppResult<LoanDetails> {
        let conn = self.uow.connection().await?;
        sqlx::query_as::<_, LoanDetails>(&format!("{} WHERE l.id = $1", DETAILS_SELECT))
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Filtered page of loans, newest first
    pub async fn get_paged(&mut self, query: &LoanQuery, page: PageRequest) -> AppResult<Page<LoanDetails>> {
        let conn = self.uow.connection().await?;

        let mut count = QueryBuilder::new(DETAILS_COUNT);
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

        let mut select = QueryBuilder::new(DETAILS_SELECT);
        push_filters(&mut select, query);
        select.push(" ORDER BY l.created_at DESC");
        page.push_limit(&mut select);
        let loans = select.build_query_as::<LoanDetails>().fetch_all(&mut *conn).await?;

        Ok(Page::new(loans, total, page))
    }

    pub async fn add(&mut self, loan: &Loan) -> AppResult<()> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO loans (id, loan_date, return_date, member_id, book_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(loan.id)
        .bind(loan.loan_date)
        .bind(loan.return_date)
        .bind(loan.member_id)
        .bind(loan.book_id)
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .execute(conn)
        .await?;
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    pub async fn update(&mut self, loan: &mut Loan) -> AppResult<()> {
        loan.updated_at = Utc::now();
        let conn = self.uow.connection().await?;
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET loan_date = $2, return_date = $3, member_id = $4, book_id = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(loan.id)
        .bind(loan.loan_date)
        .bind(loan.return_date)
        .bind(loan.member_id)
        .bind(loan.book_id)
        .bind(loan.updated_at)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Loan with id {} not found", loan.id)));
        }
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    /// Delete every loan of a member, returning the removed rows
    pub async fn remove_by_member(&mut self, member_id: Uuid) -> AppResult<Vec<Loan>> {
        let conn = self.uow.connection().await?;
        let loans = sqlx::query_as::<_, Loan>("DELETE FROM loans WHERE member_id = $1 RETURNING *")
            .bind(member_id)
            .fetch_all(conn)
            .await?;
        self.uow.record_written(loans.len() as u64);
        Ok(loans)
    }

    pub async fn remove(&mut self, id: Uuid) -> AppResult<()> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Loan with id {} not found", id)));
        }
        self.uow.record_written(result.rows_affected());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returned_filter_checks_return_date() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM loans l");
        let query = LoanQuery {
            is_returned: Some(false),
            member_number: Some("MBR".to_string()),
            ..Default::default()
        };
        push_filters(&mut builder, &query);
        assert_eq!(
            builder.sql(),
            "SELECT * FROM loans l WHERE m.member_number ILIKE $1 AND l.return_date IS NULL"
        );
    }
}
