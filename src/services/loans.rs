//! Loan service: lending, returning and the book quantity counter

use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, FieldErrors},
    models::loan::{
        plan_quantity_adjustments, CreateLoan, Loan, LoanQuery, LoanResponse, QuantityAdjustment, UpdateLoan,
    },
    repository::{Page, PageRequest, UnitOfWork},
};

const BOOK_UNAVAILABLE: &str = "Book is not available for loan";

#[derive(Clone)]
pub struct LoansService {
    pool: Pool<Postgres>,
}

/// Apply quantity changes; a decrement on an exhausted book fails the whole write
async fn apply_adjustments(uow: &mut UnitOfWork, adjustments: Vec<QuantityAdjustment>) -> AppResult<()> {
    for adjustment in adjustments {
        match adjustment {
            QuantityAdjustment::Increment(book_id) => uow.books().increment_quantity(book_id).await?,
            QuantityAdjustment::Decrement(book_id) => {
                if !uow.books().decrement_quantity(book_id).await? {
                    return Err(AppError::invalid("book_id", BOOK_UNAVAILABLE));
                }
            }
        }
    }
    Ok(())
}

/// Book and member must exist
async fn check_references(
    uow: &mut UnitOfWork,
    book_id: Uuid,
    member_id: Uuid,
    errors: &mut FieldErrors,
) -> AppResult<()> {
    if !book_id.is_nil() && !uow.books().exists(book_id).await? {
        errors.add("book_id", "Book does not exist");
    }
    if !member_id.is_nil() && !uow.members().exists(member_id).await? {
        errors.add("member_id", "Member does not exist");
    }
    Ok(())
}

impl LoansService {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<LoanResponse> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        Ok(uow.loans().get_by_id(id).await?.into())
    }

    pub async fn list(&self, query: &LoanQuery, page: PageRequest) -> AppResult<Page<LoanResponse>> {
        page.check()?;
        let mut uow = UnitOfWork::new(self.pool.clone());
        let loans = uow.loans().get_paged(query, page).await?.ensure_in_range()?;
        Ok(loans.map(LoanResponse::from))
    }

    /// Lend a book: insert the loan and take one copy out in one transaction
    pub async fn create(&self, request: CreateLoan) -> AppResult<LoanResponse> {
        let today = Utc::now().date_naive();
        let mut uow = UnitOfWork::new(self.pool.clone());

        let mut errors = request.validation_errors(today);
        check_references(&mut uow, request.book_id, request.member_id, &mut errors).await?;
        if !errors.contains("book_id") {
            if let Some(book) = uow.books().find(request.book_id).await? {
                if book.quantity <= 0 {
                    errors.add("book_id", BOOK_UNAVAILABLE);
                }
            }
        }
        errors.into_result()?;

        let now = Utc::now();
        let loan = Loan {
            id: Uuid::new_v4(),
            loan_date: request.loan_date,
            return_date: None,
            member_id: request.member_id,
            book_id: request.book_id,
            created_at: now,
            updated_at: now,
        };

        uow.begin_transaction().await?;
        let result = async {
            uow.loans().add(&loan).await?;
            let adjustments = plan_quantity_adjustments(None, Some((loan.book_id, true)));
            apply_adjustments(&mut uow, adjustments).await
        }
        .await;
        uow.finish(result).await?;

        tracing::info!("Book {} lent to member {} (loan {})", loan.book_id, loan.member_id, loan.id);
        Ok(uow.loans().get_by_id(loan.id).await?.into())
    }

    /// Update a loan; the book quantity follows the outstanding state
    pub async fn update(&self, id: Uuid, request: UpdateLoan) -> AppResult<LoanResponse> {
        let today = Utc::now().date_naive();
        let mut uow = UnitOfWork::new(self.pool.clone());
        if uow.loans().find(id).await?.is_none() {
            return Err(AppError::NotFound(format!("Loan with id {} not found", id)));
        }

        let mut errors = request.validation_errors(today);
        check_references(&mut uow, request.book_id, request.member_id, &mut errors).await?;
        errors.into_result()?;

        uow.begin_transaction().await?;
        let result = async {
            let mut loan = uow
                .loans()
                .find(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;
            let before = (loan.book_id, !loan.is_returned());

            loan.return_date = request.return_date;
            loan.book_id = request.book_id;
            loan.member_id = request.member_id;
            uow.loans().update(&mut loan).await?;

            let after = (loan.book_id, !loan.is_returned());
            apply_adjustments(&mut uow, plan_quantity_adjustments(Some(before), Some(after))).await?;
            Ok::<_, AppError>(loan)
        }
        .await;
        let loan = uow.finish(result).await?;

        if loan.is_returned() {
            tracing::info!("Loan {} returned", loan.id);
        } else {
            tracing::info!("Updated loan {}", loan.id);
        }
        Ok(uow.loans().get_by_id(loan.id).await?.into())
    }

    /// Delete a loan, putting the copy back when it was still outstanding
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut uow = UnitOfWork::new(self.pool.clone());

        uow.begin_transaction().await?;
        let result = async {
            let loan = uow
                .loans()
                .find(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;
            uow.loans().remove(id).await?;
            let adjustments = plan_quantity_adjustments(Some((loan.book_id, !loan.is_returned())), None);
            apply_adjustments(&mut uow, adjustments).await?;
            Ok::<_, AppError>(uow.save_changes())
        }
        .await;
        let written = uow.finish(result).await?;

        tracing::info!("Deleted loan {} ({} row(s) written)", id, written);
        Ok(())
    }
}
