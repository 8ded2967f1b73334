//! Loan model and book quantity bookkeeping

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::FieldErrors;

/// Loan row
#[derive(Debug, Clone, FromRow)]
pub struct Loan {
    pub id: Uuid,
    pub loan_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub member_id: Uuid,
    pub book_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    pub fn is_returned(&self) -> bool {
        self.return_date.is_some()
    }
}

/// Loan joined with the borrowed book title and the borrower's member number
#[derive(Debug, Clone, FromRow)]
pub struct LoanDetails {
    pub id: Uuid,
    pub loan_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub member_id: Uuid,
    pub book_id: Uuid,
    pub book_title: String,
    pub member_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanResponse {
    pub id: Uuid,
    pub loan_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub book_id: Uuid,
    pub book_title: String,
    pub member_id: Uuid,
    pub member_number: String,
    pub is_returned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LoanDetails> for LoanResponse {
    fn from(loan: LoanDetails) -> Self {
        LoanResponse {
            id: loan.id,
            loan_date: loan.loan_date,
            is_returned: loan.return_date.is_some(),
            return_date: loan.return_date,
            book_id: loan.book_id,
            book_title: loan.book_title,
            member_id: loan.member_id,
            member_number: loan.member_number,
            created_at: loan.created_at,
            updated_at: loan.updated_at,
        }
    }
}

/// Loan list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    /// Loans made on or after this date
    pub loan_date: Option<NaiveDate>,
    /// Loans returned on or after this date
    pub return_date: Option<NaiveDate>,
    pub book_title: Option<String>,
    pub member_number: Option<String>,
    pub is_returned: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub loan_date: NaiveDate,
    pub book_id: Uuid,
    pub member_id: Uuid,
}

impl CreateLoan {
    /// Checks that do not need the database
    pub fn validation_errors(&self, today: NaiveDate) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.loan_date != today {
            errors.add("loan_date", format!("Loan date must be {}", today));
        }
        if self.book_id.is_nil() {
            errors.add("book_id", "Book id is required");
        }
        if self.member_id.is_nil() {
            errors.add("member_id", "Member id is required");
        }
        errors
    }
}

/// Update a loan; a return date marks the loan returned
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLoan {
    pub return_date: Option<NaiveDate>,
    pub book_id: Uuid,
    pub member_id: Uuid,
}

impl UpdateLoan {
    pub fn validation_errors(&self, today: NaiveDate) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Some(return_date) = self.return_date {
            if return_date != today {
                errors.add("return_date", format!("Return date must be {}", today));
            }
        }
        if self.book_id.is_nil() {
            errors.add("book_id", "Book id is required");
        }
        if self.member_id.is_nil() {
            errors.add("member_id", "Member id is required");
        }
        errors
    }
}

/// Change applied to a book's quantity on hand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityAdjustment {
    /// A copy came back
    Increment(Uuid),
    /// A copy went out; fails when none is available
    Decrement(Uuid),
}

/// Quantity changes needed to move a loan from one state to another.
///
/// `before` is `None` for a new loan, `after` is `None` for a deleted one.
/// Each state is `(book_id, is_outstanding)`.
pub fn plan_quantity_adjustments(
    before: Option<(Uuid, bool)>,
    after: Option<(Uuid, bool)>,
) -> Vec<QuantityAdjustment> {
    let released = before.filter(|(_, outstanding)| *outstanding).map(|(book, _)| book);
    let taken = after.filter(|(_, outstanding)| *outstanding).map(|(book, _)| book);

    match (released, taken) {
        (Some(old), Some(new)) if old == new => Vec::new(),
        (released, taken) => released
            .map(QuantityAdjustment::Increment)
            .into_iter()
            .chain(taken.map(QuantityAdjustment::Decrement))
            .collect(),
    }
}

/// Copies to give back when the given loans are deleted together
pub fn release_adjustments(loans: &[Loan]) -> Vec<QuantityAdjustment> {
    loans
        .iter()
        .flat_map(|loan| plan_quantity_adjustments(Some((loan.book_id, !loan.is_returned())), None))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use QuantityAdjustment::*;

    fn loan(book_id: Uuid, return_date: Option<NaiveDate>) -> Loan {
        let now = Utc::now();
        Loan {
            id: Uuid::new_v4(),
            loan_date: now.date_naive(),
            return_date,
            member_id: Uuid::new_v4(),
            book_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn new_loan_takes_one_copy() {
        let book = Uuid::new_v4();
        assert_eq!(plan_quantity_adjustments(None, Some((book, true))), vec![Decrement(book)]);
    }

    #[test]
    fn returning_gives_the_copy_back_once() {
        let book = Uuid::new_v4();
        assert_eq!(
            plan_quantity_adjustments(Some((book, true)), Some((book, false))),
            vec![Increment(book)]
        );
        assert!(plan_quantity_adjustments(Some((book, false)), Some((book, false))).is_empty());
    }

    #[test]
    fn reopening_a_returned_loan_takes_a_copy() {
        let book = Uuid::new_v4();
        assert_eq!(
            plan_quantity_adjustments(Some((book, false)), Some((book, true))),
            vec![Decrement(book)]
        );
    }

    #[test]
    fn switching_books_moves_the_copy() {
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();
        assert_eq!(
            plan_quantity_adjustments(Some((old, true)), Some((new, true))),
            vec![Increment(old), Decrement(new)]
        );
        assert!(plan_quantity_adjustments(Some((old, true)), Some((old, true))).is_empty());
    }

    #[test]
    fn deleting_an_outstanding_loan_restores_quantity() {
        let book = Uuid::new_v4();
        assert_eq!(plan_quantity_adjustments(Some((book, true)), None), vec![Increment(book)]);
        assert!(plan_quantity_adjustments(Some((book, false)), None).is_empty());
    }

    #[test]
    fn removing_a_members_loans_returns_only_outstanding_copies() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let loans = vec![
            loan(first, None),
            loan(second, Some(Utc::now().date_naive())),
            loan(first, None),
        ];
        assert_eq!(release_adjustments(&loans), vec![Increment(first), Increment(first)]);
        assert!(release_adjustments(&[]).is_empty());
    }

    #[test]
    fn loan_date_must_be_today() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let request = CreateLoan {
            loan_date: today.pred_opt().unwrap(),
            book_id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
        };
        assert!(request.validation_errors(today).contains("loan_date"));

        let update = UpdateLoan {
            return_date: None,
            book_id: Uuid::nil(),
            member_id: Uuid::new_v4(),
        };
        let errors = update.validation_errors(today);
        assert!(errors.contains("book_id"));
        assert!(!errors.contains("return_date"));
    }
}
