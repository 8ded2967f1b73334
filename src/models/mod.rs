//! Data models for ELibrary

pub mod author;
pub mod book;
pub mod enums;
pub mod loan;
pub mod member;
pub mod staff;

// Re-export commonly used types
pub use author::Author;
pub use book::{Book, BookAuthor, BookWithAuthors};
pub use enums::{AccessLevel, Category};
pub use loan::{Loan, LoanDetails};
pub use member::{Member, MemberWithPhones, Phone};
pub use staff::{Staff, StaffClaims};
