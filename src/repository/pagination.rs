//! Page requests, page results and filter helpers shared by repositories

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use utoipa::IntoParams;

use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE_SIZE: i64 = 15;
pub const MAX_PAGE_SIZE: i64 = 100;

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// `page` / `size` query parameters
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageRequest {
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: i64,
    /// Page size (1 to 100)
    #[serde(default = "default_size")]
    pub size: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_size(),
        }
    }
}

impl PageRequest {
    pub fn new(page: i64, size: i64) -> Self {
        Self { page, size }
    }

    /// Rejects pages below 1, sizes outside the allowed range and pages no
    /// result set can reach
    pub fn check(&self) -> AppResult<()> {
        if self.page < 1 {
            return Err(AppError::NotFound(format!("Page {} does not exist", self.page)));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.size) {
            return Err(AppError::invalid(
                "size",
                format!("Page size must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }
        if self.checked_offset().is_none() {
            return Err(AppError::NotFound(format!("Page {} does not exist", self.page)));
        }
        Ok(())
    }

    fn checked_offset(&self) -> Option<i64> {
        self.page.checked_sub(1)?.checked_mul(self.size)
    }

    /// Rows skipped before this page; saturates for unchecked requests
    pub fn offset(&self) -> i64 {
        self.checked_offset().unwrap_or(i64::MAX)
    }

    /// Appends `LIMIT / OFFSET` for this page
    pub fn push_limit(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" LIMIT ");
        builder.push_bind(self.size);
        builder.push(" OFFSET ");
        builder.push_bind(self.offset());
    }
}

/// One page of results with its position in the whole set
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            size: request.size,
        }
    }

    pub fn total_pages(&self) -> i64 {
        if self.size <= 0 {
            return 0;
        }
        (self.total + self.size - 1) / self.size
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Pages past the last one are not found; page 1 of an empty set is fine
    pub fn ensure_in_range(self) -> AppResult<Self> {
        if self.page != 1 && self.page > self.total_pages() {
            return Err(AppError::NotFound(format!("Page {} does not exist", self.page)));
        }
        Ok(self)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
        }
    }
}

/// `%value%` pattern for ILIKE, with wildcards in `value` matched literally
pub fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Non-blank filter value, trimmed
pub fn filter_text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Starts each condition with `WHERE` or `AND`
pub struct Conditions {
    any: bool,
}

impl Conditions {
    pub fn new() -> Self {
        Self { any: false }
    }

    pub fn next<'a, 'q>(&mut self, builder: &'a mut QueryBuilder<'q, Postgres>) -> &'a mut QueryBuilder<'q, Postgres> {
        builder.push(if self.any { " AND " } else { " WHERE " });
        self.any = true;
        builder
    }
}

impl Default for Conditions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(total: i64, page: i64, size: i64) -> Page<()> {
        Page::new(Vec::new(), total, PageRequest::new(page, size))
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(page(0, 1, 15).total_pages(), 0);
        assert_eq!(page(15, 1, 15).total_pages(), 1);
        assert_eq!(page(16, 1, 15).total_pages(), 2);
    }

    #[test]
    fn navigation_flags() {
        let middle = page(45, 2, 15);
        assert!(middle.has_previous_page());
        assert!(middle.has_next_page());

        let last = page(45, 3, 15);
        assert!(last.has_previous_page());
        assert!(!last.has_next_page());
    }

    #[test]
    fn page_past_the_end_is_not_found() {
        assert!(matches!(page(10, 2, 15).ensure_in_range(), Err(AppError::NotFound(_))));
        assert!(page(0, 1, 15).ensure_in_range().is_ok());
        assert!(page(30, 2, 15).ensure_in_range().is_ok());
    }

    #[test]
    fn request_bounds() {
        assert!(matches!(PageRequest::new(0, 15).check(), Err(AppError::NotFound(_))));
        assert!(matches!(PageRequest::new(1, 0).check(), Err(AppError::Validation(_))));
        assert!(matches!(PageRequest::new(1, 101).check(), Err(AppError::Validation(_))));
        assert!(PageRequest::new(3, 100).check().is_ok());
        assert_eq!(PageRequest::new(3, 10).offset(), 20);
    }

    #[test]
    fn huge_page_number_is_not_found() {
        let request = PageRequest::new(i64::MAX, MAX_PAGE_SIZE);
        assert!(matches!(request.check(), Err(AppError::NotFound(_))));
        assert_eq!(request.offset(), i64::MAX);
        assert!(PageRequest::new(i64::MAX, 1).check().is_ok());
    }

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("abc"), "%abc%");
        assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn conditions_chain_with_and() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM books");
        let mut conditions = Conditions::new();
        conditions.next(&mut builder).push("quantity >= ").push_bind(1);
        conditions.next(&mut builder).push("title ILIKE ").push_bind("%a%");
        assert_eq!(builder.sql(), "SELECT * FROM books WHERE quantity >= $1 AND title ILIKE $2");
    }
}
