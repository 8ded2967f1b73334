//! Staffs repository for database operations

use chrono::Utc;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    pagination::{contains_pattern, filter_text, Conditions, Page, PageRequest},
    UnitOfWork,
};
use crate::{
    error::{AppError, AppResult},
    models::staff::{Staff, StaffQuery},
};

pub struct StaffsRepository<'a> {
    uow: &'a mut UnitOfWork,
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &StaffQuery) {
    let mut conditions = Conditions::new();

    if let Some(username) = filter_text(&query.username) {
        conditions
            .next(builder)
            .push("username ILIKE ")
            .push_bind(contains_pattern(username));
    }
    if let Some(name) = filter_text(&query.name) {
        conditions
            .next(builder)
            .push("name ILIKE ")
            .push_bind(contains_pattern(name));
    }
    if let Some(staff_number) = filter_text(&query.staff_number) {
        conditions
            .next(builder)
            .push("staff_number ILIKE ")
            .push_bind(contains_pattern(staff_number));
    }
    if let Some(access_level) = query.access_level {
        conditions
            .next(builder)
            .push("access_level = ")
            .push_bind(access_level);
    }
}

impl<'a> StaffsRepository<'a> {
    pub fn new(uow: &'a mut UnitOfWork) -> Self {
        Self { uow }
    }

    /// Get staff by ID
    pub async fn get_by_id(&mut self, id: Uuid) -> AppResult<Staff> {
        let conn = self.uow.connection().await?;
        sqlx::query_as::<_, Staff>("SELECT * FROM staffs WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Staff with id {} not found", id)))
    }

    /// Get staff by exact username
    pub async fn get_by_username(&mut self, username: &str) -> AppResult<Option<Staff>> {
        let conn = self.uow.connection().await?;
        let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staffs WHERE username = $1")
            .bind(username)
            .fetch_optional(conn)
            .await?;
        Ok(staff)
    }

    /// Filtered page of staffs, newest first
    pub async fn get_paged(&mut self, query: &StaffQuery, page: PageRequest) -> AppResult<Page<Staff>> {
        let conn = self.uow.connection().await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM staffs");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

        let mut select = QueryBuilder::new("SELECT * FROM staffs");
        push_filters(&mut select, query);
        select.push(" ORDER BY created_at DESC");
        page.push_limit(&mut select);
        let staffs = select.build_query_as::<Staff>().fetch_all(&mut *conn).await?;

        Ok(Page::new(staffs, total, page))
    }

    pub async fn count(&mut self) -> AppResult<i64> {
        let conn = self.uow.connection().await?;
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM staffs")
            .fetch_one(conn)
            .await?;
        Ok(count)
    }

    pub async fn add(&mut self, staff: &Staff) -> AppResult<()> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO staffs (id, username, password, name, staff_number, access_level, image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(staff.id)
        .bind(&staff.username)
        .bind(&staff.password)
        .bind(&staff.name)
        .bind(&staff.staff_number)
        .bind(staff.access_level)
        .bind(&staff.image_url)
        .bind(staff.created_at)
        .bind(staff.updated_at)
        .execute(conn)
        .await?;
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    /// Write every mutable column of `staff` and stamp `updated_at`
    pub async fn update(&mut self, staff: &mut Staff) -> AppResult<()> {
        staff.updated_at = Utc::now();
        let conn = self.uow.connection().await?;
        let result = sqlx::query(
            r#"
            UPDATE staffs
            SET username = $2, password = $3, name = $4, staff_number = $5,
                access_level = $6, image_url = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(staff.id)
        .bind(&staff.username)
        .bind(&staff.password)
        .bind(&staff.name)
        .bind(&staff.staff_number)
        .bind(staff.access_level)
        .bind(&staff.image_url)
        .bind(staff.updated_at)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Staff with id {} not found", staff.id)));
        }
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    pub async fn remove(&mut self, id: Uuid) -> AppResult<()> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query("DELETE FROM staffs WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Staff with id {} not found", id)));
        }
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    /// True when no other staff uses `username`
    pub async fn is_username_unique(&mut self, username: &str, exclude_id: Option<Uuid>) -> AppResult<bool> {
        let conn = self.uow.connection().await?;
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM staffs WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(username)
        .bind(exclude_id)
        .fetch_one(conn)
        .await?;
        Ok(!exists)
    }

    /// True when no other staff uses `staff_number`
    pub async fn is_staff_number_unique(&mut self, staff_number: &str, exclude_id: Option<Uuid>) -> AppResult<bool> {
        let conn = self.uow.connection().await?;
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM staffs WHERE staff_number = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(staff_number)
        .bind(exclude_id)
        .fetch_one(conn)
        .await?;
        Ok(!exists)
    }
}
