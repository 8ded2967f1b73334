//! Phones repository

use uuid::Uuid;

use super::UnitOfWork;
use crate::{error::AppResult, models::member::Phone};

pub struct PhonesRepository<'a> {
    uow: &'a mut UnitOfWork,
}

impl<'a> PhonesRepository<'a> {
    pub fn new(uow: &'a mut UnitOfWork) -> Self {
        Self { uow }
    }

    /// Phones of the given members, in insertion order
    pub async fn get_by_member_ids(&mut self, member_ids: &[Uuid]) -> AppResult<Vec<Phone>> {
        if member_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.uow.connection().await?;
        let phones = sqlx::query_as::<_, Phone>(
            "SELECT * FROM phones WHERE member_id = ANY($1) ORDER BY created_at, phone_number",
        )
        .bind(member_ids)
        .fetch_all(conn)
        .await?;
        Ok(phones)
    }

    pub async fn add(&mut self, phone: &Phone) -> AppResult<()> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO phones (id, phone_number, member_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(phone.id)
        .bind(&phone.phone_number)
        .bind(phone.member_id)
        .bind(phone.created_at)
        .bind(phone.updated_at)
        .execute(conn)
        .await?;
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    /// Delete every phone of a member, returning how many were removed
    pub async fn remove_by_member(&mut self, member_id: Uuid) -> AppResult<u64> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query("DELETE FROM phones WHERE member_id = $1")
            .bind(member_id)
            .execute(conn)
            .await?;
        self.uow.record_written(result.rows_affected());
        Ok(result.rows_affected())
    }
}
