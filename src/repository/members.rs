//! Members repository for database operations

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    pagination::{contains_pattern, filter_text, Conditions, Page, PageRequest},
    UnitOfWork,
};
use crate::{
    error::{AppError, AppResult},
    models::member::{Member, MemberQuery, MemberWithPhones, Phone},
};

pub struct MembersRepository<'a> {
    uow: &'a mut UnitOfWork,
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &MemberQuery) {
    let mut conditions = Conditions::new();

    let text_columns = [
        ("m.member_number", &query.member_number),
        ("m.name", &query.name),
        ("m.address", &query.address),
        ("m.email", &query.email),
    ];
    for (column, value) in text_columns {
        if let Some(value) = filter_text(value) {
            conditions
                .next(builder)
                .push(column)
                .push(" ILIKE ")
                .push_bind(contains_pattern(value));
        }
    }

    if let Some(phone) = filter_text(&query.phone) {
        conditions
            .next(builder)
            .push("EXISTS (SELECT 1 FROM phones p WHERE p.member_id = m.id AND p.phone_number ILIKE ")
            .push_bind(contains_pattern(phone))
            .push(")");
    }
}

/// Attach phones to their members, keeping the member order
fn with_phones(members: Vec<Member>, phones: Vec<Phone>) -> Vec<MemberWithPhones> {
    let mut by_member: HashMap<Uuid, Vec<Phone>> = HashMap::new();
    for phone in phones {
        by_member.entry(phone.member_id).or_default().push(phone);
    }
    members
        .into_iter()
        .map(|member| {
            let phones = by_member.remove(&member.id).unwrap_or_default();
            MemberWithPhones { member, phones }
        })
        .collect()
}

impl<'a> MembersRepository<'a> {
    pub fn new(uow: &'a mut UnitOfWork) -> Self {
        Self { uow }
    }

    /// Get member by ID, with phones
    pub async fn get_by_id(&mut self, id: Uuid) -> AppResult<MemberWithPhones> {
        let conn = self.uow.connection().await?;
        let member = sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))?;

        let phones = self.uow.phones().get_by_member_ids(&[id]).await?;
        Ok(MemberWithPhones { member, phones })
    }

    /// Filtered page of members with their phones, newest first
    pub async fn get_paged(&mut self, query: &MemberQuery, page: PageRequest) -> AppResult<Page<MemberWithPhones>> {
        let conn = self.uow.connection().await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM members m");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

        let mut select = QueryBuilder::new("SELECT m.* FROM members m");
        push_filters(&mut select, query);
        select.push(" ORDER BY m.created_at DESC");
        page.push_limit(&mut select);
        let members = select.build_query_as::<Member>().fetch_all(&mut *conn).await?;

        let ids: Vec<Uuid> = members.iter().map(|m| m.id).collect();
        let phones = self.uow.phones().get_by_member_ids(&ids).await?;

        Ok(Page::new(with_phones(members, phones), total, page))
    }

    pub async fn add(&mut self, member: &Member) -> AppResult<()> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO members (id, member_number, name, address, email, image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(member.id)
        .bind(&member.member_number)
        .bind(&member.name)
        .bind(&member.address)
        .bind(&member.email)
        .bind(&member.image_url)
        .bind(member.created_at)
        .bind(member.updated_at)
        .execute(conn)
        .await?;
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    pub async fn update(&mut self, member: &mut Member) -> AppResult<()> {
        member.updated_at = Utc::now();
        let conn = self.uow.connection().await?;
        let result = sqlx::query(
            r#"
            UPDATE members
            SET member_number = $2, name = $3, address = $4, email = $5, image_url = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(member.id)
        .bind(&member.member_number)
        .bind(&member.name)
        .bind(&member.address)
        .bind(&member.email)
        .bind(&member.image_url)
        .bind(member.updated_at)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member with id {} not found", member.id)));
        }
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    /// Delete a member; phones and loans go with it through FK cascades
    pub async fn remove(&mut self, id: Uuid) -> AppResult<()> {
        let conn = self.uow.connection().await?;
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member with id {} not found", id)));
        }
        self.uow.record_written(result.rows_affected());
        Ok(())
    }

    pub async fn exists(&mut self, id: Uuid) -> AppResult<bool> {
        let conn = self.uow.connection().await?;
        let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM members WHERE id = $1)")
            .bind(id)
            .fetch_one(conn)
            .await?;
        Ok(exists)
    }

    /// True when no other member uses `member_number`
    pub async fn is_member_number_unique(&mut self, member_number: &str, exclude_id: Option<Uuid>) -> AppResult<bool> {
        let conn = self.uow.connection().await?;
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM members WHERE member_number = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(member_number)
        .bind(exclude_id)
        .fetch_one(conn)
        .await?;
        Ok(!exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str) -> Member {
        let now = Utc::now();
        Member {
            id: Uuid::new_v4(),
            member_number: format!("MBR-{}", name),
            name: name.to_string(),
            address: "1 Main St.".to_string(),
            email: format!("{}@example.com", name),
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn phones_are_grouped_under_their_member() {
        let first = member("first");
        let second = member("second");
        let phones = vec![
            Phone::new(second.id, "0811111111"),
            Phone::new(first.id, "0822222222"),
            Phone::new(second.id, "0833333333"),
        ];

        let grouped = with_phones(vec![first.clone(), second.clone()], phones);
        assert_eq!(grouped[0].member.id, first.id);
        assert_eq!(grouped[0].phones.len(), 1);
        assert_eq!(grouped[1].phones.len(), 2);
    }

    #[test]
    fn phone_filter_uses_exists_subquery() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT m.* FROM members m");
        let query = MemberQuery {
            name: Some(" ann ".to_string()),
            phone: Some("0812".to_string()),
            ..Default::default()
        };
        push_filters(&mut builder, &query);
        assert_eq!(
            builder.sql(),
            "SELECT m.* FROM members m WHERE m.name ILIKE $1 AND EXISTS (SELECT 1 FROM phones p WHERE p.member_id = m.id AND p.phone_number ILIKE $2)"
        );
    }
}
