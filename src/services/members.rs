//! Member management service

use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::images::{ImageStore, ImageUpload};
use crate::{
    error::{AppError, AppResult, FieldErrors},
    models::loan::{release_adjustments, QuantityAdjustment},
    models::member::{Member, MemberQuery, MemberRequest, MemberResponse, MemberWithPhones, Phone},
    repository::{Page, PageRequest, UnitOfWork},
};

#[derive(Clone)]
pub struct MembersService {
    pool: Pool<Postgres>,
    images: ImageStore,
}

/// Replace the phones of a member with `numbers`
async fn replace_phones(uow: &mut UnitOfWork, member_id: Uuid, numbers: &[String]) -> AppResult<Vec<Phone>> {
    uow.phones().remove_by_member(member_id).await?;
    let mut phones = Vec::with_capacity(numbers.len());
    for number in numbers {
        let phone = Phone::new(member_id, number.trim());
        uow.phones().add(&phone).await?;
        phones.push(phone);
    }
    Ok(phones)
}

impl MembersService {
    pub fn new(pool: Pool<Postgres>, images: ImageStore) -> Self {
        Self { pool, images }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<MemberResponse> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        Ok(uow.members().get_by_id(id).await?.into())
    }

    pub async fn list(&self, query: &MemberQuery, page: PageRequest) -> AppResult<Page<MemberResponse>> {
        page.check()?;
        let mut uow = UnitOfWork::new(self.pool.clone());
        let members = uow.members().get_paged(query, page).await?.ensure_in_range()?;
        Ok(members.map(MemberResponse::from))
    }

    async fn validate(
        &self,
        uow: &mut UnitOfWork,
        request: &MemberRequest,
        image: Option<&ImageUpload>,
        exclude_id: Option<Uuid>,
    ) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if let Err(e) = validator::Validate::validate(request) {
            errors.extend_from(&e);
        }
        if let Some(image) = image {
            self.images.check(image, "image", &mut errors);
        }
        if !uow
            .members()
            .is_member_number_unique(&request.member_number, exclude_id)
            .await?
        {
            errors.add("member_number", "Member number already exists");
        }
        errors.into_result()
    }

    /// Create a member and its phones in one transaction
    pub async fn create(&self, request: MemberRequest, image: Option<ImageUpload>) -> AppResult<MemberResponse> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        self.validate(&mut uow, &request, image.as_ref(), None).await?;

        let image_url = match image {
            Some(ref image) => Some(self.images.save(image).await?),
            None => None,
        };

        let now = Utc::now();
        let member = Member {
            id: Uuid::new_v4(),
            member_number: request.member_number,
            name: request.name,
            address: request.address,
            email: request.email,
            image_url,
            created_at: now,
            updated_at: now,
        };

        uow.begin_transaction().await?;
        let result = async {
            uow.members().add(&member).await?;
            replace_phones(&mut uow, member.id, &request.phones).await
        }
        .await;

        match uow.finish(result).await {
            Ok(phones) => {
                tracing::info!("Created member {} with {} phone(s)", member.member_number, phones.len());
                Ok(MemberWithPhones { member, phones }.into())
            }
            Err(e) => {
                self.images.remove_opt(member.image_url.as_deref()).await;
                Err(e)
            }
        }
    }

    /// Replace a member's fields and phones; the image is kept when not provided
    pub async fn update(&self, id: Uuid, request: MemberRequest, image: Option<ImageUpload>) -> AppResult<MemberResponse> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let MemberWithPhones { mut member, .. } = uow.members().get_by_id(id).await?;
        self.validate(&mut uow, &request, image.as_ref(), Some(id)).await?;

        let new_image = match image {
            Some(ref image) => Some(self.images.save(image).await?),
            None => None,
        };
        let old_image = member.image_url.clone();

        member.member_number = request.member_number;
        member.name = request.name;
        member.address = request.address;
        member.email = request.email;
        if new_image.is_some() {
            member.image_url = new_image.clone();
        }

        uow.begin_transaction().await?;
        let result = async {
            uow.members().update(&mut member).await?;
            replace_phones(&mut uow, member.id, &request.phones).await
        }
        .await;

        match uow.finish(result).await {
            Ok(phones) => {
                if new_image.is_some() {
                    self.images.remove_opt(old_image.as_deref()).await;
                }
                tracing::info!("Updated member {}", member.id);
                Ok(MemberWithPhones { member, phones }.into())
            }
            Err(e) => {
                self.images.remove_opt(new_image.as_deref()).await;
                Err(e)
            }
        }
    }

    /// Delete a member with its phones and loans; books get back the copies
    /// the member still had out
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let MemberWithPhones { member, .. } = uow.members().get_by_id(id).await?;

        uow.begin_transaction().await?;
        let result = async {
            let loans = uow.loans().remove_by_member(id).await?;
            for adjustment in release_adjustments(&loans) {
                if let QuantityAdjustment::Increment(book_id) = adjustment {
                    uow.books().increment_quantity(book_id).await?;
                }
            }
            let phones = uow.phones().remove_by_member(id).await?;
            uow.members().remove(id).await?;
            Ok::<_, AppError>((phones, loans.len()))
        }
        .await;
        let (phones, loans) = uow.finish(result).await?;

        self.images.remove_opt(member.image_url.as_deref()).await;
        tracing::info!(
            "Deleted member {} with {} phone(s) and {} loan(s)",
            member.member_number,
            phones,
            loans
        );
        Ok(())
    }
}
