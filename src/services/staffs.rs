//! Staff management service

use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{
    accounts::hash_password,
    images::{ImageStore, ImageUpload},
};
use crate::{
    error::{AppResult, FieldErrors},
    models::staff::{CreateStaff, Staff, StaffQuery, StaffResponse, UpdateStaff},
    repository::{Page, PageRequest, UnitOfWork},
};

#[derive(Clone)]
pub struct StaffsService {
    pool: Pool<Postgres>,
    images: ImageStore,
}

impl StaffsService {
    pub fn new(pool: Pool<Postgres>, images: ImageStore) -> Self {
        Self { pool, images }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<StaffResponse> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        Ok(uow.staffs().get_by_id(id).await?.into())
    }

    pub async fn list(&self, query: &StaffQuery, page: PageRequest) -> AppResult<Page<StaffResponse>> {
        page.check()?;
        let mut uow = UnitOfWork::new(self.pool.clone());
        let staffs = uow.staffs().get_paged(query, page).await?.ensure_in_range()?;
        Ok(staffs.map(StaffResponse::from))
    }

    /// Uniqueness rules, checked against every staff except `exclude_id`
    async fn check_unique(
        &self,
        uow: &mut UnitOfWork,
        username: &str,
        staff_number: &str,
        exclude_id: Option<Uuid>,
        errors: &mut FieldErrors,
    ) -> AppResult<()> {
        if !uow.staffs().is_username_unique(username, exclude_id).await? {
            errors.add("username", "Username already exists");
        }
        if !uow.staffs().is_staff_number_unique(staff_number, exclude_id).await? {
            errors.add("staff_number", "Staff number already exists");
        }
        Ok(())
    }

    pub async fn create(&self, request: CreateStaff, image: Option<ImageUpload>) -> AppResult<StaffResponse> {
        let mut uow = UnitOfWork::new(self.pool.clone());

        let mut errors = request.validation_errors();
        if let Some(ref image) = image {
            self.images.check(image, "image", &mut errors);
        }
        self.check_unique(&mut uow, &request.username, &request.staff_number, None, &mut errors)
            .await?;
        errors.into_result()?;

        let image_url = match image {
            Some(ref image) => Some(self.images.save(image).await?),
            None => None,
        };

        let now = Utc::now();
        let staff = Staff {
            id: Uuid::new_v4(),
            username: request.username,
            password: hash_password(&request.password)?,
            name: request.name,
            staff_number: request.staff_number,
            access_level: request.access_level,
            image_url,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = uow.staffs().add(&staff).await {
            self.images.remove_opt(staff.image_url.as_deref()).await;
            return Err(e);
        }

        tracing::info!("Created staff {} ({})", staff.username, staff.id);
        Ok(staff.into())
    }

    /// Replace a staff's fields; the password and image are kept when not provided
    pub async fn update(&self, id: Uuid, request: UpdateStaff, image: Option<ImageUpload>) -> AppResult<StaffResponse> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let mut staff = uow.staffs().get_by_id(id).await?;

        let mut errors = request.validation_errors();
        if let Some(ref image) = image {
            self.images.check(image, "image", &mut errors);
        }
        self.check_unique(&mut uow, &request.username, &request.staff_number, Some(id), &mut errors)
            .await?;
        errors.into_result()?;

        let new_image = match image {
            Some(ref image) => Some(self.images.save(image).await?),
            None => None,
        };
        let old_image = staff.image_url.clone();

        staff.username = request.username;
        staff.name = request.name;
        staff.staff_number = request.staff_number;
        staff.access_level = request.access_level;
        if let Some(ref password) = request.password {
            staff.password = hash_password(password)?;
        }
        if new_image.is_some() {
            staff.image_url = new_image.clone();
        }

        if let Err(e) = uow.staffs().update(&mut staff).await {
            self.images.remove_opt(new_image.as_deref()).await;
            return Err(e);
        }
        if new_image.is_some() {
            self.images.remove_opt(old_image.as_deref()).await;
        }

        tracing::info!("Updated staff {}", staff.id);
        Ok(staff.into())
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        let staff = uow.staffs().get_by_id(id).await?;
        uow.staffs().remove(id).await?;
        self.images.remove_opt(staff.image_url.as_deref()).await;

        tracing::info!("Deleted staff {} ({})", staff.username, id);
        Ok(())
    }
}
