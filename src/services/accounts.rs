//! Login, current account and the default administrator

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        enums::AccessLevel,
        staff::{LoginRequest, LoginResponse, Staff, StaffClaims, StaffResponse},
    },
    repository::UnitOfWork,
};

const INVALID_LOGIN: &str = "Invalid login attempt.";
const DEFAULT_ADMIN_NAME: &str = "Administrator";
const DEFAULT_ADMIN_STAFF_NUMBER: &str = "STF-0000";

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct AccountsService {
    pool: Pool<Postgres>,
    config: AuthConfig,
}

impl AccountsService {
    pub fn new(pool: Pool<Postgres>, config: AuthConfig) -> Self {
        Self { pool, config }
    }

    /// Verify credentials and issue an access token
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        request.validate()?;

        let mut uow = UnitOfWork::new(self.pool.clone());
        let staff = match uow.staffs().get_by_username(&request.username).await? {
            Some(staff) => staff,
            None => {
                tracing::info!("Login failed: unknown username {}", request.username);
                return Err(AppError::invalid("username", INVALID_LOGIN));
            }
        };

        if !verify_password(&request.password, &staff.password)? {
            tracing::info!("Login failed: wrong password for {}", staff.username);
            return Err(AppError::invalid("username", INVALID_LOGIN));
        }

        let token = self.issue_token(&staff)?;
        tracing::info!("Staff {} logged in", staff.username);

        Ok(LoginResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.jwt_expiration_minutes * 60,
        })
    }

    fn issue_token(&self, staff: &Staff) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.config.jwt_expiration_minutes);

        let claims = StaffClaims {
            sub: staff.username.clone(),
            name: staff.name.clone(),
            role: staff.access_level,
            jti: Uuid::new_v4().to_string(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Record of the staff the token was issued to
    pub async fn current(&self, claims: &StaffClaims) -> AppResult<StaffResponse> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        uow.staffs()
            .get_by_username(&claims.sub)
            .await?
            .map(StaffResponse::from)
            .ok_or_else(|| AppError::NotFound(format!("Staff {} not found", claims.sub)))
    }

    /// Create the configured administrator when there is no staff at all.
    /// Returns whether an account was created.
    pub async fn ensure_default_admin(&self) -> AppResult<bool> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        if uow.staffs().count().await? > 0 {
            return Ok(false);
        }

        let now = Utc::now();
        let admin = Staff {
            id: Uuid::new_v4(),
            username: self.config.bootstrap_username.clone(),
            password: hash_password(&self.config.bootstrap_password)?,
            name: DEFAULT_ADMIN_NAME.to_string(),
            staff_number: DEFAULT_ADMIN_STAFF_NUMBER.to_string(),
            access_level: AccessLevel::Administrator,
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        uow.staffs().add(&admin).await?;

        tracing::warn!(
            "No staff found, created default administrator '{}'; change its password",
            admin.username
        );
        Ok(true)
    }
}
