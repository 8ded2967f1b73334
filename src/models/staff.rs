//! Staff model, request/response types and JWT claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::enums::AccessLevel;
use crate::error::{AppError, FieldErrors};

/// Staff account from database
#[derive(Debug, Clone, FromRow)]
pub struct Staff {
    pub id: Uuid,
    pub username: String,
    /// Hashed password (argon2)
    pub password: String,
    pub name: String,
    pub staff_number: String,
    pub access_level: AccessLevel,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Staff representation returned by the API (no password)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StaffResponse {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub staff_number: String,
    pub access_level: AccessLevel,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Staff> for StaffResponse {
    fn from(staff: Staff) -> Self {
        StaffResponse {
            id: staff.id,
            username: staff.username,
            name: staff.name,
            staff_number: staff.staff_number,
            access_level: staff.access_level,
            image_url: staff.image_url,
            created_at: staff.created_at,
            updated_at: staff.updated_at,
        }
    }
}

/// Staff list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct StaffQuery {
    pub username: Option<String>,
    pub name: Option<String>,
    pub staff_number: Option<String>,
    pub access_level: Option<AccessLevel>,
}

/// Create staff request (multipart form, image handled separately)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStaff {
    #[validate(length(min = 8, max = 100, message = "Username must be between 8 and 100 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 100, message = "Password must be between 8 and 100 characters"))]
    pub password: String,
    pub password_confirmation: String,
    #[validate(length(min = 3, max = 100, message = "Name must be between 3 and 100 characters"))]
    pub name: String,
    #[validate(length(min = 8, max = 16, message = "Staff number must be between 8 and 16 characters"))]
    pub staff_number: String,
    pub access_level: AccessLevel,
}

/// Update staff request; the password is only changed when provided
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStaff {
    #[validate(length(min = 8, max = 100, message = "Username must be between 8 and 100 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 100, message = "Password must be between 8 and 100 characters"))]
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    #[validate(length(min = 3, max = 100, message = "Name must be between 3 and 100 characters"))]
    pub name: String,
    #[validate(length(min = 8, max = 16, message = "Staff number must be between 8 and 16 characters"))]
    pub staff_number: String,
    pub access_level: AccessLevel,
}

const CONFIRMATION_MISMATCH: &str = "Password confirmation must match password";

impl CreateStaff {
    /// Field rules plus the password confirmation check
    pub fn validation_errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Err(e) = self.validate() {
            errors.extend_from(&e);
        }
        if self.password != self.password_confirmation {
            errors.add("password_confirmation", CONFIRMATION_MISMATCH);
        }
        errors
    }
}

impl UpdateStaff {
    /// Field rules plus the password confirmation check
    pub fn validation_errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Err(e) = self.validate() {
            errors.extend_from(&e);
        }
        let either_sent = self.password.is_some() || self.password_confirmation.is_some();
        if either_sent && self.password != self.password_confirmation {
            errors.add("password_confirmation", CONFIRMATION_MISMATCH);
        }
        errors
    }
}

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 3, max = 100, message = "Username must be between 3 and 100 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 100, message = "Password must be between 8 and 100 characters"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime of the token in seconds
    pub expires_in: i64,
}

/// JWT claims for authenticated staff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffClaims {
    /// Username
    pub sub: String,
    /// Display name
    pub name: String,
    pub role: AccessLevel,
    pub jti: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

impl StaffClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and validate a JWT token (signature, expiry, issuer, audience)
    pub fn from_token(
        token: &str,
        secret: &str,
        issuer: &str,
        audience: &str,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let mut validation = Validation::default();
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == AccessLevel::Administrator
    }

    /// "All" policy: any staff role
    pub fn require_staff(&self) -> Result<(), AppError> {
        match self.role {
            AccessLevel::Administrator | AccessLevel::Staff => Ok(()),
        }
    }

    /// "AdministratorOnly" policy
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }
}
