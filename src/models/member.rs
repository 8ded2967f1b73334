//! Member and phone models

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w\s,.\-#]+$").expect("valid address regex"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]+$").expect("valid phone regex"));

/// Library member from database
#[derive(Debug, Clone, FromRow)]
pub struct Member {
    pub id: Uuid,
    pub member_number: String,
    pub name: String,
    pub address: String,
    pub email: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Member phone number
#[derive(Debug, Clone, FromRow)]
pub struct Phone {
    pub id: Uuid,
    pub phone_number: String,
    pub member_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Phone {
    pub fn new(member_id: Uuid, phone_number: impl Into<String>) -> Self {
        let now = Utc::now();
        Phone {
            id: Uuid::new_v4(),
            phone_number: phone_number.into(),
            member_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Member together with its phones
#[derive(Debug, Clone)]
pub struct MemberWithPhones {
    pub member: Member,
    pub phones: Vec<Phone>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberResponse {
    pub id: Uuid,
    pub member_number: String,
    pub name: String,
    pub address: String,
    pub email: String,
    pub phones: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MemberWithPhones> for MemberResponse {
    fn from(value: MemberWithPhones) -> Self {
        let MemberWithPhones { member, phones } = value;
        MemberResponse {
            id: member.id,
            member_number: member.member_number,
            name: member.name,
            address: member.address,
            email: member.email,
            phones: phones.into_iter().map(|p| p.phone_number).collect(),
            image_url: member.image_url,
            created_at: member.created_at,
            updated_at: member.updated_at,
        }
    }
}

/// Member list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct MemberQuery {
    pub member_number: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    /// Matches members having any phone containing this value
    pub phone: Option<String>,
}

fn validate_phones(phones: &Vec<String>) -> Result<(), ValidationError> {
    if phones.is_empty() {
        return Err(ValidationError::new("required").with_message("At least one phone number is required".into()));
    }
    for phone in phones {
        let len = phone.chars().count();
        if !(10..=15).contains(&len) || !PHONE_RE.is_match(phone) {
            return Err(ValidationError::new("phone")
                .with_message(format!("Phone number '{}' must be 10 to 15 digits, optionally prefixed by +", phone).into()));
        }
    }
    Ok(())
}

/// Create or replace a member (multipart form, image handled separately)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MemberRequest {
    #[validate(length(min = 8, max = 16, message = "Member number must be between 8 and 16 characters"))]
    pub member_number: String,
    #[validate(length(min = 3, max = 100, message = "Name must be between 3 and 100 characters"))]
    pub name: String,
    #[validate(
        length(min = 3, max = 255, message = "Address must be between 3 and 255 characters"),
        regex(path = *ADDRESS_RE, message = "Address contains invalid characters")
    )]
    pub address: String,
    #[validate(
        length(min = 3, max = 100, message = "Email must be between 3 and 100 characters"),
        email(message = "Invalid email format")
    )]
    pub email: String,
    #[validate(custom(function = "validate_phones"))]
    pub phones: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> MemberRequest {
        MemberRequest {
            member_number: "MBR-00001".to_string(),
            name: "John Reader".to_string(),
            address: "12 Library St., Apt #4".to_string(),
            email: "john@example.com".to_string(),
            phones: vec!["+6281234567890".to_string()],
        }
    }

    #[test]
    fn valid_member_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn phones_must_be_present_and_numeric() {
        let mut member = request();
        member.phones.clear();
        assert!(member.validate().unwrap_err().field_errors().contains_key("phones"));

        let mut member = request();
        member.phones = vec!["12-34".to_string()];
        assert!(member.validate().is_err());
    }

    #[test]
    fn address_rejects_unusual_characters() {
        let mut member = request();
        member.address = "12 Library St; DROP".to_string();
        assert!(member.validate().unwrap_err().field_errors().contains_key("address"));
    }

    #[test]
    fn response_lists_phone_numbers() {
        let now = Utc::now();
        let member = Member {
            id: Uuid::new_v4(),
            member_number: "MBR-00001".to_string(),
            name: "John Reader".to_string(),
            address: "12 Library St.".to_string(),
            email: "john@example.com".to_string(),
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        let phones = vec![Phone::new(member.id, "0812345678901")];
        let response = MemberResponse::from(MemberWithPhones { member, phones });
        assert_eq!(response.phones, vec!["0812345678901".to_string()]);
    }
}
