//! Multipart form decoding for staff, member and book writes

use std::{collections::HashMap, str::FromStr};

use axum_extra::extract::Multipart;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, FieldErrors},
    models::{
        book::BookRequest,
        member::MemberRequest,
        staff::{CreateStaff, UpdateStaff},
    },
    services::images::ImageUpload,
};

pub const IMAGE_FIELD: &str = "image";

/// All fields of a multipart body, text values grouped by name
#[derive(Debug, Default)]
pub struct MultipartForm {
    text: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<ImageUpload>>,
    errors: FieldErrors,
}

impl MultipartForm {
    /// Read the whole body; a field carrying a file name is a file
    pub async fn collect(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read field '{}': {}", name, e)))?;

            match file_name {
                Some(file_name) => form.add_file(name, ImageUpload {
                    file_name,
                    bytes: data.to_vec(),
                }),
                None => {
                    let value = String::from_utf8(data.to_vec())
                        .map_err(|_| AppError::BadRequest(format!("Field '{}' is not valid UTF-8", name)))?;
                    form.add_text(name, value);
                }
            }
        }

        Ok(form)
    }

    pub fn add_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.text.entry(name.into()).or_default().push(value.into());
    }

    pub fn add_file(&mut self, name: impl Into<String>, upload: ImageUpload) {
        self.files.entry(name.into()).or_default().push(upload);
    }

    /// First value of a text field, empty when absent
    fn text(&mut self, name: &str) -> String {
        self.optional_text(name).unwrap_or_default()
    }

    /// First non-blank value of a text field
    fn optional_text(&mut self, name: &str) -> Option<String> {
        self.text
            .get_mut(name)
            .filter(|values| !values.is_empty())
            .map(|values| values.remove(0))
            .filter(|value| !value.trim().is_empty())
    }

    /// Every non-blank value of a repeated text field
    fn repeated_text(&mut self, name: &str) -> Vec<String> {
        self.text
            .remove(name)
            .unwrap_or_default()
            .into_iter()
            .filter(|value| !value.trim().is_empty())
            .collect()
    }

    /// Parse a required field, recording a field error when missing or malformed
    fn parsed<T: FromStr + Default>(&mut self, name: &str, label: &str) -> T {
        match self.optional_text(name) {
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                self.errors.add(name, format!("{} is not valid", label));
                T::default()
            }),
            None => {
                self.errors.add(name, format!("{} is required", label));
                T::default()
            }
        }
    }

    fn parsed_ids(&mut self, name: &str, label: &str) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for value in self.repeated_text(name) {
            match Uuid::parse_str(value.trim()) {
                Ok(id) => ids.push(id),
                Err(_) => self.errors.add(name, format!("{} '{}' is not a valid id", label, value)),
            }
        }
        ids
    }

    /// Uploaded image, if any non-empty file was sent
    pub fn image(&mut self) -> Option<ImageUpload> {
        self.files
            .get_mut(IMAGE_FIELD)
            .filter(|files| !files.is_empty())
            .map(|files| files.remove(0))
            .filter(|upload| !upload.file_name.is_empty() || !upload.bytes.is_empty())
    }

    fn finish<T>(self, value: T) -> AppResult<T> {
        self.errors.into_result()?;
        Ok(value)
    }

    pub fn into_create_staff(mut self) -> AppResult<CreateStaff> {
        let request = CreateStaff {
            username: self.text("username"),
            password: self.text("password"),
            password_confirmation: self.text("password_confirmation"),
            name: self.text("name"),
            staff_number: self.text("staff_number"),
            access_level: self.parsed_enum("access_level", "Access level"),
        };
        self.finish(request)
    }

    pub fn into_update_staff(mut self) -> AppResult<UpdateStaff> {
        let request = UpdateStaff {
            username: self.text("username"),
            password: self.optional_text("password"),
            password_confirmation: self.optional_text("password_confirmation"),
            name: self.text("name"),
            staff_number: self.text("staff_number"),
            access_level: self.parsed_enum("access_level", "Access level"),
        };
        self.finish(request)
    }

    pub fn into_member(mut self) -> AppResult<MemberRequest> {
        let request = MemberRequest {
            member_number: self.text("member_number"),
            name: self.text("name"),
            address: self.text("address"),
            email: self.text("email"),
            phones: self.repeated_text("phones"),
        };
        self.finish(request)
    }

    pub fn into_book(mut self) -> AppResult<BookRequest> {
        let request = BookRequest {
            title: self.text("title"),
            category: self.parsed_enum("category", "Category"),
            publisher: self.text("publisher"),
            quantity: self.parsed::<i32>("quantity", "Quantity"),
            author_ids: self.parsed_ids("author_ids", "Author id"),
        };
        self.finish(request)
    }

    /// Enum fields have no default; the first variant stands in until the error is returned
    fn parsed_enum<T>(&mut self, name: &str, label: &str) -> T
    where
        T: FromStr + EnumDefault,
    {
        match self.optional_text(name) {
            Some(value) => value.parse().unwrap_or_else(|_| {
                self.errors.add(name, format!("{} '{}' is not valid", label, value.trim()));
                T::placeholder()
            }),
            None => {
                self.errors.add(name, format!("{} is required", label));
                T::placeholder()
            }
        }
    }
}

/// Stand-in value for an enum field that failed to parse
pub trait EnumDefault {
    fn placeholder() -> Self;
}

impl EnumDefault for crate::models::enums::AccessLevel {
    fn placeholder() -> Self {
        Self::Staff
    }
}

impl EnumDefault for crate::models::enums::Category {
    fn placeholder() -> Self {
        Self::Fiction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{AccessLevel, Category};

    fn form(fields: &[(&str, &str)]) -> MultipartForm {
        let mut form = MultipartForm::default();
        for (name, value) in fields {
            form.add_text(*name, *value);
        }
        form
    }

    #[test]
    fn staff_form_parses_access_level() {
        let request = form(&[
            ("username", "librarian1"),
            ("password", "password123"),
            ("password_confirmation", "password123"),
            ("name", "Jane"),
            ("staff_number", "STF-0001"),
            ("access_level", "administrator"),
        ])
        .into_create_staff()
        .unwrap();
        assert_eq!(request.access_level, AccessLevel::Administrator);
    }

    #[test]
    fn blank_password_on_update_means_unchanged() {
        let request = form(&[
            ("username", "librarian1"),
            ("password", ""),
            ("name", "Jane"),
            ("staff_number", "STF-0001"),
            ("access_level", "Staff"),
        ])
        .into_update_staff()
        .unwrap();
        assert_eq!(request.password, None);
    }

    #[test]
    fn member_form_collects_repeated_phones() {
        let request = form(&[
            ("member_number", "MBR-00001"),
            ("phones", "081234567890"),
            ("phones", ""),
            ("phones", "+6281234567890"),
        ])
        .into_member()
        .unwrap();
        assert_eq!(request.phones, vec!["081234567890", "+6281234567890"]);
        assert_eq!(request.name, "");
    }

    #[test]
    fn book_form_reports_unparseable_fields() {
        let err = form(&[
            ("title", "Dune"),
            ("category", "Poetry"),
            ("quantity", "many"),
            ("author_ids", "not-a-uuid"),
        ])
        .into_book()
        .unwrap_err();

        match err {
            AppError::Validation(errors) => {
                assert!(errors.contains("category"));
                assert!(errors.contains("quantity"));
                assert!(errors.contains("author_ids"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn book_form_parses_ids_and_category() {
        let id = Uuid::new_v4();
        let id_text = id.to_string();
        let request = form(&[
            ("title", "Dune"),
            ("category", "Science"),
            ("publisher", "Chilton"),
            ("quantity", "4"),
            ("author_ids", id_text.as_str()),
        ])
        .into_book()
        .unwrap();
        assert_eq!(request.category, Category::Science);
        assert_eq!(request.quantity, 4);
        assert_eq!(request.author_ids, vec![id]);
    }

    #[test]
    fn image_is_taken_from_file_field() {
        let mut form = MultipartForm::default();
        assert!(form.image().is_none());
        form.add_file(IMAGE_FIELD, ImageUpload {
            file_name: "cover.png".to_string(),
            bytes: vec![1, 2, 3],
        });
        assert_eq!(form.image().map(|i| i.file_name), Some("cover.png".to_string()));
    }
}
