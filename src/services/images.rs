//! Uploaded image storage on the local filesystem

use std::path::{Path, PathBuf};

use rand::{distributions::Alphanumeric, Rng};

use crate::{config::UploadsConfig, error::{AppResult, FieldErrors}};

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const NAME_LENGTH: usize = 32;

/// Image received in a multipart form
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// File name as sent by the client
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Lower-cased extension of the client file name
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

#[derive(Clone)]
pub struct ImageStore {
    directory: PathBuf,
    url_prefix: String,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(config: &UploadsConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
            max_bytes: config.max_image_bytes,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Create the uploads directory if missing
    pub async fn ensure_directory(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.directory).await?;
        Ok(())
    }

    /// Extension, size and emptiness checks, reported under `field`
    pub fn check(&self, upload: &ImageUpload, field: &str, errors: &mut FieldErrors) {
        if upload.bytes.is_empty() {
            errors.add(field, "Image file is empty");
        }
        if upload.bytes.len() > self.max_bytes {
            errors.add(field, format!("Image must not exceed {} bytes", self.max_bytes));
        }
        match upload.extension() {
            Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => errors.add(
                field,
                format!("Image must be one of: {}", ALLOWED_EXTENSIONS.join(", ")),
            ),
        }
    }

    /// Write the image under a random name and return its public URL
    pub async fn save(&self, upload: &ImageUpload) -> AppResult<String> {
        let ext = upload.extension().unwrap_or_else(|| "bin".to_string());
        let name: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NAME_LENGTH)
            .map(char::from)
            .collect();
        let file_name = format!("{}.{}", name.to_ascii_lowercase(), ext);

        tokio::fs::write(self.directory.join(&file_name), &upload.bytes).await?;
        tracing::debug!("Stored image {} ({} bytes)", file_name, upload.bytes.len());

        Ok(format!("{}/{}", self.url_prefix, file_name))
    }

    /// Path of a stored image; only the final component of `url` is used
    fn path_for(&self, url: &str) -> Option<PathBuf> {
        let name = url.rsplit('/').next()?;
        if name.is_empty() || name == "." || name == ".." {
            return None;
        }
        Some(self.directory.join(name))
    }

    /// Delete a stored image; failures are logged, never returned
    pub async fn remove(&self, url: &str) {
        let Some(path) = self.path_for(url) else {
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!("Removed image {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove image {}: {}", path.display(), e),
        }
    }

    /// Remove the image if there is one
    pub async fn remove_opt(&self, url: Option<&str>) {
        if let Some(url) = url {
            self.remove(url).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> ImageStore {
        ImageStore::new(&UploadsConfig {
            directory: dir.to_path_buf(),
            url_prefix: "/uploads/".to_string(),
            max_image_bytes: 16,
        })
    }

    fn upload(name: &str, len: usize) -> ImageUpload {
        ImageUpload {
            file_name: name.to_string(),
            bytes: vec![7u8; len],
        }
    }

    #[test]
    fn check_rejects_bad_extension_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let mut errors = FieldErrors::new();
        store.check(&upload("cover.PNG", 8), "image", &mut errors);
        assert!(errors.is_empty());

        store.check(&upload("cover.exe", 8), "image", &mut errors);
        store.check(&upload("cover.png", 17), "image", &mut errors);
        store.check(&upload("cover.png", 0), "image", &mut errors);
        assert_eq!(errors.get("image").map(|m| m.len()), Some(3));
    }

    #[tokio::test]
    async fn save_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let url = store.save(&upload("photo.jpeg", 4)).await.unwrap();
        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with(".jpeg"));

        let path = store.path_for(&url).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![7u8; 4]);

        store.remove(&url).await;
        assert!(!path.exists());
        // Removing twice is harmless
        store.remove(&url).await;
    }

    #[test]
    fn path_for_ignores_directories_in_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert_eq!(store.path_for("/uploads/../../etc/passwd"), Some(dir.path().join("passwd")));
        assert_eq!(store.path_for("/uploads/.."), None);
    }
}
