//! Product image uploads, written to the upload directory and served under
//! `/uploads`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const ALLOWED_TYPES: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex"));

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No image file provided")]
    Missing,
    #[error("Only image files (jpeg, jpg, png, gif, webp) are allowed!")]
    UnsupportedType,
    #[error("Image must be 5 MB or smaller")]
    TooLarge,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub success: bool,
    pub image_url: String,
    pub filename: String,
}

/// Both the file extension and the declared MIME type must name an allowed
/// image type.
pub fn check_image(file_name: &str, content_type: Option<&str>, size: usize) -> Result<(), UploadError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let subtype = content_type
        .and_then(|ct| ct.trim().to_ascii_lowercase().strip_prefix("image/").map(str::to_string))
        .unwrap_or_default();
    if !ALLOWED_TYPES.contains(&extension.as_str()) || !ALLOWED_TYPES.contains(&subtype.as_str()) {
        return Err(UploadError::UnsupportedType);
    }
    if size > MAX_IMAGE_BYTES {
        return Err(UploadError::TooLarge);
    }
    Ok(())
}

/// `<millis>-<original name with whitespace runs replaced by '-'>`, with any
/// directory components dropped.
pub fn stored_file_name(millis: i64, original: &str) -> String {
    let base = Path::new(original).file_name().and_then(|n| n.to_str()).unwrap_or("image");
    format!("{millis}-{}", WHITESPACE.replace_all(base, "-"))
}

#[derive(Clone, Debug)]
pub struct ImageStore {
    dir: PathBuf,
    public_base_url: String,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self { dir: dir.into(), public_base_url: public_base_url.into() }
    }

    pub fn dir(&self) -> &Path { &self.dir }

    pub async fn store(&self, original_name: &str, content_type: Option<&str>, data: &[u8]) -> Result<StoredImage, UploadError> {
        check_image(original_name, content_type, data.len())?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let filename = stored_file_name(Utc::now().timestamp_millis(), original_name);
        tokio::fs::write(self.dir.join(&filename), data).await?;
        tracing::info!(filename = %filename, bytes = data.len(), "Image uploaded");
        Ok(StoredImage {
            success: true,
            image_url: format!("{}/uploads/{filename}", self.public_base_url),
            filename,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_types() {
        assert!(check_image("latte art.PNG", Some("image/png"), 1024).is_ok());
        assert!(check_image("beans.jpg", Some("image/jpeg"), 1024).is_ok());
        assert!(matches!(check_image("menu.pdf", Some("application/pdf"), 10), Err(UploadError::UnsupportedType)));
        assert!(matches!(check_image("fake.png", Some("text/plain"), 10), Err(UploadError::UnsupportedType)));
        assert!(matches!(check_image("huge.webp", Some("image/webp"), MAX_IMAGE_BYTES + 1), Err(UploadError::TooLarge)));
    }

    #[test]
    fn test_stored_file_name() {
        assert_eq!(stored_file_name(1700000000000, "iced  mocha final.jpg"), "1700000000000-iced-mocha-final.jpg");
        assert_eq!(stored_file_name(1, "../../etc/passwd.png"), "1-passwd.png");
    }

    #[tokio::test]
    async fn test_store_writes_file() {
        let dir = std::env::temp_dir().join(format!("caffe-uploads-{}", uuid::Uuid::new_v4()));
        let store = ImageStore::new(&dir, "http://localhost:5000");
        let stored = store.store("cold brew.gif", Some("image/gif"), b"GIF89a").await.unwrap();
        assert!(stored.filename.ends_with("-cold-brew.gif"));
        assert_eq!(stored.image_url, format!("http://localhost:5000/uploads/{}", stored.filename));
        assert_eq!(tokio::fs::read(dir.join(&stored.filename)).await.unwrap(), b"GIF89a");
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
