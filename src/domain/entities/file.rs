//! Stored file entity, repository trait and object storage port.
//!
//! Metadata maps to the `files` table; the bytes live in an
//! S3-compatible bucket behind [`ObjectStorage`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Coarse file category derived from the MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileType {
    Image,
    Audio,
    #[default]
    File,
}

impl FileType {
    /// `image/*` is an image, `audio/*` is audio, everything else a file.
    pub fn from_mime(mime_type: &str) -> Self {
        let mime = mime_type.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("audio/") {
            Self::Audio
        } else {
            Self::File
        }
    }

    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "IMAGE" => Self::Image,
            "AUDIO" => Self::Audio,
            _ => Self::File,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "IMAGE",
            Self::Audio => "AUDIO",
            Self::File => "FILE",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata of an uploaded file.
///
/// Maps to the `files` table:
/// - id: UUID PRIMARY KEY
/// - filename: TEXT NOT NULL (object key)
/// - original_name: TEXT NOT NULL
/// - mime_type: VARCHAR(255) NOT NULL
/// - size: BIGINT NOT NULL
/// - path: TEXT NOT NULL (bucket/key)
/// - url: TEXT NOT NULL (presigned at upload time)
/// - uploaded_by: UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE
/// - file_type: VARCHAR(10) NOT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: Uuid,

    /// Object key inside the bucket
    pub filename: String,

    /// Name the client uploaded the file under
    pub original_name: String,

    pub mime_type: String,

    /// Size in bytes
    pub size: i64,

    /// `bucket/key`
    pub path: String,

    pub url: String,

    pub uploaded_by: Uuid,

    pub file_type: FileType,

    pub created_at: DateTime<Utc>,
}

/// Build a date-partitioned object key: `[prefix/]yyyy/mm/dd/<id><.ext>`.
///
/// The extension comes from `original_name`, lowercased; names without
/// one produce a bare id.
pub fn build_object_key(
    prefix: Option<&str>,
    original_name: &str,
    id: Uuid,
    now: DateTime<Utc>,
) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    let dated = format!(
        "{:04}/{:02}/{:02}/{}{}",
        now.year(),
        now.month(),
        now.day(),
        id,
        extension
    );

    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{}/{}", prefix, dated),
        None => dated,
    }
}

/// Repository trait for file metadata.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredFile>, AppError>;

    async fn create(&self, file: &StoredFile) -> Result<StoredFile, AppError>;
}

/// Port to an S3-compatible object store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Bucket every object is written to.
    fn bucket(&self) -> &str;

    /// Create the bucket when it does not exist yet.
    async fn ensure_bucket(&self) -> Result<(), AppError>;

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError>;

    /// Time-limited GET URL for an object.
    async fn presigned_get_url(&self, key: &str, expires_in: Duration)
        -> Result<String, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("image/png", FileType::Image)]
    #[test_case("IMAGE/JPEG", FileType::Image)]
    #[test_case("audio/ogg", FileType::Audio)]
    #[test_case("video/mp4", FileType::File)]
    #[test_case("application/pdf", FileType::File)]
    #[test_case("", FileType::File)]
    fn test_file_type_from_mime(mime: &str, expected: FileType) {
        assert_eq!(FileType::from_mime(mime), expected);
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_object_key_is_date_partitioned() {
        let id = Uuid::nil();
        let key = build_object_key(None, "Photo.JPG", id, fixed_time());
        assert_eq!(key, format!("2024/03/07/{}.jpg", id));
    }

    #[test]
    fn test_object_key_with_prefix() {
        let id = Uuid::nil();
        let key = build_object_key(Some("/uploads/"), "notes.txt", id, fixed_time());
        assert_eq!(key, format!("uploads/2024/03/07/{}.txt", id));
    }

    #[test]
    fn test_object_key_without_extension() {
        let id = Uuid::nil();
        assert_eq!(
            build_object_key(Some(""), "Makefile", id, fixed_time()),
            format!("2024/03/07/{}", id)
        );
        // Only plain alphanumeric extensions are kept
        assert_eq!(
            build_object_key(None, "evil.p/h", id, fixed_time()),
            format!("2024/03/07/{}", id)
        );
    }
}
