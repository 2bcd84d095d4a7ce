//! File Service
//!
//! Uploads attachments to object storage and records their metadata.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::StorageSettings;
use crate::domain::{build_object_key, FileRepository, FileType, ObjectStorage, StoredFile};
use crate::shared::error::AppError;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// File service trait
#[async_trait]
pub trait FileService: Send + Sync {
    /// Store an upload and return its metadata with a presigned URL
    async fn upload(&self, user_id: Uuid, upload: UploadFileDto) -> Result<FileDto, FileError>;

    /// Metadata with a freshly presigned URL
    async fn get_file(&self, file_id: Uuid) -> Result<FileDto, FileError>;
}

/// A file received from a client
#[derive(Debug, Clone)]
pub struct UploadFileDto {
    pub original_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// File data transfer object
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileDto {
    pub id: Uuid,
    /// Object key in the bucket
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub url: String,
    pub uploaded_by: Uuid,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub created_at: DateTime<Utc>,
}

impl From<StoredFile> for FileDto {
    fn from(file: StoredFile) -> Self {
        Self {
            id: file.id,
            filename: file.filename,
            original_name: file.original_name,
            mime_type: file.mime_type,
            size: file.size,
            url: file.url,
            uploaded_by: file.uploaded_by,
            file_type: file.file_type,
            created_at: file.created_at,
        }
    }
}

/// File service errors
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("No file uploaded")]
    EmptyFile,

    #[error("File exceeds the {0} byte limit")]
    TooLarge(usize),

    #[error("File not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn storage(e: AppError) -> FileError {
    FileError::Storage(e.to_string())
}

/// Last path component of a client supplied name, never empty.
fn sanitize_original_name(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("file")
        .to_string()
}

/// FileService implementation
pub struct FileServiceImpl<F, S>
where
    F: FileRepository,
    S: ObjectStorage,
{
    file_repo: Arc<F>,
    storage: Arc<S>,
    key_prefix: Option<String>,
    presigned_expiry: Duration,
    max_upload_bytes: usize,
}

impl<F, S> FileServiceImpl<F, S>
where
    F: FileRepository,
    S: ObjectStorage,
{
    pub fn new(file_repo: Arc<F>, storage: Arc<S>, settings: &StorageSettings) -> Self {
        Self {
            file_repo,
            storage,
            key_prefix: settings.key_prefix.clone(),
            presigned_expiry: Duration::from_secs(settings.presigned_expiry_secs),
            max_upload_bytes: settings.max_upload_bytes,
        }
    }
}

#[async_trait]
impl<F, S> FileService for FileServiceImpl<F, S>
where
    F: FileRepository + 'static,
    S: ObjectStorage + 'static,
{
    async fn upload(&self, user_id: Uuid, upload: UploadFileDto) -> Result<FileDto, FileError> {
        if upload.data.is_empty() {
            return Err(FileError::EmptyFile);
        }
        if upload.data.len() > self.max_upload_bytes {
            return Err(FileError::TooLarge(self.max_upload_bytes));
        }

        let original_name = sanitize_original_name(&upload.original_name);
        let mime_type = upload
            .content_type
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let size = upload.data.len() as i64;

        let id = Uuid::now_v7();
        let now = Utc::now();
        let key = build_object_key(self.key_prefix.as_deref(), &original_name, id, now);

        self.storage.ensure_bucket().await.map_err(storage)?;
        self.storage
            .put_object(&key, upload.data, &mime_type)
            .await
            .map_err(storage)?;
        let url = self
            .storage
            .presigned_get_url(&key, self.presigned_expiry)
            .await
            .map_err(storage)?;

        let record = StoredFile {
            id,
            path: format!("{}/{}", self.storage.bucket(), key),
            filename: key,
            original_name,
            file_type: FileType::from_mime(&mime_type),
            mime_type,
            size,
            url,
            uploaded_by: user_id,
            created_at: now,
        };

        let stored = self
            .file_repo
            .create(&record)
            .await
            .map_err(|e| FileError::Internal(e.to_string()))?;

        tracing::info!(
            file_id = %stored.id,
            user_id = %user_id,
            size = stored.size,
            key = %stored.filename,
            "File uploaded"
        );
        Ok(stored.into())
    }

    async fn get_file(&self, file_id: Uuid) -> Result<FileDto, FileError> {
        let mut file = self
            .file_repo
            .find_by_id(file_id)
            .await
            .map_err(|e| FileError::Internal(e.to_string()))?
            .ok_or(FileError::NotFound)?;

        file.url = self
            .storage
            .presigned_get_url(&file.filename, self.presigned_expiry)
            .await
            .map_err(storage)?;

        Ok(file.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockFileRepository, MockObjectStorage};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn settings() -> StorageSettings {
        StorageSettings {
            endpoint: "localhost".into(),
            port: 9000,
            use_ssl: false,
            access_key: "minioadmin".into(),
            secret_key: "minioadmin".into(),
            region: "us-east-1".into(),
            bucket: "chat-files".into(),
            key_prefix: Some("uploads".into()),
            presigned_expiry_secs: 600,
            max_upload_bytes: 16,
        }
    }

    fn upload(name: &str, content_type: Option<&str>, data: &[u8]) -> UploadFileDto {
        UploadFileDto {
            original_name: name.into(),
            content_type: content_type.map(String::from),
            data: data.to_vec(),
        }
    }

    #[test_case("photo.png", "photo.png")]
    #[test_case("../../etc/passwd", "passwd")]
    #[test_case("C:\\Users\\ada\\cv.pdf", "cv.pdf")]
    #[test_case("   ", "file")]
    fn test_sanitize_original_name(input: &str, expected: &str) {
        assert_eq!(sanitize_original_name(input), expected);
    }

    #[tokio::test]
    async fn test_upload_stores_object_and_metadata() {
        let user_id = Uuid::new_v4();

        let mut storage = MockObjectStorage::new();
        storage.expect_bucket().return_const("chat-files".to_string());
        storage.expect_ensure_bucket().times(1).returning(|| Ok(()));
        storage
            .expect_put_object()
            .withf(|key, body, content_type| {
                key.starts_with("uploads/")
                    && key.ends_with(".png")
                    && body.as_slice() == b"png-bytes"
                    && content_type == "image/png"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        storage
            .expect_presigned_get_url()
            .withf(|_, expires| *expires == Duration::from_secs(600))
            .returning(|key, _| Ok(format!("http://localhost:9000/chat-files/{}?sig", key)));

        let mut files = MockFileRepository::new();
        files.expect_create().returning(|file| Ok(file.clone()));

        let service = FileServiceImpl::new(Arc::new(files), Arc::new(storage), &settings());
        let dto = service
            .upload(user_id, upload("Cat.PNG", Some("image/png"), b"png-bytes"))
            .await
            .unwrap();

        assert_eq!(dto.file_type, FileType::Image);
        assert_eq!(dto.original_name, "Cat.PNG");
        assert_eq!(dto.size, 9);
        assert_eq!(dto.uploaded_by, user_id);
        assert!(dto.url.ends_with("?sig"));
    }

    #[tokio::test]
    async fn test_upload_defaults_content_type() {
        let mut storage = MockObjectStorage::new();
        storage.expect_bucket().return_const("chat-files".to_string());
        storage.expect_ensure_bucket().returning(|| Ok(()));
        storage
            .expect_put_object()
            .withf(|_, _, content_type| content_type == DEFAULT_CONTENT_TYPE)
            .returning(|_, _, _| Ok(()));
        storage
            .expect_presigned_get_url()
            .returning(|_, _| Ok("http://signed".into()));

        let mut files = MockFileRepository::new();
        files.expect_create().returning(|file| Ok(file.clone()));

        let service = FileServiceImpl::new(Arc::new(files), Arc::new(storage), &settings());
        let dto = service.upload(Uuid::new_v4(), upload("blob", None, b"abc")).await.unwrap();
        assert_eq!(dto.file_type, FileType::File);
        assert_eq!(dto.mime_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_empty_and_oversized_uploads_are_rejected() {
        let mut storage = MockObjectStorage::new();
        storage.expect_put_object().never();

        let service =
            FileServiceImpl::new(Arc::new(MockFileRepository::new()), Arc::new(storage), &settings());

        let empty = service.upload(Uuid::new_v4(), upload("a.txt", None, b"")).await;
        assert!(matches!(empty, Err(FileError::EmptyFile)));

        let big = service
            .upload(Uuid::new_v4(), upload("a.txt", None, &[0u8; 17]))
            .await;
        assert!(matches!(big, Err(FileError::TooLarge(16))));
    }

    #[tokio::test]
    async fn test_storage_failure_skips_metadata() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_ensure_bucket()
            .returning(|| Err(AppError::Storage("unreachable".into())));

        let mut files = MockFileRepository::new();
        files.expect_create().never();

        let service = FileServiceImpl::new(Arc::new(files), Arc::new(storage), &settings());
        let result = service.upload(Uuid::new_v4(), upload("a.txt", None, b"abc")).await;
        assert!(matches!(result, Err(FileError::Storage(_))));
    }

    #[tokio::test]
    async fn test_get_file_presigns_again() {
        let mut files = MockFileRepository::new();
        files.expect_find_by_id().returning(|id| {
            Ok(Some(StoredFile {
                id,
                filename: "uploads/2024/01/01/a.txt".into(),
                original_name: "a.txt".into(),
                mime_type: "text/plain".into(),
                size: 3,
                path: "chat-files/uploads/2024/01/01/a.txt".into(),
                url: "http://stale".into(),
                uploaded_by: Uuid::new_v4(),
                file_type: FileType::File,
                created_at: Utc::now(),
            }))
        });
        let mut storage = MockObjectStorage::new();
        storage
            .expect_presigned_get_url()
            .withf(|key, _| key == "uploads/2024/01/01/a.txt")
            .returning(|_, _| Ok("http://fresh".into()));

        let service = FileServiceImpl::new(Arc::new(files), Arc::new(storage), &settings());
        let dto = service.get_file(Uuid::new_v4()).await.unwrap();
        assert_eq!(dto.url, "http://fresh");
    }
}
