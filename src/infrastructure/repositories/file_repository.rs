//! File Repository Implementation
//!
//! PostgreSQL storage for upload metadata.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{FileRepository, FileType, StoredFile};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct FileRow {
    id: Uuid,
    filename: String,
    original_name: String,
    mime_type: String,
    size: i64,
    path: String,
    url: String,
    uploaded_by: Uuid,
    file_type: String,
    created_at: DateTime<Utc>,
}

impl FileRow {
    fn into_file(self) -> StoredFile {
        StoredFile {
            id: self.id,
            filename: self.filename,
            original_name: self.original_name,
            mime_type: self.mime_type,
            size: self.size,
            path: self.path,
            url: self.url,
            uploaded_by: self.uploaded_by,
            file_type: FileType::from_str(&self.file_type),
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL file metadata repository.
#[derive(Clone)]
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredFile>, AppError> {
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            SELECT id, filename, original_name, mime_type, size, path, url,
                   uploaded_by, file_type, created_at
            FROM files
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FileRow::into_file))
    }

    async fn create(&self, file: &StoredFile) -> Result<StoredFile, AppError> {
        let row = sqlx::query_as::<_, FileRow>(
            r#"
            INSERT INTO files (id, filename, original_name, mime_type, size, path, url,
                               uploaded_by, file_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, filename, original_name, mime_type, size, path, url,
                      uploaded_by, file_type, created_at
            "#,
        )
        .bind(file.id)
        .bind(&file.filename)
        .bind(&file.original_name)
        .bind(&file.mime_type)
        .bind(file.size)
        .bind(&file.path)
        .bind(&file.url)
        .bind(file.uploaded_by)
        .bind(file.file_type.as_str())
        .bind(file.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_file())
    }
}
