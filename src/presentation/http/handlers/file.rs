//! File Handlers

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};

use crate::application::services::{
    FileDto, FileError, FileService, FileServiceImpl, UploadFileDto,
};
use crate::infrastructure::metrics;
use crate::infrastructure::repositories::PgFileRepository;
use crate::infrastructure::storage::S3Storage;
use crate::presentation::http::extractors::parse_id;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Multipart field carrying the upload
const FILE_FIELD: &str = "file";

fn file_service(state: &AppState) -> FileServiceImpl<PgFileRepository, S3Storage> {
    FileServiceImpl::new(
        Arc::new(PgFileRepository::new(state.db.clone())),
        state.storage.clone(),
        &state.settings.storage,
    )
}

fn file_error(err: FileError) -> AppError {
    match err {
        FileError::EmptyFile => AppError::BadRequest("No file uploaded".into()),
        e @ FileError::TooLarge(_) => AppError::PayloadTooLarge(e.to_string()),
        FileError::NotFound => AppError::NotFound("File not found".into()),
        FileError::Storage(msg) => AppError::Storage(msg),
        FileError::Internal(msg) => AppError::Internal(msg),
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("File too large".into())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// Pull the `file` field out of the form, skipping any others
async fn read_upload(mut multipart: Multipart) -> Result<UploadFileDto, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;

        return Ok(UploadFileDto {
            original_name,
            content_type,
            data: data.to_vec(),
        });
    }

    Err(AppError::BadRequest("No file uploaded".into()))
}

/// Upload a file to object storage
pub async fn upload_file(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<FileDto>), AppError> {
    let upload = read_upload(multipart).await?;

    let file = file_service(&state)
        .upload(auth.user_id, upload)
        .await
        .map_err(file_error)?;

    metrics::record_upload(file.size as u64);
    Ok((StatusCode::CREATED, Json(file)))
}

/// File metadata with a fresh download URL
pub async fn get_file(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(file_id): Path<String>,
) -> Result<Json<FileDto>, AppError> {
    let file_id = parse_id(&file_id, "file ID")?;
    let file = file_service(&state)
        .get_file(file_id)
        .await
        .map_err(file_error)?;
    Ok(Json(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use test_case::test_case;

    #[test_case(FileError::EmptyFile, StatusCode::BAD_REQUEST)]
    #[test_case(FileError::TooLarge(10), StatusCode::PAYLOAD_TOO_LARGE)]
    #[test_case(FileError::NotFound, StatusCode::NOT_FOUND)]
    #[test_case(FileError::Storage("down".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_file_error_status(err: FileError, expected: StatusCode) {
        assert_eq!(file_error(err).into_response().status(), expected);
    }
}
