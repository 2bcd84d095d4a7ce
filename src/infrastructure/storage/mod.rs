//! Object Storage
//!
//! S3-compatible storage (MinIO in development) for uploaded files.

mod s3;

pub use s3::S3Storage;
