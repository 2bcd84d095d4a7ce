//! Infrastructure Layer
//!
//! Implementations of the domain ports:
//! - Database repositories (PostgreSQL)
//! - Object storage (S3 / MinIO)
//! - Redis connection for rate limiting
//! - Prometheus metrics

pub mod cache;
pub mod database;
pub mod metrics;
pub mod repositories;
pub mod storage;
