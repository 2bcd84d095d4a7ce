//! Integration Tests Entry Point
//!
//! Tests are organized by module:
//! - `api/` - REST and gateway endpoint tests
//! - `common/` - Shared test utilities

mod api;
mod common;
