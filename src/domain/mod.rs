//! # Domain Layer
//!
//! The domain layer contains the core business objects of the chat backend.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Entities encapsulate small pieces of domain behavior
//!   (display names, role checks, object key layout)

pub mod entities;

// Re-export commonly used types
pub use entities::*;
