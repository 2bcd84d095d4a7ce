//! Repository Implementations
//!
//! PostgreSQL implementations of the domain repository traits.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{PgChatRepository, PgMembershipRepository};
//!
//! fn setup_repositories(pool: PgPool) {
//!     let chats = PgChatRepository::new(pool.clone());
//!     let members = PgMembershipRepository::new(pool);
//! }
//! ```

pub mod chat_repository;
pub mod file_repository;
pub mod membership_repository;
pub mod message_repository;
pub mod refresh_token_repository;
pub mod user_repository;

pub use chat_repository::PgChatRepository;
pub use file_repository::PgFileRepository;
pub use membership_repository::PgMembershipRepository;
pub use message_repository::PgMessageRepository;
pub use refresh_token_repository::PgRefreshTokenRepository;
pub use user_repository::PgUserRepository;
