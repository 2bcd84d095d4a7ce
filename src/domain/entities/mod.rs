//! # Domain Entities
//!
//! Core domain entities representing the main business objects of the chat backend.
//! All entities map directly to their corresponding database tables.
//!
//! - **User**: account with credentials and profile
//! - **Chat**: a PRIVATE (two-party) or GROUP conversation
//! - **Membership**: a user's participation in a chat, with role and read marker
//! - **Message**: content posted in a chat, optionally with a file
//! - **StoredFile**: metadata of an object uploaded to storage
//! - **RefreshToken**: hashed opaque token used to mint access tokens
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer, following the
//! dependency inversion principle. [`ObjectStorage`] plays the same role for
//! the bucket holding file contents.

mod chat;
mod file;
mod membership;
mod message;
mod refresh_token;
mod user;

pub use chat::{Chat, ChatOverview, ChatRepository, ChatType, DEFAULT_GROUP_CHAT_NAME};
pub use file::{build_object_key, FileRepository, FileType, ObjectStorage, StoredFile};
pub use membership::{ChatRole, Membership, MembershipRepository, Participant};
pub use message::{Message, MessageRepository, MessageType, MAX_MESSAGE_LENGTH};
pub use refresh_token::{DeviceType, RefreshToken, RefreshTokenRepository};
pub use user::{User, UserRepository};

#[cfg(test)]
pub use chat::MockChatRepository;
#[cfg(test)]
pub use file::{MockFileRepository, MockObjectStorage};
#[cfg(test)]
pub use membership::MockMembershipRepository;
#[cfg(test)]
pub use message::MockMessageRepository;
#[cfg(test)]
pub use refresh_token::MockRefreshTokenRepository;
#[cfg(test)]
pub use user::MockUserRepository;
