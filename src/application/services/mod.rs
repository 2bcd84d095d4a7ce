//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **TokenService**: JWT access tokens and opaque refresh tokens
//! - **AuthService**: Signup, login, refresh token rotation, logout
//! - **UserService**: Profiles, search and availability checks
//! - **ChatService**: Group and private chats, participants, read markers
//! - **MessageService**: Message CRUD shared by REST and the gateway
//! - **FileService**: Uploads to object storage

pub mod auth_service;
pub mod chat_service;
pub mod file_service;
pub mod message_service;
pub mod token_service;
pub mod user_service;

pub use auth_service::{AuthError, AuthService, AuthServiceImpl, AuthTokens};
pub use chat_service::{
    ChatDetailDto, ChatDto, ChatError, ChatListItemDto, ChatService, ChatServiceImpl,
    CreateChatDto, ParticipantDto,
};
pub use file_service::{FileDto, FileError, FileService, FileServiceImpl, UploadFileDto};
pub use message_service::{
    CreateMessageDto, DeliveredMessage, MessageDto, MessageError, MessageQueryDto, MessageService,
    MessageServiceImpl,
};
pub use token_service::{Claims, TokenError, TokenService};
pub use user_service::{PublicUserDto, UserDto, UserError, UserService, UserServiceImpl};
