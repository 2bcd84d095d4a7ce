//! Message Service
//!
//! Handles message operations: list, send, edit, delete and read markers.
//! The REST handlers and the gateway both go through this service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::file_service::FileDto;
use super::user_service::PublicUserDto;
use crate::domain::{
    FileRepository, MembershipRepository, Message, MessageRepository, MessageType,
    UserRepository, MAX_MESSAGE_LENGTH,
};
use crate::shared::error::AppError;

/// Default page size for message listings
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest page a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Message service trait
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Fail with `NotMember` unless the user belongs to the chat
    async fn ensure_member(&self, user_id: Uuid, chat_id: Uuid) -> Result<(), MessageError>;

    /// Page through a chat oldest first
    async fn list_messages(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        query: MessageQueryDto,
    ) -> Result<Vec<MessageDto>, MessageError>;

    /// Persist a message and report who should be notified
    async fn create_message(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        request: CreateMessageDto,
    ) -> Result<DeliveredMessage, MessageError>;

    async fn get_message(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        message_id: Uuid,
    ) -> Result<MessageDto, MessageError>;

    /// Edit content; author only
    async fn update_message(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        message_id: Uuid,
        content: &str,
    ) -> Result<MessageDto, MessageError>;

    /// Delete; author only
    async fn delete_message(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), MessageError>;

    /// Move the caller's read marker of the chat to now
    async fn mark_as_read(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), MessageError>;

    /// Newest message of the chat, if any
    async fn last_message(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
    ) -> Result<Option<MessageDto>, MessageError>;
}

/// Create message request
#[derive(Debug, Clone, Default)]
pub struct CreateMessageDto {
    pub content: String,
    pub message_type: MessageType,
    pub file_id: Option<Uuid>,
}

/// Message query parameters
#[derive(Debug, Clone, Default)]
pub struct MessageQueryDto {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl MessageQueryDto {
    /// Limit clamped to `1..=MAX_PAGE_SIZE` and a non-negative offset.
    pub fn page(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// Message data transfer object
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub file_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<PublicUserDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileDto>,
}

impl From<Message> for MessageDto {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            user_id: message.user_id,
            content: message.content,
            message_type: message.message_type,
            file_id: message.file_id,
            created_at: message.created_at,
            updated_at: message.updated_at,
            sender: None,
            file: None,
        }
    }
}

/// A freshly stored message and the members to notify about it
#[derive(Debug, Clone)]
pub struct DeliveredMessage {
    pub message: MessageDto,
    /// Chat members other than the sender
    pub recipient_ids: Vec<Uuid>,
}

/// Message service errors
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("You are not a member of this chat")]
    NotMember,

    #[error("Message not found")]
    NotFound,

    #[error("You can only modify your own messages")]
    NotAuthor,

    #[error("File not found")]
    FileNotFound,

    #[error("Message content must not be empty")]
    EmptyContent,

    #[error("Message content too long (max {} characters)", MAX_MESSAGE_LENGTH)]
    ContentTooLong,

    #[error("Internal error: {0}")]
    Internal(String),
}

fn internal(e: AppError) -> MessageError {
    MessageError::Internal(e.to_string())
}

fn check_length(content: &str) -> Result<(), MessageError> {
    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(MessageError::ContentTooLong);
    }
    Ok(())
}

/// MessageService implementation
pub struct MessageServiceImpl<M, Mem, F, U>
where
    M: MessageRepository,
    Mem: MembershipRepository,
    F: FileRepository,
    U: UserRepository,
{
    message_repo: Arc<M>,
    membership_repo: Arc<Mem>,
    file_repo: Arc<F>,
    user_repo: Arc<U>,
}

impl<M, Mem, F, U> MessageServiceImpl<M, Mem, F, U>
where
    M: MessageRepository,
    Mem: MembershipRepository,
    F: FileRepository,
    U: UserRepository,
{
    pub fn new(
        message_repo: Arc<M>,
        membership_repo: Arc<Mem>,
        file_repo: Arc<F>,
        user_repo: Arc<U>,
    ) -> Self {
        Self {
            message_repo,
            membership_repo,
            file_repo,
            user_repo,
        }
    }

    async fn require_member(&self, user_id: Uuid, chat_id: Uuid) -> Result<(), MessageError> {
        self.membership_repo
            .find(chat_id, user_id)
            .await
            .map_err(internal)?
            .map(|_| ())
            .ok_or(MessageError::NotMember)
    }

    async fn find(&self, chat_id: Uuid, message_id: Uuid) -> Result<Message, MessageError> {
        self.message_repo
            .find_in_chat(chat_id, message_id)
            .await
            .map_err(internal)?
            .ok_or(MessageError::NotFound)
    }

    async fn find_own(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        message_id: Uuid,
    ) -> Result<Message, MessageError> {
        self.require_member(user_id, chat_id).await?;
        let message = self.find(chat_id, message_id).await?;
        if !message.is_authored_by(user_id) {
            return Err(MessageError::NotAuthor);
        }
        Ok(message)
    }
}

#[async_trait]
impl<M, Mem, F, U> MessageService for MessageServiceImpl<M, Mem, F, U>
where
    M: MessageRepository + 'static,
    Mem: MembershipRepository + 'static,
    F: FileRepository + 'static,
    U: UserRepository + 'static,
{
    async fn ensure_member(&self, user_id: Uuid, chat_id: Uuid) -> Result<(), MessageError> {
        self.require_member(user_id, chat_id).await
    }

    async fn list_messages(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        query: MessageQueryDto,
    ) -> Result<Vec<MessageDto>, MessageError> {
        self.require_member(user_id, chat_id).await?;
        let (limit, offset) = query.page();

        let messages = self
            .message_repo
            .list_by_chat(chat_id, limit, offset)
            .await
            .map_err(internal)?;

        Ok(messages.into_iter().map(MessageDto::from).collect())
    }

    async fn create_message(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        request: CreateMessageDto,
    ) -> Result<DeliveredMessage, MessageError> {
        self.require_member(user_id, chat_id).await?;

        if request.content.trim().is_empty() && request.file_id.is_none() {
            return Err(MessageError::EmptyContent);
        }
        check_length(&request.content)?;

        let file = match request.file_id {
            Some(file_id) => {
                let file = self
                    .file_repo
                    .find_by_id(file_id)
                    .await
                    .map_err(internal)?
                    .ok_or(MessageError::FileNotFound)?;
                Some(file)
            }
            None => None,
        };

        let message = Message::new(
            chat_id,
            user_id,
            request.content,
            request.message_type,
            request.file_id,
        );
        let stored = self.message_repo.create(&message).await.map_err(internal)?;

        let sender = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(internal)?
            .map(PublicUserDto::from);

        let recipient_ids = self
            .membership_repo
            .member_ids(chat_id)
            .await
            .map_err(internal)?
            .into_iter()
            .filter(|id| *id != user_id)
            .collect();

        let mut dto = MessageDto::from(stored);
        dto.sender = sender;
        dto.file = file.map(FileDto::from);

        tracing::debug!(message_id = %dto.id, chat_id = %chat_id, user_id = %user_id, "Message created");
        Ok(DeliveredMessage {
            message: dto,
            recipient_ids,
        })
    }

    async fn get_message(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        message_id: Uuid,
    ) -> Result<MessageDto, MessageError> {
        self.require_member(user_id, chat_id).await?;
        self.find(chat_id, message_id).await.map(MessageDto::from)
    }

    async fn update_message(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        message_id: Uuid,
        content: &str,
    ) -> Result<MessageDto, MessageError> {
        if content.trim().is_empty() {
            return Err(MessageError::EmptyContent);
        }
        check_length(content)?;

        self.find_own(user_id, chat_id, message_id).await?;

        let updated = self
            .message_repo
            .update_content(message_id, content, Utc::now())
            .await
            .map_err(internal)?
            .ok_or(MessageError::NotFound)?;

        Ok(updated.into())
    }

    async fn delete_message(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), MessageError> {
        self.find_own(user_id, chat_id, message_id).await?;

        if !self.message_repo.delete(message_id).await.map_err(internal)? {
            return Err(MessageError::NotFound);
        }

        tracing::debug!(message_id = %message_id, chat_id = %chat_id, "Message deleted");
        Ok(())
    }

    async fn mark_as_read(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), MessageError> {
        self.require_member(user_id, chat_id).await?;
        self.find(chat_id, message_id).await?;

        let updated = self
            .membership_repo
            .mark_read(chat_id, user_id, Utc::now())
            .await
            .map_err(internal)?;

        if updated {
            Ok(())
        } else {
            Err(MessageError::NotMember)
        }
    }

    async fn last_message(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
    ) -> Result<Option<MessageDto>, MessageError> {
        self.require_member(user_id, chat_id).await?;

        let last = self
            .message_repo
            .last_in_chat(chat_id)
            .await
            .map_err(internal)?;

        Ok(last.map(MessageDto::from))
    }
}
