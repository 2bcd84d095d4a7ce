//! Chat Service
//!
//! Group and private chat management, participants and read markers.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::message_service::MessageDto;
use crate::domain::{
    Chat, ChatOverview, ChatRepository, ChatRole, ChatType, Membership, MembershipRepository,
    MessageRepository, Participant, UserRepository,
};
use crate::shared::error::AppError;

/// Messages embedded in a chat detail response
pub const CHAT_DETAIL_MESSAGE_LIMIT: i64 = 50;

/// Chat service trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// The caller's chats with last message and unread count
    async fn list_user_chats(&self, user_id: Uuid) -> Result<Vec<ChatListItemDto>, ChatError>;

    /// Create a group chat with the creator as admin
    async fn create_group_chat(
        &self,
        creator_id: Uuid,
        request: CreateChatDto,
    ) -> Result<ChatDetailDto, ChatError>;

    async fn get_chat(&self, user_id: Uuid, chat_id: Uuid) -> Result<ChatDetailDto, ChatError>;

    async fn rename_chat(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        name: &str,
    ) -> Result<ChatDto, ChatError>;

    async fn delete_chat(&self, user_id: Uuid, chat_id: Uuid) -> Result<(), ChatError>;

    async fn add_participant(
        &self,
        actor_id: Uuid,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> Result<ParticipantDto, ChatError>;

    async fn remove_participant(
        &self,
        actor_id: Uuid,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ChatError>;

    async fn update_participant_role(
        &self,
        actor_id: Uuid,
        chat_id: Uuid,
        user_id: Uuid,
        role: ChatRole,
    ) -> Result<ParticipantDto, ChatError>;

    /// Id of the private chat between the two users, created on demand
    async fn get_or_create_private_chat(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
    ) -> Result<Uuid, ChatError>;

    /// Move the caller's read marker to now
    async fn mark_chat_read(&self, user_id: Uuid, chat_id: Uuid) -> Result<(), ChatError>;
}

/// Create chat request
#[derive(Debug, Clone, Default)]
pub struct CreateChatDto {
    pub name: Option<String>,
    pub participant_ids: Vec<Uuid>,
}

/// Chat data transfer object
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatDto {
    pub id: Uuid,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Chat> for ChatDto {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            name: chat.name,
            chat_type: chat.chat_type,
            created_at: chat.created_at,
            updated_at: chat.updated_at,
        }
    }
}

/// Entry of the chat list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatListItemDto {
    pub id: Uuid,
    /// Display name resolved for the viewer
    pub name: String,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub last_message: Option<MessageDto>,
    pub unread_count: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<ChatOverview> for ChatListItemDto {
    fn from(overview: ChatOverview) -> Self {
        let name = overview.chat.display_name(overview.peer_name.as_deref());
        Self {
            id: overview.chat.id,
            name,
            chat_type: overview.chat.chat_type,
            last_message: overview.last_message.map(MessageDto::from),
            unread_count: overview.unread_count,
            updated_at: overview.chat.updated_at,
        }
    }
}

/// Participant data transfer object
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    pub user_id: Uuid,
    pub username: String,
    pub name: String,
    pub role: ChatRole,
    pub last_read_at: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}

impl From<Participant> for ParticipantDto {
    fn from(participant: Participant) -> Self {
        Self {
            user_id: participant.membership.user_id,
            username: participant.username,
            name: participant.name,
            role: participant.membership.role,
            last_read_at: participant.membership.last_read_at,
            joined_at: participant.membership.joined_at,
        }
    }
}

/// Chat with its participants and newest messages
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDetailDto {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub participants: Vec<ParticipantDto>,
    pub messages: Vec<MessageDto>,
}

/// Chat service errors
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Chat is missing or the caller is not in it
    #[error("Chat not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Participant not found")]
    ParticipantNotFound,

    #[error("User is already a participant")]
    AlreadyParticipant,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn internal(e: AppError) -> ChatError {
    ChatError::Internal(e.to_string())
}

/// ChatService implementation
pub struct ChatServiceImpl<C, Mem, M, U>
where
    C: ChatRepository,
    Mem: MembershipRepository,
    M: MessageRepository,
    U: UserRepository,
{
    chat_repo: Arc<C>,
    membership_repo: Arc<Mem>,
    message_repo: Arc<M>,
    user_repo: Arc<U>,
}

impl<C, Mem, M, U> ChatServiceImpl<C, Mem, M, U>
where
    C: ChatRepository,
    Mem: MembershipRepository,
    M: MessageRepository,
    U: UserRepository,
{
    pub fn new(
        chat_repo: Arc<C>,
        membership_repo: Arc<Mem>,
        message_repo: Arc<M>,
        user_repo: Arc<U>,
    ) -> Self {
        Self {
            chat_repo,
            membership_repo,
            message_repo,
            user_repo,
        }
    }

    /// The caller's membership; absence reads as "chat not found".
    async fn membership(&self, chat_id: Uuid, user_id: Uuid) -> Result<Membership, ChatError> {
        self.membership_repo
            .find(chat_id, user_id)
            .await
            .map_err(internal)?
            .ok_or(ChatError::NotFound)
    }

    async fn chat(&self, chat_id: Uuid) -> Result<Chat, ChatError> {
        self.chat_repo
            .find_by_id(chat_id)
            .await
            .map_err(internal)?
            .ok_or(ChatError::NotFound)
    }

    async fn participant(&self, membership: Membership) -> Result<ParticipantDto, ChatError> {
        let user = self
            .user_repo
            .find_by_id(membership.user_id)
            .await
            .map_err(internal)?
            .ok_or(ChatError::UserNotFound)?;

        Ok(Participant {
            membership,
            username: user.username,
            name: user.name,
        }
        .into())
    }

    async fn detail(&self, chat: Chat, viewer_id: Uuid) -> Result<ChatDetailDto, ChatError> {
        let participants = self
            .membership_repo
            .find_participants(chat.id)
            .await
            .map_err(internal)?;
        let messages = self
            .message_repo
            .latest_by_chat(chat.id, CHAT_DETAIL_MESSAGE_LIMIT)
            .await
            .map_err(internal)?;

        let peer_name = participants
            .iter()
            .find(|p| p.membership.user_id != viewer_id)
            .map(|p| p.name.clone());

        Ok(ChatDetailDto {
            id: chat.id,
            name: chat.display_name(peer_name.as_deref()),
            chat_type: chat.chat_type,
            created_at: chat.created_at,
            updated_at: chat.updated_at,
            participants: participants.into_iter().map(ParticipantDto::from).collect(),
            messages: messages.into_iter().map(MessageDto::from).collect(),
        })
    }
}

/// Drop the creator and repeated ids, keeping first-seen order.
fn distinct_participants(creator_id: Uuid, ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| *id != creator_id && seen.insert(*id))
        .collect()
}

#[async_trait]
impl<C, Mem, M, U> ChatService for ChatServiceImpl<C, Mem, M, U>
where
    C: ChatRepository + 'static,
    Mem: MembershipRepository + 'static,
    M: MessageRepository + 'static,
    U: UserRepository + 'static,
{
    async fn list_user_chats(&self, user_id: Uuid) -> Result<Vec<ChatListItemDto>, ChatError> {
        let overviews = self
            .chat_repo
            .find_overviews_for_user(user_id)
            .await
            .map_err(internal)?;

        Ok(overviews.into_iter().map(ChatListItemDto::from).collect())
    }

    async fn create_group_chat(
        &self,
        creator_id: Uuid,
        request: CreateChatDto,
    ) -> Result<ChatDetailDto, ChatError> {
        let participant_ids = distinct_participants(creator_id, request.participant_ids);

        if !participant_ids.is_empty() {
            let found = self
                .user_repo
                .find_by_ids(&participant_ids)
                .await
                .map_err(internal)?;
            if found.len() != participant_ids.len() {
                return Err(ChatError::UserNotFound);
            }
        }

        let name = request
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let chat = Chat::new(name, ChatType::Group);

        let members: Vec<Membership> = std::iter::once(Membership::new(
            creator_id,
            chat.id,
            ChatRole::Admin,
        ))
        .chain(
            participant_ids
                .iter()
                .map(|id| Membership::new(*id, chat.id, ChatRole::Member)),
        )
        .collect();

        let created = self
            .chat_repo
            .create_with_members(&chat, &members)
            .await
            .map_err(internal)?;

        tracing::info!(
            chat_id = %created.id,
            creator_id = %creator_id,
            members = members.len(),
            "Group chat created"
        );
        self.detail(created, creator_id).await
    }

    async fn get_chat(&self, user_id: Uuid, chat_id: Uuid) -> Result<ChatDetailDto, ChatError> {
        self.membership(chat_id, user_id).await?;
        let chat = self.chat(chat_id).await?;
        self.detail(chat, user_id).await
    }

    async fn rename_chat(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        name: &str,
    ) -> Result<ChatDto, ChatError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::InvalidRequest("Chat name cannot be blank".into()));
        }

        let membership = self.membership(chat_id, user_id).await?;
        let chat = self.chat(chat_id).await?;

        if chat.is_private() {
            return Err(ChatError::InvalidRequest(
                "Private chats cannot be renamed".into(),
            ));
        }
        if !membership.role.can_manage_members() {
            return Err(ChatError::Forbidden(
                "Only admins and moderators can rename a chat".into(),
            ));
        }

        let updated = self
            .chat_repo
            .update_name(chat_id, name)
            .await
            .map_err(internal)?
            .ok_or(ChatError::NotFound)?;

        Ok(updated.into())
    }

    async fn delete_chat(&self, user_id: Uuid, chat_id: Uuid) -> Result<(), ChatError> {
        let membership = self.membership(chat_id, user_id).await?;
        let chat = self.chat(chat_id).await?;

        if !chat.is_private() && membership.role != ChatRole::Admin {
            return Err(ChatError::Forbidden("Only admins can delete a group chat".into()));
        }

        if !self.chat_repo.delete(chat_id).await.map_err(internal)? {
            return Err(ChatError::NotFound);
        }

        tracing::info!(chat_id = %chat_id, user_id = %user_id, "Chat deleted");
        Ok(())
    }

    async fn add_participant(
        &self,
        actor_id: Uuid,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> Result<ParticipantDto, ChatError> {
        let actor = self.membership(chat_id, actor_id).await?;
        let chat = self.chat(chat_id).await?;

        if chat.is_private() {
            return Err(ChatError::InvalidRequest(
                "Cannot add participants to a private chat".into(),
            ));
        }
        if !actor.role.can_manage_members() {
            return Err(ChatError::Forbidden(
                "Only admins and moderators can add participants".into(),
            ));
        }

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(internal)?
            .ok_or(ChatError::UserNotFound)?;

        let membership = self
            .membership_repo
            .add(&Membership::new(user_id, chat_id, ChatRole::Member))
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => ChatError::AlreadyParticipant,
                e => internal(e),
            })?;

        tracing::info!(chat_id = %chat_id, user_id = %user_id, actor_id = %actor_id, "Participant added");
        Ok(Participant {
            membership,
            username: user.username,
            name: user.name,
        }
        .into())
    }

    async fn remove_participant(
        &self,
        actor_id: Uuid,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ChatError> {
        let actor = self.membership(chat_id, actor_id).await?;
        let chat = self.chat(chat_id).await?;

        if chat.is_private() {
            return Err(ChatError::InvalidRequest(
                "Participants of a private chat cannot be removed; delete the chat instead".into(),
            ));
        }

        if actor_id != user_id {
            let target = self
                .membership_repo
                .find(chat_id, user_id)
                .await
                .map_err(internal)?
                .ok_or(ChatError::ParticipantNotFound)?;

            let allowed = match actor.role {
                ChatRole::Admin => true,
                ChatRole::Moderator => target.role == ChatRole::Member,
                ChatRole::Member => false,
            };
            if !allowed {
                return Err(ChatError::Forbidden(
                    "Not allowed to remove this participant".into(),
                ));
            }
        }

        if !self
            .membership_repo
            .remove(chat_id, user_id)
            .await
            .map_err(internal)?
        {
            return Err(ChatError::ParticipantNotFound);
        }

        tracing::info!(chat_id = %chat_id, user_id = %user_id, actor_id = %actor_id, "Participant removed");
        Ok(())
    }

    async fn update_participant_role(
        &self,
        actor_id: Uuid,
        chat_id: Uuid,
        user_id: Uuid,
        role: ChatRole,
    ) -> Result<ParticipantDto, ChatError> {
        let actor = self.membership(chat_id, actor_id).await?;
        let chat = self.chat(chat_id).await?;

        if chat.is_private() {
            return Err(ChatError::InvalidRequest(
                "Private chats have no roles to change".into(),
            ));
        }
        if actor.role != ChatRole::Admin {
            return Err(ChatError::Forbidden("Only admins can change roles".into()));
        }

        let membership = self
            .membership_repo
            .update_role(chat_id, user_id, role)
            .await
            .map_err(internal)?
            .ok_or(ChatError::ParticipantNotFound)?;

        self.participant(membership).await
    }

    async fn get_or_create_private_chat(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
    ) -> Result<Uuid, ChatError> {
        if user_id == other_user_id {
            return Err(ChatError::InvalidRequest(
                "Cannot start a private chat with yourself".into(),
            ));
        }

        self.user_repo
            .find_by_id(other_user_id)
            .await
            .map_err(internal)?
            .ok_or(ChatError::UserNotFound)?;

        let candidate = Chat::new(None, ChatType::Private);
        let (chat, created) = self
            .chat_repo
            .find_or_create_private(user_id, other_user_id, &candidate)
            .await
            .map_err(internal)?;

        if created {
            tracing::info!(chat_id = %chat.id, user_id = %user_id, peer_id = %other_user_id, "Private chat created");
        }
        Ok(chat.id)
    }

    async fn mark_chat_read(&self, user_id: Uuid, chat_id: Uuid) -> Result<(), ChatError> {
        let updated = self
            .membership_repo
            .mark_read(chat_id, user_id, Utc::now())
            .await
            .map_err(internal)?;

        if updated {
            Ok(())
        } else {
            Err(ChatError::NotFound)
        }
    }
}
