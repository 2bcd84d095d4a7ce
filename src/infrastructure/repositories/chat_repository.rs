//! Chat Repository Implementation
//!
//! PostgreSQL implementation of the ChatRepository trait. Chat creation
//! writes the chat and its memberships in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::message_repository::MessageRow;
use crate::domain::{
    Chat, ChatOverview, ChatRepository, ChatRole, ChatType, Membership, MessageType,
};
use crate::infrastructure::database::with_transaction;
use crate::shared::error::AppError;

/// Database row representation of the chats table.
#[derive(Debug, sqlx::FromRow)]
struct ChatRow {
    id: Uuid,
    name: Option<String>,
    chat_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChatRow {
    fn into_chat(self) -> Chat {
        Chat {
            id: self.id,
            name: self.name,
            chat_type: ChatType::from_str(&self.chat_type),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// One row of the chat list query: the chat, its newest message flattened
/// into `lm_*` columns, and the viewer specific counters.
#[derive(Debug, sqlx::FromRow)]
struct ChatOverviewRow {
    id: Uuid,
    name: Option<String>,
    chat_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    lm_id: Option<Uuid>,
    lm_user_id: Option<Uuid>,
    lm_content: Option<String>,
    lm_message_type: Option<String>,
    lm_file_id: Option<Uuid>,
    lm_created_at: Option<DateTime<Utc>>,
    lm_updated_at: Option<DateTime<Utc>>,
    unread_count: i64,
    peer_name: Option<String>,
}

impl ChatOverviewRow {
    fn into_overview(self) -> ChatOverview {
        let last_message = match (
            self.lm_id,
            self.lm_user_id,
            self.lm_created_at,
            self.lm_updated_at,
        ) {
            (Some(id), Some(user_id), Some(created_at), Some(updated_at)) => Some(
                MessageRow {
                    id,
                    chat_id: self.id,
                    user_id,
                    content: self.lm_content.unwrap_or_default(),
                    message_type: self
                        .lm_message_type
                        .unwrap_or_else(|| MessageType::Text.as_str().to_string()),
                    file_id: self.lm_file_id,
                    created_at,
                    updated_at,
                }
                .into_message(),
            ),
            _ => None,
        };

        ChatOverview {
            chat: Chat {
                id: self.id,
                name: self.name,
                chat_type: ChatType::from_str(&self.chat_type),
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            last_message,
            unread_count: self.unread_count,
            peer_name: self.peer_name,
        }
    }
}

async fn insert_chat(conn: &mut PgConnection, chat: &Chat) -> Result<Chat, AppError> {
    let row = sqlx::query_as::<_, ChatRow>(
        r#"
        INSERT INTO chats (id, name, chat_type, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, chat_type, created_at, updated_at
        "#,
    )
    .bind(chat.id)
    .bind(&chat.name)
    .bind(chat.chat_type.as_str())
    .bind(chat.created_at)
    .bind(chat.updated_at)
    .fetch_one(conn)
    .await?;

    Ok(row.into_chat())
}

async fn insert_membership(conn: &mut PgConnection, member: &Membership) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO user_chats (user_id, chat_id, role, last_read_at, joined_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, chat_id) DO NOTHING
        "#,
    )
    .bind(member.user_id)
    .bind(member.chat_id)
    .bind(member.role.as_str())
    .bind(member.last_read_at)
    .bind(member.joined_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Advisory lock key for the private chat between two users, independent
/// of argument order.
fn private_pair_key(user_a: Uuid, user_b: Uuid) -> String {
    let (low, high) = if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    };
    format!("private-chat:{}:{}", low, high)
}

/// PostgreSQL chat repository implementation.
#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(
            "SELECT id, name, chat_type, created_at, updated_at FROM chats WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ChatRow::into_chat))
    }

    async fn create_with_members(
        &self,
        chat: &Chat,
        members: &[Membership],
    ) -> Result<Chat, AppError> {
        let chat = chat.clone();
        let members = members.to_vec();

        with_transaction(&self.pool, |mut ctx| async move {
            let created = insert_chat(&mut **ctx.as_mut(), &chat).await?;
            for member in &members {
                insert_membership(&mut **ctx.as_mut(), member).await?;
            }
            Ok((created, ctx))
        })
        .await
    }

    async fn find_or_create_private(
        &self,
        user_a: Uuid,
        user_b: Uuid,
        candidate: &Chat,
    ) -> Result<(Chat, bool), AppError> {
        let candidate = candidate.clone();
        let lock_key = private_pair_key(user_a, user_b);

        with_transaction(&self.pool, |mut ctx| async move {
            // Serialize concurrent lookups for the same pair.
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(&lock_key)
                .execute(&mut **ctx.as_mut())
                .await?;

            let existing = sqlx::query_as::<_, ChatRow>(
                r#"
                SELECT c.id, c.name, c.chat_type, c.created_at, c.updated_at
                FROM chats c
                WHERE c.chat_type = 'PRIVATE'
                  AND EXISTS (SELECT 1 FROM user_chats WHERE chat_id = c.id AND user_id = $1)
                  AND EXISTS (SELECT 1 FROM user_chats WHERE chat_id = c.id AND user_id = $2)
                  AND (SELECT COUNT(*) FROM user_chats WHERE chat_id = c.id) = 2
                ORDER BY c.created_at
                LIMIT 1
                "#,
            )
            .bind(user_a)
            .bind(user_b)
            .fetch_optional(&mut **ctx.as_mut())
            .await?;

            if let Some(row) = existing {
                return Ok(((row.into_chat(), false), ctx));
            }

            let created = insert_chat(&mut **ctx.as_mut(), &candidate).await?;
            insert_membership(
                &mut **ctx.as_mut(),
                &Membership::new(user_a, created.id, ChatRole::Admin),
            )
            .await?;
            insert_membership(
                &mut **ctx.as_mut(),
                &Membership::new(user_b, created.id, ChatRole::Member),
            )
            .await?;

            Ok(((created, true), ctx))
        })
        .await
    }

    async fn update_name(&self, id: Uuid, name: &str) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            UPDATE chats
            SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, chat_type, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ChatRow::into_chat))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_overviews_for_user(&self, user_id: Uuid) -> Result<Vec<ChatOverview>, AppError> {
        let rows = sqlx::query_as::<_, ChatOverviewRow>(
            r#"
            SELECT c.id, c.name, c.chat_type, c.created_at, c.updated_at,
                   lm.id AS lm_id,
                   lm.user_id AS lm_user_id,
                   lm.content AS lm_content,
                   lm.message_type AS lm_message_type,
                   lm.file_id AS lm_file_id,
                   lm.created_at AS lm_created_at,
                   lm.updated_at AS lm_updated_at,
                   (
                       SELECT COUNT(*)
                       FROM messages m
                       WHERE m.chat_id = c.id
                         AND m.user_id <> $1
                         AND (uc.last_read_at IS NULL OR m.created_at > uc.last_read_at)
                   ) AS unread_count,
                   (
                       SELECT u.name
                       FROM user_chats p
                       JOIN users u ON u.id = p.user_id
                       WHERE p.chat_id = c.id AND p.user_id <> $1
                       ORDER BY p.joined_at
                       LIMIT 1
                   ) AS peer_name
            FROM user_chats uc
            JOIN chats c ON c.id = uc.chat_id
            LEFT JOIN LATERAL (
                SELECT id, user_id, content, message_type, file_id, created_at, updated_at
                FROM messages
                WHERE chat_id = c.id
                ORDER BY created_at DESC, id DESC
                LIMIT 1
            ) lm ON TRUE
            WHERE uc.user_id = $1
            ORDER BY COALESCE(lm.created_at, c.updated_at) DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ChatOverviewRow::into_overview).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_pair_key_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(private_pair_key(a, b), private_pair_key(b, a));
        assert_ne!(private_pair_key(a, b), private_pair_key(a, a));
    }

    #[test]
    fn test_overview_without_messages() {
        let row = ChatOverviewRow {
            id: Uuid::new_v4(),
            name: None,
            chat_type: "PRIVATE".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            lm_id: None,
            lm_user_id: None,
            lm_content: None,
            lm_message_type: None,
            lm_file_id: None,
            lm_created_at: None,
            lm_updated_at: None,
            unread_count: 0,
            peer_name: Some("Ada".into()),
        };

        let overview = row.into_overview();
        assert!(overview.last_message.is_none());
        assert!(overview.chat.is_private());
        assert_eq!(overview.chat.display_name(overview.peer_name.as_deref()), "Ada");
    }
}
