//! Message Repository Implementation
//!
//! PostgreSQL implementation of message storage with offset pagination.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Message, MessageRepository, MessageType};
use crate::shared::error::AppError;

const MESSAGE_COLUMNS: &str =
    "id, chat_id, user_id, content, message_type, file_id, created_at, updated_at";

/// Internal row type for message queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MessageRow {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub message_type: String,
    pub file_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageRow {
    pub(crate) fn into_message(self) -> Message {
        Message {
            id: self.id,
            chat_id: self.chat_id,
            user_id: self.user_id,
            content: self.content,
            message_type: MessageType::from_str(&self.message_type),
            file_id: self.file_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL message repository implementation.
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn find_in_chat(&self, chat_id: Uuid, id: Uuid) -> Result<Option<Message>, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {} FROM messages WHERE id = $1 AND chat_id = $2",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MessageRow::into_message))
    }

    async fn list_by_chat(
        &self,
        chat_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {}
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(chat_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }

    async fn latest_by_chat(&self, chat_id: Uuid, limit: i64) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {cols} FROM (
                SELECT {cols}
                FROM messages
                WHERE chat_id = $1
                ORDER BY created_at DESC, id DESC
                LIMIT $2
            ) newest
            ORDER BY created_at ASC, id ASC
            "#,
            cols = MESSAGE_COLUMNS
        ))
        .bind(chat_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }

    async fn last_in_chat(&self, chat_id: Uuid) -> Result<Option<Message>, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {}
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MessageRow::into_message))
    }

    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            INSERT INTO messages (id, chat_id, user_id, content, message_type, file_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(message.id)
        .bind(message.chat_id)
        .bind(message.user_id)
        .bind(&message.content)
        .bind(message.message_type.as_str())
        .bind(message.file_id)
        .bind(message.created_at)
        .bind(message.updated_at)
        .fetch_one(&self.pool)
        .await?;

        // Keep the chat list ordered by activity.
        sqlx::query("UPDATE chats SET updated_at = $2 WHERE id = $1")
            .bind(message.chat_id)
            .bind(message.created_at)
            .execute(&self.pool)
            .await?;

        Ok(row.into_message())
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Message>, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            UPDATE messages
            SET content = $2, updated_at = $3
            WHERE id = $1
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .bind(content)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MessageRow::into_message))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
