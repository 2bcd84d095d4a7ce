//! Membership Repository Implementation
//!
//! PostgreSQL implementation of the MembershipRepository trait over the
//! `user_chats` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{ChatRole, Membership, MembershipRepository, Participant};
use crate::shared::error::{is_unique_violation, AppError};

/// Database row representation of the user_chats table.
#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    user_id: Uuid,
    chat_id: Uuid,
    role: String,
    last_read_at: Option<DateTime<Utc>>,
    joined_at: DateTime<Utc>,
}

impl MembershipRow {
    fn into_membership(self) -> Membership {
        Membership {
            user_id: self.user_id,
            chat_id: self.chat_id,
            role: ChatRole::from_str(&self.role),
            last_read_at: self.last_read_at,
            joined_at: self.joined_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ParticipantRow {
    #[sqlx(flatten)]
    membership: MembershipRow,
    username: String,
    name: String,
}

/// PostgreSQL membership repository implementation.
#[derive(Clone)]
pub struct PgMembershipRepository {
    pool: PgPool,
}

impl PgMembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    async fn find(&self, chat_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, AppError> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT user_id, chat_id, role, last_read_at, joined_at
            FROM user_chats
            WHERE chat_id = $1 AND user_id = $2
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MembershipRow::into_membership))
    }

    async fn find_participants(&self, chat_id: Uuid) -> Result<Vec<Participant>, AppError> {
        let rows = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT uc.user_id, uc.chat_id, uc.role, uc.last_read_at, uc.joined_at,
                   u.username, u.name
            FROM user_chats uc
            JOIN users u ON u.id = uc.user_id
            WHERE uc.chat_id = $1
            ORDER BY uc.joined_at ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Participant {
                membership: row.membership.into_membership(),
                username: row.username,
                name: row.name,
            })
            .collect())
    }

    async fn member_ids(&self, chat_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM user_chats WHERE chat_id = $1 ORDER BY joined_at",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn add(&self, membership: &Membership) -> Result<Membership, AppError> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            INSERT INTO user_chats (user_id, chat_id, role, last_read_at, joined_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING user_id, chat_id, role, last_read_at, joined_at
            "#,
        )
        .bind(membership.user_id)
        .bind(membership.chat_id)
        .bind(membership.role.as_str())
        .bind(membership.last_read_at)
        .bind(membership.joined_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("User is already a participant".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(row.into_membership())
    }

    async fn remove(&self, chat_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM user_chats WHERE chat_id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_role(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        role: ChatRole,
    ) -> Result<Option<Membership>, AppError> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            UPDATE user_chats
            SET role = $3
            WHERE chat_id = $1 AND user_id = $2
            RETURNING user_id, chat_id, role, last_read_at, joined_at
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MembershipRow::into_membership))
    }

    async fn mark_read(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE user_chats SET last_read_at = $3 WHERE chat_id = $1 AND user_id = $2",
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
