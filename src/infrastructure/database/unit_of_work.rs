//! Unit of Work
//!
//! Transaction boundaries for repository operations that touch several
//! tables at once.

use sqlx::{PgPool, Postgres, Transaction};

use crate::shared::error::AppError;

/// Transaction context that wraps a SQLx transaction.
pub struct TransactionContext {
    tx: Transaction<'static, Postgres>,
}

impl TransactionContext {
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }

    /// Underlying transaction for query execution.
    pub fn as_mut(&mut self) -> &mut Transaction<'static, Postgres> {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await.map_err(AppError::Database)
    }
}

/// Execute a closure within a transaction.
///
/// Commits when the closure returns `Ok`; on error the context is dropped
/// and the transaction rolls back.
///
/// # Example
/// ```ignore
/// let chat = with_transaction(&pool, |mut ctx| async move {
///     insert_chat(&mut ctx, &chat).await?;
///     insert_member(&mut ctx, &member).await?;
///     Ok((chat, ctx))
/// }).await?;
/// ```
pub async fn with_transaction<F, Fut, T>(pool: &PgPool, f: F) -> Result<T, AppError>
where
    F: FnOnce(TransactionContext) -> Fut,
    Fut: std::future::Future<Output = Result<(T, TransactionContext), AppError>>,
{
    let tx = pool.begin().await.map_err(AppError::Database)?;
    let ctx = TransactionContext::new(tx);

    let (result, ctx) = f(ctx).await?;
    ctx.commit().await?;
    Ok(result)
}
