//! Chat list queries against a real database
//!
//! Run only when TEST_DATABASE_URL points at a Postgres instance.

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use uuid::Uuid;

use chat_backend::domain::{
    Chat, ChatRepository, ChatRole, ChatType, Membership, MembershipRepository, Message,
    MessageRepository, MessageType, User, UserRepository,
};
use chat_backend::infrastructure::database::{create_pool, run_migrations};
use chat_backend::infrastructure::repositories::{
    PgChatRepository, PgMembershipRepository, PgMessageRepository, PgUserRepository,
};
use sqlx::PgPool;

use crate::common::{fake_user, test_settings, unique_email};

async fn database() -> Option<PgPool> {
    std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = create_pool(&test_settings().database)
        .await
        .expect("connect to TEST_DATABASE_URL");
    run_migrations(&pool).await.expect("migrations");
    Some(pool)
}

async fn seed_user(pool: &PgPool) -> User {
    let mut user = fake_user();
    user.email = unique_email();
    PgUserRepository::new(pool.clone())
        .create(&user)
        .await
        .expect("insert user")
}

async fn seed_group(pool: &PgPool, members: &[Uuid], last_active_minutes_ago: i64) -> Chat {
    let mut chat = Chat::new(Some("Team".into()), ChatType::Group);
    chat.updated_at = Utc::now() - Duration::minutes(last_active_minutes_ago);
    let memberships: Vec<Membership> = members
        .iter()
        .map(|id| Membership::new(*id, chat.id, ChatRole::Member))
        .collect();
    PgChatRepository::new(pool.clone())
        .create_with_members(&chat, &memberships)
        .await
        .expect("insert chat")
}

async fn post(pool: &PgPool, chat_id: Uuid, author: Uuid, minutes_ago: i64) {
    let mut message = Message::new(chat_id, author, "hi".into(), MessageType::Text, None);
    message.created_at = Utc::now() - Duration::minutes(minutes_ago);
    message.updated_at = message.created_at;
    PgMessageRepository::new(pool.clone())
        .create(&message)
        .await
        .expect("insert message");
}

#[tokio::test]
async fn test_unread_count_skips_own_messages_and_respects_read_marker() {
    let Some(pool) = database().await else {
        return;
    };
    let me = seed_user(&pool).await;
    let peer = seed_user(&pool).await;

    // never read: every message from others counts
    let unread = seed_group(&pool, &[me.id, peer.id], 60).await;
    post(&pool, unread.id, peer.id, 30).await;
    post(&pool, unread.id, peer.id, 29).await;
    post(&pool, unread.id, me.id, 28).await;

    // read at -20m: only the later message counts
    let partly_read = seed_group(&pool, &[me.id, peer.id], 60).await;
    post(&pool, partly_read.id, peer.id, 25).await;
    PgMembershipRepository::new(pool.clone())
        .mark_read(partly_read.id, me.id, Utc::now() - Duration::minutes(20))
        .await
        .expect("mark read");
    post(&pool, partly_read.id, peer.id, 10).await;

    let overviews = PgChatRepository::new(pool.clone())
        .find_overviews_for_user(me.id)
        .await
        .unwrap();

    let count_for = |id: Uuid| {
        overviews
            .iter()
            .find(|o| o.chat.id == id)
            .map(|o| o.unread_count)
    };
    assert_eq!(count_for(unread.id), Some(2));
    assert_eq!(count_for(partly_read.id), Some(1));

    let peer_view = PgChatRepository::new(pool.clone())
        .find_overviews_for_user(peer.id)
        .await
        .unwrap();
    let peer_unread = peer_view.iter().find(|o| o.chat.id == unread.id).unwrap();
    assert_eq!(peer_unread.unread_count, 1);
}

#[tokio::test]
async fn test_chat_list_orders_by_last_activity() {
    let Some(pool) = database().await else {
        return;
    };
    let me = seed_user(&pool).await;

    let stale = seed_group(&pool, &[me.id], 120).await;
    post(&pool, stale.id, me.id, 90).await;

    // no messages, so its own updated_at decides
    let quiet = seed_group(&pool, &[me.id], 30).await;

    let busy = seed_group(&pool, &[me.id], 120).await;
    post(&pool, busy.id, me.id, 5).await;

    let overviews = PgChatRepository::new(pool)
        .find_overviews_for_user(me.id)
        .await
        .unwrap();
    let order: Vec<Uuid> = overviews.iter().map(|o| o.chat.id).collect();

    assert_eq!(order, vec![busy.id, quiet.id, stale.id]);
    assert!(overviews[1].last_message.is_none());
    assert_eq!(
        overviews[0].last_message.as_ref().map(|m| m.user_id),
        Some(me.id)
    );
}
