//! WebSocket Gateway
//!
//! Tracks live connections and the rooms they joined, and fans frames out
//! to rooms.

use std::collections::HashSet;

use axum::extract::ws::Message;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::{
    chat_room, user_room, MessageDeletedPayload, NotificationPayload, ServerFrame,
    MESSAGE_DELETED, MESSAGE_NEW, MESSAGE_UPDATED, NOTIFICATION,
};
use crate::application::services::{DeliveredMessage, MessageDto};

/// A live socket and the user behind it
pub struct Connection {
    pub user_id: Uuid,
    pub sender: mpsc::UnboundedSender<Message>,
}

/// Connection registry and room membership
#[derive(Default)]
pub struct Gateway {
    connections: DashMap<Uuid, Connection>,
    rooms: DashMap<String, HashSet<Uuid>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection
    pub fn register(
        &self,
        connection_id: Uuid,
        user_id: Uuid,
        sender: mpsc::UnboundedSender<Message>,
    ) {
        self.connections
            .insert(connection_id, Connection { user_id, sender });
        tracing::info!(connection_id = %connection_id, user_id = %user_id, "Connection registered");
    }

    /// Drop a connection and leave every room it joined
    pub fn remove_connection(&self, connection_id: Uuid) {
        if let Some((_, connection)) = self.connections.remove(&connection_id) {
            self.rooms.retain(|_, members| {
                members.remove(&connection_id);
                !members.is_empty()
            });
            tracing::info!(
                connection_id = %connection_id,
                user_id = %connection.user_id,
                "Connection removed"
            );
        }
    }

    pub fn join(&self, connection_id: Uuid, room: &str) {
        if !self.connections.contains_key(&connection_id) {
            return;
        }
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(connection_id);

        // remove_connection may have swept the rooms between the check and
        // the insert
        if !self.connections.contains_key(&connection_id) {
            self.leave(connection_id, room);
            return;
        }
        tracing::debug!(connection_id = %connection_id, room = %room, "Joined room");
    }

    pub fn leave(&self, connection_id: Uuid, room: &str) {
        let now_empty = match self.rooms.get_mut(room) {
            Some(mut members) => {
                members.remove(&connection_id);
                members.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.rooms.remove_if(room, |_, members| members.is_empty());
        }
        tracing::debug!(connection_id = %connection_id, room = %room, "Left room");
    }

    /// Take every connection of `user_id` out of `room`. Returns the
    /// number of connections evicted.
    pub fn leave_user(&self, user_id: Uuid, room: &str) -> usize {
        let owned: Vec<Uuid> = self
            .connections
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| *entry.key())
            .collect();

        let mut evicted = 0;
        for connection_id in owned {
            if self.is_in_room(connection_id, room) {
                self.leave(connection_id, room);
                evicted += 1;
            }
        }
        if evicted > 0 {
            tracing::debug!(user_id = %user_id, room = %room, evicted, "User evicted from room");
        }
        evicted
    }

    /// Drop a room and all its members
    pub fn close_room(&self, room: &str) {
        if let Some((_, members)) = self.rooms.remove(room) {
            tracing::debug!(room = %room, members = members.len(), "Room closed");
        }
    }

    pub fn is_in_room(&self, connection_id: Uuid, room: &str) -> bool {
        self.rooms
            .get(room)
            .map(|members| members.contains(&connection_id))
            .unwrap_or(false)
    }

    /// Send a frame to one connection
    pub fn send_to(&self, connection_id: Uuid, frame: &ServerFrame) -> bool {
        let Some(message) = encode(frame) else {
            return false;
        };
        self.connections
            .get(&connection_id)
            .map(|c| c.sender.send(message).is_ok())
            .unwrap_or(false)
    }

    /// Send a frame to every connection in a room. Returns the number of
    /// connections reached.
    pub fn emit_to_room(&self, room: &str, frame: &ServerFrame) -> usize {
        let members: Vec<Uuid> = match self.rooms.get(room) {
            Some(members) => members.iter().copied().collect(),
            None => return 0,
        };
        let Some(message) = encode(frame) else {
            return 0;
        };

        members
            .into_iter()
            .filter(|id| {
                self.connections
                    .get(id)
                    .map(|c| c.sender.send(message.clone()).is_ok())
                    .unwrap_or(false)
            })
            .count()
    }

    /// Send a frame to a user's personal room
    pub fn emit_to_user(&self, user_id: Uuid, frame: &ServerFrame) -> usize {
        self.emit_to_room(&user_room(user_id), frame)
    }

    /// `message:new` to the chat room and a `notification` to every
    /// recipient's personal room
    pub fn broadcast_new_message(&self, delivered: &DeliveredMessage) {
        let message = &delivered.message;
        if let Some(data) = to_data(message) {
            self.emit_to_room(&chat_room(message.chat_id), &ServerFrame::new(MESSAGE_NEW, data));
        }

        let payload = NotificationPayload {
            chat_id: message.chat_id,
            message,
        };
        if let Some(data) = to_data(&payload) {
            let frame = ServerFrame::new(NOTIFICATION, data);
            for user_id in &delivered.recipient_ids {
                self.emit_to_user(*user_id, &frame);
            }
        }
    }

    pub fn broadcast_message_updated(&self, message: &MessageDto) {
        if let Some(data) = to_data(message) {
            self.emit_to_room(
                &chat_room(message.chat_id),
                &ServerFrame::new(MESSAGE_UPDATED, data),
            );
        }
    }

    pub fn broadcast_message_deleted(&self, chat_id: Uuid, message_id: Uuid) {
        let payload = MessageDeletedPayload {
            id: message_id,
            chat_id,
        };
        if let Some(data) = to_data(&payload) {
            self.emit_to_room(&chat_room(chat_id), &ServerFrame::new(MESSAGE_DELETED, data));
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

fn encode(frame: &ServerFrame) -> Option<Message> {
    frame
        .encode()
        .map_err(|e| tracing::error!(event = %frame.event, error = %e, "Failed to encode frame"))
        .ok()
}

fn to_data<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| tracing::error!(error = %e, "Failed to serialize event data"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageType;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn connect(gateway: &Gateway, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::now_v7();
        gateway.register(id, user_id, tx);
        (id, rx)
    }

    fn frame_of(message: Message) -> serde_json::Value {
        match message {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected message {:?}", other),
        }
    }

    fn message(chat_id: Uuid, user_id: Uuid) -> MessageDto {
        let now = Utc::now();
        MessageDto {
            id: Uuid::now_v7(),
            chat_id,
            user_id,
            content: "hello".into(),
            message_type: MessageType::Text,
            file_id: None,
            created_at: now,
            updated_at: now,
            sender: None,
            file: None,
        }
    }

    #[test]
    fn test_emit_reaches_only_room_members() {
        let gateway = Gateway::new();
        let (a, mut rx_a) = connect(&gateway, Uuid::now_v7());
        let (_b, mut rx_b) = connect(&gateway, Uuid::now_v7());
        gateway.join(a, "chat:1");

        let reached = gateway.emit_to_room("chat:1", &ServerFrame::new("ping", serde_json::json!(1)));

        assert_eq!(reached, 1);
        assert_eq!(frame_of(rx_a.try_recv().unwrap())["event"], "ping");
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_remove_connection_leaves_all_rooms() {
        let gateway = Gateway::new();
        let (a, _rx) = connect(&gateway, Uuid::now_v7());
        gateway.join(a, "chat:1");
        gateway.join(a, "chat:2");
        assert_eq!(gateway.room_count(), 2);

        gateway.remove_connection(a);

        assert_eq!(gateway.connection_count(), 0);
        assert_eq!(gateway.room_count(), 0);
    }

    #[test]
    fn test_leave_drops_empty_room() {
        let gateway = Gateway::new();
        let (a, _rx) = connect(&gateway, Uuid::now_v7());
        gateway.join(a, "chat:1");
        gateway.leave(a, "chat:1");
        assert!(!gateway.is_in_room(a, "chat:1"));
        assert_eq!(gateway.room_count(), 0);
    }

    #[test]
    fn test_unknown_connection_cannot_join() {
        let gateway = Gateway::new();
        gateway.join(Uuid::now_v7(), "chat:1");
        assert_eq!(gateway.room_count(), 0);
    }

    #[test]
    fn test_evicted_user_stops_receiving_chat_events() {
        let gateway = Gateway::new();
        let chat_id = Uuid::now_v7();
        let author_id = Uuid::now_v7();
        let removed_id = Uuid::now_v7();
        let room = chat_room(chat_id);

        let (author_conn, mut author_rx) = connect(&gateway, author_id);
        let (phone, mut phone_rx) = connect(&gateway, removed_id);
        let (laptop, mut laptop_rx) = connect(&gateway, removed_id);
        gateway.join(author_conn, &room);
        gateway.join(phone, &room);
        gateway.join(laptop, &room);
        gateway.join(phone, &user_room(removed_id));

        assert_eq!(gateway.leave_user(removed_id, &room), 2);

        gateway.broadcast_new_message(&DeliveredMessage {
            message: message(chat_id, author_id),
            recipient_ids: vec![],
        });

        assert_eq!(frame_of(author_rx.try_recv().unwrap())["event"], MESSAGE_NEW);
        assert!(phone_rx.try_recv().is_err());
        assert!(laptop_rx.try_recv().is_err());
        assert!(gateway.is_in_room(phone, &user_room(removed_id)));
    }

    #[test]
    fn test_closed_room_receives_nothing() {
        let gateway = Gateway::new();
        let chat_id = Uuid::now_v7();
        let (conn, mut rx) = connect(&gateway, Uuid::now_v7());
        gateway.join(conn, &chat_room(chat_id));

        gateway.close_room(&chat_room(chat_id));
        gateway.broadcast_message_deleted(chat_id, Uuid::now_v7());

        assert!(!gateway.is_in_room(conn, &chat_room(chat_id)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_join_after_removal_leaves_no_member_behind() {
        let gateway = Gateway::new();
        let (conn, _rx) = connect(&gateway, Uuid::now_v7());
        gateway.remove_connection(conn);

        gateway.join(conn, "chat:1");

        assert!(!gateway.is_in_room(conn, "chat:1"));
        assert_eq!(gateway.room_count(), 0);
    }

    #[test]
    fn test_new_message_notifies_recipients() {
        let gateway = Gateway::new();
        let chat_id = Uuid::now_v7();
        let sender_id = Uuid::now_v7();
        let peer_id = Uuid::now_v7();

        let (sender_conn, mut sender_rx) = connect(&gateway, sender_id);
        let (peer_conn, mut peer_rx) = connect(&gateway, peer_id);
        gateway.join(sender_conn, &chat_room(chat_id));
        gateway.join(peer_conn, &user_room(peer_id));

        let delivered = DeliveredMessage {
            message: message(chat_id, sender_id),
            recipient_ids: vec![peer_id],
        };
        gateway.broadcast_new_message(&delivered);

        let new = frame_of(sender_rx.try_recv().unwrap());
        assert_eq!(new["event"], MESSAGE_NEW);
        assert_eq!(new["data"]["content"], "hello");

        let note = frame_of(peer_rx.try_recv().unwrap());
        assert_eq!(note["event"], NOTIFICATION);
        assert_eq!(note["data"]["chatId"], chat_id.to_string());
        assert_eq!(note["data"]["message"]["id"], delivered.message.id.to_string());
    }

    #[test]
    fn test_deleted_broadcast_carries_ids() {
        let gateway = Gateway::new();
        let chat_id = Uuid::now_v7();
        let message_id = Uuid::now_v7();
        let (conn, mut rx) = connect(&gateway, Uuid::now_v7());
        gateway.join(conn, &chat_room(chat_id));

        gateway.broadcast_message_deleted(chat_id, message_id);

        let frame = frame_of(rx.try_recv().unwrap());
        assert_eq!(frame["event"], MESSAGE_DELETED);
        assert_eq!(frame["data"]["id"], message_id.to_string());
    }
}
