//! Per-connection state

use std::time::{Duration, Instant};

use uuid::Uuid;

/// State owned by one socket task
#[derive(Debug)]
pub struct SessionState {
    pub connection_id: Uuid,
    pub user_id: Uuid,
    last_seen: Instant,
}

impl SessionState {
    pub fn new(connection_id: Uuid, user_id: Uuid) -> Self {
        Self {
            connection_id,
            user_id,
            last_seen: Instant::now(),
        }
    }

    /// Record inbound traffic
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// False once nothing arrived for two heartbeat intervals
    pub fn is_alive(&self, heartbeat: Duration) -> bool {
        self.last_seen.elapsed() < heartbeat * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_session_is_alive() {
        let session = SessionState::new(Uuid::now_v7(), Uuid::now_v7());
        assert!(session.is_alive(Duration::from_secs(1)));
    }

    #[test]
    fn test_session_expires_without_traffic() {
        let mut session = SessionState::new(Uuid::now_v7(), Uuid::now_v7());
        session.last_seen = Instant::now() - Duration::from_secs(3);
        assert!(!session.is_alive(Duration::from_secs(1)));

        session.touch();
        assert!(session.is_alive(Duration::from_secs(1)));
    }
}
