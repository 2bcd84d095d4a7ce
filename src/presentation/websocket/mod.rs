//! WebSocket Gateway
//!
//! Real-time delivery of chat events over WebSocket connections.

pub mod events;
pub mod gateway;
pub mod handler;
pub mod session;

pub use events::{ClientFrame, ServerFrame};
pub use gateway::Gateway;
pub use handler::ws_handler;
pub use session::SessionState;
